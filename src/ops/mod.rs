pub mod sources;
pub mod store;
