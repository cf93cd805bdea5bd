pub mod enumerator;
pub mod ingest;
pub mod selection;

#[cfg(test)]
pub(crate) mod test_utils;
