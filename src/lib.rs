pub mod app;
pub mod base;
pub mod error;
pub mod execution;
pub mod ops;
pub mod prelude;
pub mod service;
pub mod settings;
pub mod utils;
pub mod view;

pub use app::App;
pub use base::catalog::{ActiveSelection, Catalog, CatalogEntry};
pub use base::source::{ContainerDirectory, LeafFile, SourceHandle};
pub use error::{Error, Result};
pub use execution::ingest::{BatchResult, IngestFailure, IngestionOutcome};
pub use ops::store::{RemoteStore, http::HttpStore};
pub use settings::{ClientSettings, ServiceSettings, Settings};
pub use view::{CollectionView, Notice, Presenter, Severity, TerminalPresenter};
