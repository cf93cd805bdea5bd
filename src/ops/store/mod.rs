//! The remote store seam: everything the client needs from the server.

pub mod http;

use crate::base::catalog::{ActiveSelection, Catalog, CatalogEntry};
use crate::base::source::LeafFile;
use crate::prelude::*;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Ingests one file and returns the catalog entry created for it.
    async fn upload(&self, file: &LeafFile) -> Result<CatalogEntry>;

    /// The authoritative active selection; `none` when nothing is selected.
    async fn current_selection(&self) -> Result<ActiveSelection>;

    /// The full catalog, replacing any cached copy.
    async fn catalog(&self) -> Result<Catalog>;

    /// Designates `filename` as the active selection.
    async fn select(&self, filename: &str) -> Result<()>;
}
