//! View controller: turns user input into enumerate → ingest → reconcile.

use std::path::PathBuf;

use tokio::sync::watch;

use crate::base::catalog::ActiveSelection;
use crate::base::source::{LeafFile, SourceHandle};
use crate::execution::enumerator::enumerate;
use crate::execution::ingest::{BatchResult, IngestionCoordinator};
use crate::execution::selection::SelectionSynchronizer;
use crate::ops::sources::local_file;
use crate::ops::store::RemoteStore;
use crate::prelude::*;
use crate::settings::ClientSettings;
use crate::view::{Notice, Presenter};

pub struct App {
    settings: ClientSettings,
    presenter: Arc<dyn Presenter>,
    synchronizer: Arc<SelectionSynchronizer>,
    coordinator: IngestionCoordinator,
}

impl App {
    pub fn new(
        settings: ClientSettings,
        store: Arc<dyn RemoteStore>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        let synchronizer = Arc::new(SelectionSynchronizer::new(
            store.clone(),
            presenter.clone(),
        ));
        let coordinator =
            IngestionCoordinator::new(store, synchronizer.clone(), presenter.clone());
        Self {
            settings,
            presenter,
            synchronizer,
            coordinator,
        }
    }

    /// Initial load: reconcile and render the catalog.
    pub async fn load(&self) -> Result<()> {
        self.synchronizer.reload().await
    }

    /// Explicit file selection: only declared images make it into the batch.
    ///
    /// Directories are not expanded on this path.
    pub async fn submit_picked(&self, paths: &[PathBuf]) -> Result<BatchResult> {
        let mut images = Vec::new();
        for path in paths {
            match self.handle_for(path).await? {
                SourceHandle::File(file) if file.is_image() => images.push(file),
                SourceHandle::File(file) => {
                    debug!(file = file.name(), media_type = file.media_type(), "not an image, skipped")
                }
                SourceHandle::Directory(dir) => {
                    warn!(directory = dir.name(), "directories cannot be picked, skipped")
                }
            }
        }
        self.coordinator.ingest(images).await
    }

    /// Drop of files and folders: folders are expanded and the whole
    /// heterogeneous batch is submitted; the store reports per-item failures.
    ///
    /// A path that cannot be inspected is reported and left out of the batch.
    pub async fn submit_dropped(&self, paths: &[PathBuf]) -> Result<BatchResult> {
        let mut handles = Vec::with_capacity(paths.len());
        for path in paths {
            if let Ok(handle) = self.handle_for(path).await {
                handles.push(handle);
            }
        }
        let listing = enumerate(handles).await;
        if !listing.unreadable.is_empty() {
            self.presenter.notify(Notice::error(format!(
                "Could not read: {}",
                listing.unreadable.join(", ")
            )));
        }
        self.submit_files(listing.files).await
    }

    /// Submits already-resolved leaf files as one batch.
    pub async fn submit_files(&self, files: Vec<LeafFile>) -> Result<BatchResult> {
        self.coordinator.ingest(files).await
    }

    pub async fn select(&self, filename: &str) -> Result<ActiveSelection> {
        self.synchronizer.select(filename).await
    }

    pub fn active(&self) -> ActiveSelection {
        self.synchronizer.active()
    }

    pub fn busy(&self) -> watch::Receiver<bool> {
        self.coordinator.busy().subscribe()
    }

    async fn handle_for(&self, path: &std::path::Path) -> Result<SourceHandle> {
        local_file::source_handle(path, self.settings.directory_page_size)
            .await
            .inspect_err(|err| {
                self.presenter
                    .notify(Notice::error(format!("{}: {err}", path.display())));
            })
    }
}
