//! Concurrent batch ingestion with per-item outcomes.

use futures::future::join_all;
use tokio::sync::watch;

use crate::base::catalog::CatalogEntry;
use crate::base::source::LeafFile;
use crate::execution::selection::SelectionSynchronizer;
use crate::ops::store::RemoteStore;
use crate::prelude::*;
use crate::view::{Notice, Presenter};

#[derive(Debug, Clone)]
pub enum IngestionOutcome {
    Success(CatalogEntry),
    Failure(IngestFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestFailure {
    /// Name of the file that failed.
    pub file: String,
    pub reason: String,
}

/// Aggregate of one settled batch.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub successes: Vec<CatalogEntry>,
    pub failures: Vec<IngestFailure>,
}

impl BatchResult {
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = IngestionOutcome>) -> Self {
        let mut result = Self::default();
        for outcome in outcomes {
            match outcome {
                IngestionOutcome::Success(entry) => result.successes.push(entry),
                IngestionOutcome::Failure(failure) => result.failures.push(failure),
            }
        }
        result
    }

    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Failure reasons in submission order.
    pub fn reasons(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.reason.as_str()).collect()
    }

    fn success_notice(&self) -> Option<Notice> {
        (self.success_count() > 0).then(|| {
            Notice::success(format!("{} files uploaded successfully", self.success_count()))
        })
    }

    fn failure_notice(&self) -> Option<Notice> {
        (self.failure_count() > 0).then(|| {
            Notice::error(format!(
                "{} files failed: {}",
                self.failure_count(),
                self.reasons().join(", ")
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// BusyFlag
// ---------------------------------------------------------------------------

/// Aggregate "work in progress" indicator; observers subscribe to changes.
///
/// Counts batches in flight, so overlapping batches keep it raised until the
/// last one settles.
pub struct BusyFlag {
    tx: watch::Sender<bool>,
    in_flight: Mutex<usize>,
}

impl Default for BusyFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl BusyFlag {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx,
            in_flight: Mutex::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn in_flight(&self) -> usize {
        *self.lock_in_flight()
    }

    /// Asserts the flag until the returned guard is dropped.
    pub fn acquire<'a>(&'a self, presenter: &'a dyn Presenter) -> BusyGuard<'a> {
        let raised = {
            let mut in_flight = self.lock_in_flight();
            *in_flight += 1;
            *in_flight == 1
        };
        if raised {
            self.tx.send_replace(true);
            presenter.set_busy(true);
        }
        BusyGuard {
            flag: self,
            presenter,
        }
    }

    fn release(&self, presenter: &dyn Presenter) {
        let lowered = {
            let mut in_flight = self.lock_in_flight();
            *in_flight = in_flight.saturating_sub(1);
            *in_flight == 0
        };
        if lowered {
            self.tx.send_replace(false);
            presenter.set_busy(false);
        }
    }

    // The count is never left half-updated, so a poisoned lock is still valid.
    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, usize> {
        self.in_flight
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Releases the busy flag on every exit path, unwinding included.
#[must_use = "the busy flag is released as soon as the guard is dropped"]
pub struct BusyGuard<'a> {
    flag: &'a BusyFlag,
    presenter: &'a dyn Presenter,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.release(self.presenter);
    }
}

// ---------------------------------------------------------------------------
// IngestionCoordinator
// ---------------------------------------------------------------------------

pub struct IngestionCoordinator {
    store: Arc<dyn RemoteStore>,
    synchronizer: Arc<SelectionSynchronizer>,
    presenter: Arc<dyn Presenter>,
    busy: BusyFlag,
}

impl IngestionCoordinator {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        synchronizer: Arc<SelectionSynchronizer>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            store,
            synchronizer,
            presenter,
            busy: BusyFlag::new(),
        }
    }

    pub fn busy(&self) -> &BusyFlag {
        &self.busy
    }

    /// Uploads every file concurrently and waits for all of them to settle.
    ///
    /// A batch without a single image is refused up front with
    /// `Error::NoEligibleFiles` and nothing is sent. Otherwise the whole batch is
    /// dispatched; individual failures end up in the result, never as `Err`.
    /// The catalog is reloaded once if anything succeeded.
    pub async fn ingest(&self, files: Vec<LeafFile>) -> Result<BatchResult> {
        if !files.iter().any(LeafFile::is_image) {
            let err = Error::NoEligibleFiles;
            self.presenter.notify(Notice::error(err.to_string()));
            return Err(err);
        }

        let _busy = self.busy.acquire(self.presenter.as_ref());
        info!(files = files.len(), "dispatching upload batch");

        let outcomes = join_all(files.iter().map(|file| self.ingest_one(file))).await;
        let result = BatchResult::from_outcomes(outcomes);
        info!(
            succeeded = result.success_count(),
            failed = result.failure_count(),
            "upload batch settled"
        );

        if let Some(notice) = result.success_notice() {
            self.presenter.notify(notice);
        }
        if let Some(notice) = result.failure_notice() {
            self.presenter.notify(notice);
        }
        if result.success_count() > 0
            && let Err(err) = self.synchronizer.reload().await
        {
            debug!("catalog reload after upload failed: {err}");
        }
        Ok(result)
    }

    async fn ingest_one(&self, file: &LeafFile) -> IngestionOutcome {
        match self.store.upload(file).await {
            Ok(entry) => {
                debug!(file = file.name(), stored = %entry.filename, "uploaded");
                IngestionOutcome::Success(entry)
            }
            Err(err) => {
                warn!(file = file.name(), "upload failed: {err}");
                IngestionOutcome::Failure(IngestFailure {
                    file: file.name().to_owned(),
                    reason: err.reason(),
                })
            }
        }
    }
}
