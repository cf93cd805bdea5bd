//! In-memory fakes for the store, directory and presenter seams.

use std::collections::HashMap;
use std::io;

use tokio::sync::Barrier;
use url::Url;

use crate::base::catalog::{ActiveSelection, Catalog, CatalogEntry};
use crate::base::source::{ContainerDirectory, LeafFile, SourceHandle};
use crate::ops::store::RemoteStore;
use crate::prelude::*;
use crate::view::{CollectionView, Notice, Presenter};

pub fn image(name: &str) -> LeafFile {
    LeafFile::from_bytes(name, "image/png", format!("bytes of {name}").into_bytes())
}

pub fn text(name: &str) -> LeafFile {
    LeafFile::from_bytes(name, "text/plain", format!("text of {name}").into_bytes())
}

// ---------------------------------------------------------------------------
// FakeDirectory
// ---------------------------------------------------------------------------

/// Shared record of `"{dir}:{read index}"` for every directory read.
#[derive(Clone, Default)]
pub struct ReadLog(Arc<Mutex<Vec<String>>>);

impl ReadLog {
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }
}

enum FakeChild {
    File(LeafFile),
    Dir(FakeDirectory),
}

pub struct FakeDirectory {
    name: String,
    page_size: usize,
    children: Vec<FakeChild>,
    reads: usize,
    fail_after: Option<usize>,
    log: Option<ReadLog>,
}

impl FakeDirectory {
    pub fn new(name: impl Into<String>, page_size: usize) -> Self {
        Self {
            name: name.into(),
            page_size,
            children: Vec::new(),
            reads: 0,
            fail_after: None,
            log: None,
        }
    }

    pub fn file(mut self, name: impl AsRef<str>) -> Self {
        self.children.push(FakeChild::File(image(name.as_ref())));
        self
    }

    pub fn dir(mut self, dir: FakeDirectory) -> Self {
        self.children.push(FakeChild::Dir(dir));
        self
    }

    /// The read with this index (and all later ones) fails.
    pub fn fail_after(mut self, reads: usize) -> Self {
        self.fail_after = Some(reads);
        self
    }

    pub fn with_log(mut self, log: ReadLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn into_handle(self) -> SourceHandle {
        SourceHandle::directory(self)
    }
}

#[async_trait]
impl ContainerDirectory for FakeDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_children(&mut self) -> Result<Vec<SourceHandle>> {
        // Give sibling reads a chance to interleave.
        tokio::task::yield_now().await;

        let read = self.reads;
        self.reads += 1;
        if let Some(log) = &self.log {
            log.push(format!("{}:{read}", self.name));
        }
        if self.fail_after.is_some_and(|n| read >= n) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied").into());
        }

        let take = self.page_size.min(self.children.len());
        Ok(self
            .children
            .drain(..take)
            .map(|child| match child {
                FakeChild::File(file) => file.into(),
                FakeChild::Dir(dir) => dir.into_handle(),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// FakeStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeStoreState {
    catalog: Vec<String>,
    current: Option<String>,
    rejections: HashMap<String, String>,
    broken_uploads: Vec<String>,
    failing_catalog: bool,
    uploads: usize,
    catalog_fetches: usize,
    selection_fetches: usize,
    selects: usize,
}

/// Store double; uploads append to the catalog unless told to reject them.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<FakeStoreState>,
    upload_gate: Option<Barrier>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(self, filenames: &[&str]) -> Self {
        self.state.lock().unwrap().catalog = filenames.iter().map(|f| (*f).to_owned()).collect();
        self
    }

    pub fn with_current(self, filename: &str) -> Self {
        self.state.lock().unwrap().current = Some(filename.to_owned());
        self
    }

    /// Uploads of `filename` are rejected with `reason`, like a non-2xx `{message}` body.
    pub fn reject(self, filename: &str, reason: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .rejections
            .insert(filename.to_owned(), reason.to_owned());
        self
    }

    /// Uploads of `filename` fail below HTTP, like a dropped connection.
    pub fn break_upload(self, filename: &str) -> Self {
        self.state.lock().unwrap().broken_uploads.push(filename.to_owned());
        self
    }

    pub fn failing_catalog(self) -> Self {
        self.state.lock().unwrap().failing_catalog = true;
        self
    }

    /// Every upload waits until `n` uploads are in flight at once.
    pub fn with_upload_gate(mut self, n: usize) -> Self {
        self.upload_gate = Some(Barrier::new(n));
        self
    }

    pub fn uploads(&self) -> usize {
        self.state.lock().unwrap().uploads
    }

    pub fn catalog_fetches(&self) -> usize {
        self.state.lock().unwrap().catalog_fetches
    }

    pub fn selection_fetches(&self) -> usize {
        self.state.lock().unwrap().selection_fetches
    }

    pub fn selects(&self) -> usize {
        self.state.lock().unwrap().selects
    }

    pub fn current(&self) -> Option<String> {
        self.state.lock().unwrap().current.clone()
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn upload(&self, file: &LeafFile) -> Result<CatalogEntry> {
        if let Some(gate) = &self.upload_gate {
            gate.wait().await;
        }
        let mut state = self.state.lock().unwrap();
        state.uploads += 1;
        if let Some(reason) = state.rejections.get(file.name()) {
            return Err(Error::rejected(400, reason.clone()));
        }
        if state.broken_uploads.iter().any(|f| f == file.name()) {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset").into());
        }
        state.catalog.push(file.name().to_owned());
        Ok(CatalogEntry {
            filename: file.name().to_owned(),
        })
    }

    async fn current_selection(&self) -> Result<ActiveSelection> {
        let mut state = self.state.lock().unwrap();
        state.selection_fetches += 1;
        Ok(ActiveSelection::from_optional(state.current.clone()))
    }

    async fn catalog(&self) -> Result<Catalog> {
        let mut state = self.state.lock().unwrap();
        state.catalog_fetches += 1;
        if state.failing_catalog {
            return Err(Error::rejected(500, "Error reading upload directory"));
        }
        Ok(Catalog::new(state.catalog.clone()))
    }

    async fn select(&self, filename: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.selects += 1;
        if !state.catalog.iter().any(|f| f == filename) {
            return Err(Error::rejected(404, "File not found"));
        }
        state.current = Some(filename.to_owned());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingPresenter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenterEvent {
    Render {
        catalog: Vec<String>,
        active: Option<String>,
    },
    MarkActive(String),
    Notice(Notice),
    Busy(bool),
}

/// Records every call and keeps the resulting collection view.
#[derive(Default)]
pub struct RecordingPresenter {
    events: Mutex<Vec<PresenterEvent>>,
    view: Mutex<CollectionView>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PresenterEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresenterEvent::Notice(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }

    pub fn busy_events(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresenterEvent::Busy(busy) => Some(busy),
                _ => None,
            })
            .collect()
    }

    pub fn renders(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, PresenterEvent::Render { .. }))
            .count()
    }

    pub fn view(&self) -> CollectionView {
        self.view.lock().unwrap().clone()
    }

    fn record(&self, event: PresenterEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl Presenter for RecordingPresenter {
    fn render(&self, catalog: &Catalog, active: &ActiveSelection) {
        let public_url = Url::parse("http://store.test/uploads/").unwrap();
        *self.view.lock().unwrap() = CollectionView::build(catalog, active, &public_url);
        self.record(PresenterEvent::Render {
            catalog: catalog.filenames().to_vec(),
            active: active.filename().map(str::to_owned),
        });
    }

    fn mark_active(&self, filename: &str) {
        self.view.lock().unwrap().mark_active(filename);
        self.record(PresenterEvent::MarkActive(filename.to_owned()));
    }

    fn notify(&self, notice: Notice) {
        self.record(PresenterEvent::Notice(notice));
    }

    fn set_busy(&self, busy: bool) {
        self.record(PresenterEvent::Busy(busy));
    }
}
