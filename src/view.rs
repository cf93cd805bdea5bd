//! Presentation boundary and the collection view model behind it.

use std::fmt;
use std::io::Write;

use url::Url;

use crate::base::catalog::{ActiveSelection, Catalog};
use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub severity: Severity,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// What the core asks of whatever shows results to the user.
pub trait Presenter: Send + Sync {
    /// Replaces the whole collection view.
    fn render(&self, catalog: &Catalog, active: &ActiveSelection);

    /// Marks `filename` active and every other entry inactive.
    fn mark_active(&self, filename: &str);

    fn notify(&self, notice: Notice);

    fn set_busy(&self, busy: bool);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryView {
    pub filename: String,
    pub url: String,
    pub active: bool,
}

impl EntryView {
    /// Label of the entry's activation control.
    pub fn label(&self) -> &'static str {
        if self.active { "Selected" } else { "Select" }
    }
}

/// One activatable entry per catalog item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionView {
    entries: Vec<EntryView>,
}

impl CollectionView {
    pub fn build(catalog: &Catalog, active: &ActiveSelection, public_url: &Url) -> Self {
        let entries = catalog
            .filenames()
            .iter()
            .map(|filename| EntryView {
                filename: filename.clone(),
                url: entry_url(public_url, filename),
                active: active.is(filename),
            })
            .collect();
        Self { entries }
    }

    /// Full replace: recomputes every entry, so stale marks cannot survive.
    pub fn mark_active(&mut self, filename: &str) {
        for entry in &mut self.entries {
            entry.active = entry.filename == filename;
        }
    }

    pub fn entries(&self) -> &[EntryView] {
        &self.entries
    }

    pub fn active_entries(&self) -> impl Iterator<Item = &EntryView> {
        self.entries.iter().filter(|e| e.active)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for CollectionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return writeln!(f, "No images uploaded yet");
        }
        for entry in &self.entries {
            let marker = if entry.active { '*' } else { ' ' };
            writeln!(
                f,
                "[{marker}] {:<8} {}  {}",
                entry.label(),
                entry.filename,
                entry.url
            )?;
        }
        Ok(())
    }
}

fn entry_url(public_url: &Url, filename: &str) -> String {
    let mut url = public_url.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(filename);
    }
    url.to_string()
}

/// Writes the view and notices as plain text.
pub struct TerminalPresenter {
    public_url: Url,
    view: Mutex<CollectionView>,
    out: Mutex<Box<dyn Write + Send>>,
}

impl TerminalPresenter {
    pub fn new(public_url: Url, out: Box<dyn Write + Send>) -> Self {
        Self {
            public_url,
            view: Mutex::new(CollectionView::default()),
            out: Mutex::new(out),
        }
    }

    pub fn stdout(public_url: Url) -> Self {
        Self::new(public_url, Box::new(std::io::stdout()))
    }

    pub fn view(&self) -> CollectionView {
        self.view.lock().unwrap().clone()
    }

    fn write(&self, text: &str) {
        let mut out = self.out.lock().unwrap();
        if let Err(err) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
            debug!("failed to write to terminal: {err}");
        }
    }
}

impl Presenter for TerminalPresenter {
    fn render(&self, catalog: &Catalog, active: &ActiveSelection) {
        let view = CollectionView::build(catalog, active, &self.public_url);
        let text = view.to_string();
        *self.view.lock().unwrap() = view;
        self.write(&text);
    }

    fn mark_active(&self, filename: &str) {
        let text = {
            let mut view = self.view.lock().unwrap();
            view.mark_active(filename);
            (!view.is_empty()).then(|| view.to_string())
        };
        if let Some(text) = text {
            self.write(&text);
        }
    }

    fn notify(&self, notice: Notice) {
        let tag = match notice.severity {
            Severity::Success => "ok",
            Severity::Error => "error",
        };
        self.write(&format!("{tag}: {}\n", notice.message));
    }

    fn set_busy(&self, busy: bool) {
        if busy {
            self.write("uploading...\n");
        }
    }
}
