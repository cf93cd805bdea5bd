use std::fmt;

use crate::prelude::*;

/// Metadata the store returns for a freshly ingested file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub filename: String,
}

/// Full snapshot of ingested filenames, in the order the store lists them.
///
/// Only ever replaced wholesale; there is no incremental patching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    filenames: Vec<String>,
}

impl Catalog {
    pub fn new(filenames: Vec<String>) -> Self {
        Self { filenames }
    }

    pub fn filenames(&self) -> &[String] {
        &self.filenames
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.filenames.iter().any(|f| f == filename)
    }

    pub fn len(&self) -> usize {
        self.filenames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
    }
}

impl From<Vec<String>> for Catalog {
    fn from(filenames: Vec<String>) -> Self {
        Self::new(filenames)
    }
}

/// At most one filename designated for downstream consumption.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveSelection(Option<String>);

impl ActiveSelection {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn some(filename: impl Into<String>) -> Self {
        Self(Some(filename.into()))
    }

    /// Empty strings count as "nothing selected".
    pub fn from_optional(filename: Option<String>) -> Self {
        Self(filename.filter(|f| !f.is_empty()))
    }

    pub fn filename(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is(&self, filename: &str) -> bool {
        self.0.as_deref() == Some(filename)
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Display for ActiveSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(filename) => write!(f, "{filename}"),
            None => write!(f, "(none)"),
        }
    }
}
