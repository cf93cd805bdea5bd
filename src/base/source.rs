//! Source handles: what a user hands over for ingestion.

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::prelude::*;

/// Media type prefix that makes a file eligible for ingestion.
pub const IMAGE_MEDIA_PREFIX: &str = "image/";

/// Where a leaf file's bytes live.
#[derive(Clone)]
pub enum Payload {
    Path(PathBuf),
    Bytes(Bytes),
}

impl Payload {
    /// Reads the full payload.
    pub async fn read(&self) -> Result<Bytes> {
        match self {
            Payload::Path(path) => Ok(Bytes::from(tokio::fs::read(path).await?)),
            Payload::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Payload::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
        }
    }
}

/// A terminal source item with byte content and a declared media type.
#[derive(Debug, Clone)]
pub struct LeafFile {
    name: String,
    media_type: String,
    payload: Payload,
}

impl LeafFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, payload: Payload) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            payload,
        }
    }

    pub fn from_bytes(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self::new(name, media_type, Payload::Bytes(bytes.into()))
    }

    /// File name as it will be announced to the store.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Coarse eligibility check on the declared media type.
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with(IMAGE_MEDIA_PREFIX)
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Path on disk, when the payload is file-backed.
    pub fn path(&self) -> Option<&Path> {
        match &self.payload {
            Payload::Path(path) => Some(path),
            Payload::Bytes(_) => None,
        }
    }

    pub async fn contents(&self) -> Result<Bytes> {
        self.payload.read().await
    }
}

/// A hierarchical source item whose children are discovered asynchronously.
///
/// One call is not guaranteed to return every child: callers keep reading
/// until an empty batch comes back.
#[async_trait]
pub trait ContainerDirectory: Send {
    /// Name used when reporting problems with this directory.
    fn name(&self) -> &str;

    /// Returns the next batch of children; an empty batch means exhausted.
    async fn read_children(&mut self) -> Result<Vec<SourceHandle>>;
}

pub enum SourceHandle {
    File(LeafFile),
    Directory(Box<dyn ContainerDirectory>),
}

impl SourceHandle {
    pub fn directory(dir: impl ContainerDirectory + 'static) -> Self {
        SourceHandle::Directory(Box::new(dir))
    }
}

impl From<LeafFile> for SourceHandle {
    fn from(file: LeafFile) -> Self {
        SourceHandle::File(file)
    }
}

impl fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceHandle::File(file) => f.debug_tuple("File").field(&file.name).finish(),
            SourceHandle::Directory(dir) => f.debug_tuple("Directory").field(&dir.name()).finish(),
        }
    }
}
