//! Local filesystem source: turns paths into file and directory handles.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{DirEntry, ReadDir};
use tokio::io::AsyncReadExt;

use crate::base::source::{ContainerDirectory, LeafFile, Payload, SourceHandle};
use crate::prelude::*;

/// Bytes inspected when sniffing the declared media type.
const SNIFF_LEN: u64 = 8192;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Declared media type for a file on disk, sniffed from its leading bytes.
///
/// Unreadable or unrecognised files are declared as `application/octet-stream`;
/// the store has the final say.
pub async fn sniff_media_type(path: &Path) -> &'static str {
    let mut head = Vec::new();
    let read = async {
        let file = tokio::fs::File::open(path).await?;
        file.take(SNIFF_LEN).read_to_end(&mut head).await
    };
    if let Err(err) = read.await {
        debug!(path = %path.display(), "cannot sniff media type: {err}");
        return OCTET_STREAM;
    }
    infer::get(&head)
        .map(|kind| kind.mime_type())
        .unwrap_or(OCTET_STREAM)
}

pub async fn leaf_file(path: &Path) -> LeafFile {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let media_type = sniff_media_type(path).await;
    LeafFile::new(name, media_type, Payload::Path(path.to_path_buf()))
}

/// Classifies a path given on input into a leaf file or a directory handle.
pub async fn source_handle(path: &Path, page_size: usize) -> Result<SourceHandle> {
    let metadata = tokio::fs::metadata(path).await?;
    if metadata.is_dir() {
        Ok(SourceHandle::directory(LocalDirectory::new(path, page_size)))
    } else {
        Ok(leaf_file(path).await.into())
    }
}

/// A directory on disk, read lazily in pages of at most `page_size` entries.
pub struct LocalDirectory {
    path: PathBuf,
    name: String,
    page_size: usize,
    entries: Option<ReadDir>,
    exhausted: bool,
    /// A failure hit after part of a page was read; reported by the next read.
    deferred: Option<io::Error>,
}

impl LocalDirectory {
    pub fn new(path: impl Into<PathBuf>, page_size: usize) -> Self {
        let path = path.into();
        Self {
            name: path.display().to_string(),
            path,
            page_size: page_size.max(1),
            entries: None,
            exhausted: false,
            deferred: None,
        }
    }

    async fn classify(&self, entry: DirEntry) -> io::Result<Option<SourceHandle>> {
        let path = entry.path();
        let file_type = entry.file_type().await?;
        if file_type.is_dir() {
            return Ok(Some(SourceHandle::directory(LocalDirectory::new(
                path,
                self.page_size,
            ))));
        }
        if file_type.is_file() {
            return Ok(Some(leaf_file(&path).await.into()));
        }
        if file_type.is_symlink() {
            // Linked files are taken, linked directories are not followed.
            match tokio::fs::metadata(&path).await {
                Ok(target) if target.is_file() => return Ok(Some(leaf_file(&path).await.into())),
                Ok(_) => debug!(path = %path.display(), "skipping directory symlink"),
                Err(err) => warn!(path = %path.display(), "skipping broken symlink: {err}"),
            }
        }
        Ok(None)
    }

    /// Ends the listing after a failed entry. Children already collected for
    /// this page are returned and the failure is held for the next read.
    fn settle_failed_page(
        &mut self,
        batch: Vec<SourceHandle>,
        err: io::Error,
    ) -> Result<Vec<SourceHandle>> {
        self.exhausted = true;
        self.entries = None;
        if batch.is_empty() {
            return Err(err.into());
        }
        self.deferred = Some(err);
        Ok(batch)
    }
}

#[async_trait]
impl ContainerDirectory for LocalDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_children(&mut self) -> Result<Vec<SourceHandle>> {
        if let Some(err) = self.deferred.take() {
            return Err(err.into());
        }
        if self.exhausted {
            return Ok(Vec::new());
        }
        let mut entries = match self.entries.take() {
            Some(entries) => entries,
            None => tokio::fs::read_dir(&self.path).await?,
        };

        let mut batch = Vec::new();
        while batch.len() < self.page_size {
            let step = match entries.next_entry().await {
                Ok(Some(entry)) => self.classify(entry).await,
                Ok(None) => {
                    self.exhausted = true;
                    break;
                }
                Err(err) => Err(err),
            };
            match step {
                Ok(Some(child)) => batch.push(child),
                Ok(None) => {}
                Err(err) => return self.settle_failed_page(batch, err),
            }
        }
        if !self.exhausted {
            self.entries = Some(entries);
        }
        Ok(batch)
    }
}
