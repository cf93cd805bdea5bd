//! Expands a drop payload of files and directories into a flat file list.

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};

use crate::base::source::{LeafFile, SourceHandle};
use crate::prelude::*;

/// Leaf files in discovery order.
#[derive(Debug, Default)]
pub struct FlatFileList {
    pub files: Vec<LeafFile>,
    /// Directories whose reads failed; whatever they yielded before failing is kept.
    pub unreadable: Vec<String>,
}

impl FlatFileList {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn append(&mut self, mut other: FlatFileList) {
        self.files.append(&mut other.files);
        self.unreadable.append(&mut other.unreadable);
    }
}

/// Recursively expands `handles`.
///
/// Each directory is read until it returns an empty batch; its children are
/// then expanded concurrently. The result is complete only once every branch
/// has resolved, and keeps first-discovered-first-appended order.
pub async fn enumerate(handles: Vec<SourceHandle>) -> FlatFileList {
    let listing = expand_all(handles).await;
    debug!(
        files = listing.len(),
        unreadable = listing.unreadable.len(),
        "enumerated sources"
    );
    listing
}

async fn expand_all(handles: Vec<SourceHandle>) -> FlatFileList {
    let mut listing = FlatFileList::default();
    for expansion in join_all(handles.into_iter().map(expand)).await {
        listing.append(expansion);
    }
    listing
}

fn expand(handle: SourceHandle) -> BoxFuture<'static, FlatFileList> {
    async move {
        let mut dir = match handle {
            SourceHandle::File(file) => {
                return FlatFileList {
                    files: vec![file],
                    unreadable: Vec::new(),
                };
            }
            SourceHandle::Directory(dir) => dir,
        };

        let mut children = Vec::new();
        let mut unreadable = Vec::new();
        loop {
            match dir.read_children().await {
                Ok(batch) if batch.is_empty() => break,
                Ok(batch) => children.extend(batch),
                Err(err) => {
                    warn!(directory = dir.name(), "failed to read directory: {err}");
                    unreadable.push(dir.name().to_owned());
                    break;
                }
            }
        }
        trace!(directory = dir.name(), children = children.len(), "directory read");

        let mut listing = FlatFileList {
            files: Vec::new(),
            unreadable,
        };
        listing.append(expand_all(children).await);
        listing
    }
    .boxed()
}
