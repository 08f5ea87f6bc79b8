//! Non-recursive directory listing.
//!
//! A [`DirectoryLister`] reads exactly one directory and yields its immediate
//! entries. Scanners build on it; it never recurses on its own.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::entry::{EntryKind, FileMetadata};
use crate::error::{Result, ScanError};

/// `tokio::fs` backend
pub mod local;
/// In-memory backend with fault injection
pub mod memory;

pub use local::LocalLister;
pub use memory::InMemoryLister;

/// Minimal, async-capable directory listing abstraction used by scanners.
#[async_trait]
pub trait DirectoryLister: Send + Sync + 'static {
    /// Classify a path (following symbolic links). Used to validate roots
    /// before a scan starts, so it is synchronous.
    fn root_kind(&self, path: &Path) -> io::Result<EntryKind>;

    /// Open a directory for iteration.
    async fn read_dir(&self, path: &Path) -> io::Result<Box<dyn DirectoryReader>>;
}

/// Async iterator over the immediate entries of one directory.
#[async_trait]
pub trait DirectoryReader: Send {
    /// Return the next entry, or `None` when exhausted.
    async fn next_entry(&mut self) -> io::Result<Option<FileMetadata>>;
}

/// Check that every root exists and is a directory, dropping duplicates while
/// keeping first-seen order.
pub fn validate_roots<I, P>(lister: &dyn DirectoryLister, roots: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::new();

    for root in roots {
        let root = root.into();
        match lister.root_kind(&root) {
            Ok(EntryKind::Directory) => {}
            Ok(_) => return Err(ScanError::NotADirectory(root)),
            Err(source) => return Err(ScanError::RootNotFound { path: root, source }),
        }

        if seen.insert(root.clone()) {
            unique.push(root);
        }
    }

    Ok(unique)
}
