use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::task::{forward_listing, guarded};
use crate::error::{Result, ScanError};
use crate::lister::{DirectoryLister, LocalLister, validate_roots};
use crate::scanner::{DEFAULT_BUFFER, Scanner};
use crate::stream::EntryStream;

/// Lists a single directory without descending into it.
pub struct FlatScanner {
    dir: Option<PathBuf>,
    buffer: usize,
    lister: Arc<dyn DirectoryLister>,
}

impl fmt::Debug for FlatScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatScanner")
            .field("dir", &self.dir)
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}

impl FlatScanner {
    /// Scanner over one local directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_lister(Arc::new(LocalLister::new()), Some(dir.into()))
    }

    /// A scanner with no directory; its stream closes immediately.
    pub fn unset() -> Self {
        Self {
            dir: None,
            buffer: DEFAULT_BUFFER,
            lister: Arc::new(LocalLister::new()),
        }
    }

    /// Scanner over `dir` through `lister`; `None` gives an empty stream.
    pub fn with_lister(lister: Arc<dyn DirectoryLister>, dir: Option<PathBuf>) -> Result<Self> {
        let dir = match dir {
            Some(dir) => validate_roots(lister.as_ref(), [dir])?.into_iter().next(),
            None => None,
        };
        Ok(Self {
            dir,
            buffer: DEFAULT_BUFFER,
            lister,
        })
    }

    /// Replace the output queue capacity; zero is rejected.
    pub fn with_buffer(mut self, buffer: usize) -> Result<Self> {
        if buffer == 0 {
            return Err(ScanError::InvalidConfig(
                "output buffer must hold at least one entry".into(),
            ));
        }
        self.buffer = buffer;
        Ok(self)
    }

    /// Directory being listed, if any.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}

impl Scanner for FlatScanner {
    fn scan(&self, cancel: CancellationToken) -> Result<EntryStream> {
        let (sink, stream) = EntryStream::channel(self.buffer, &cancel);
        let Some(dir) = self.dir.clone() else {
            return Ok(stream);
        };

        let lister = Arc::clone(&self.lister);
        tokio::spawn(async move {
            let listing = forward_listing(lister.as_ref(), &dir, &sink, |_| {});
            if let Some(outcome) = guarded(&dir, &sink, listing).await {
                debug!(
                    target: "scan::flat",
                    path = %dir.display(),
                    entries = outcome.entries,
                    failed = outcome.failed,
                    "flat listing finished"
                );
            }
        });

        Ok(stream)
    }
}
