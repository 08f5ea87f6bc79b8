use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::scanner::Scanner;
use crate::stream::EntryStream;

/// Merges the streams of several scanners. Entries interleave in whatever
/// order the inner scanners produce them; the merged stream ends once every
/// inner stream has ended.
#[derive(Debug, Default)]
pub struct MultiScanner {
    scanners: Vec<Box<dyn Scanner>>,
}

impl MultiScanner {
    /// Merge `scanners`.
    pub fn new(scanners: Vec<Box<dyn Scanner>>) -> Self {
        Self { scanners }
    }

    /// Add another scanner.
    pub fn push(&mut self, scanner: impl Scanner + 'static) {
        self.scanners.push(Box::new(scanner));
    }

    /// Number of merged scanners.
    pub fn len(&self) -> usize {
        self.scanners.len()
    }

    /// True when nothing is merged; the scan then closes immediately.
    pub fn is_empty(&self) -> bool {
        self.scanners.is_empty()
    }
}

impl Scanner for MultiScanner {
    fn scan(&self, cancel: CancellationToken) -> Result<EntryStream> {
        // Streams opened before a failing scanner are dropped on return,
        // which cancels them.
        let mut inner = Vec::with_capacity(self.scanners.len());
        let mut guards = Vec::new();
        for scanner in &self.scanners {
            let (stream, scopes) = scanner.scan(cancel.clone())?.into_parts();
            inner.push(stream);
            guards.extend(scopes);
        }

        Ok(EntryStream::from_parts(
            stream::select_all(inner).boxed(),
            guards,
        ))
    }
}
