use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{Result, ScanError};
use crate::stream::EntryStream;

/// Default capacity of the output queue between producers and the consumer.
pub const DEFAULT_BUFFER: usize = 64;

/// Number of execution units on the host, never less than one.
pub fn default_workers() -> usize {
    num_cpus::get().max(1)
}

/// Anything that produces an [`EntryStream`].
///
/// `scan` returns immediately; the work happens on spawned tasks, so it must
/// be called from within a Tokio runtime. Cancelling `cancel` (or dropping the
/// returned stream) ends the stream early without an error.
pub trait Scanner: Send + Sync + fmt::Debug {
    /// Start producing entries.
    fn scan(&self, cancel: CancellationToken) -> Result<EntryStream>;
}

impl<S: Scanner + ?Sized> Scanner for Box<S> {
    fn scan(&self, cancel: CancellationToken) -> Result<EntryStream> {
        (**self).scan(cancel)
    }
}

impl<S: Scanner + ?Sized> Scanner for Arc<S> {
    fn scan(&self, cancel: CancellationToken) -> Result<EntryStream> {
        (**self).scan(cancel)
    }
}

/// Tuning shared by the listing scanners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Maximum number of directories listed concurrently.
    pub workers: usize,
    /// Capacity of the output queue.
    pub buffer: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            buffer: DEFAULT_BUFFER,
        }
    }
}

impl ScanOptions {
    /// Replace the worker cap.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Replace the output queue capacity.
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer;
        self
    }

    /// Reject a zero worker cap or a zero buffer.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ScanError::InvalidConfig(
                "worker cap must be at least 1".into(),
            ));
        }
        if self.buffer == 0 {
            return Err(ScanError::InvalidConfig(
                "output buffer must hold at least one entry".into(),
            ));
        }
        Ok(())
    }
}
