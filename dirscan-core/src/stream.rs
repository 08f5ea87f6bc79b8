//! The entry stream shared by every scanner.
//!
//! Producers write through an [`EntrySink`] into a bounded queue; the consumer
//! reads the [`EntryStream`]. A full queue blocks producers instead of
//! discarding entries. Dropping the stream cancels the scan that feeds it.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{self, BoxStream, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::entry::Entry;

/// Lazily produced sequence of entries. Ends with `None` once every producer
/// is done or the scan was cancelled.
pub struct EntryStream {
    inner: BoxStream<'static, Entry>,
    guards: Vec<DropGuard>,
}

impl EntryStream {
    /// A stream that is already closed.
    pub fn empty() -> Self {
        Self::from_stream(stream::empty())
    }

    /// Wrap an existing stream. It carries no cancellation scope of its own.
    pub fn from_stream<S>(inner: S) -> Self
    where
        S: Stream<Item = Entry> + Send + 'static,
    {
        Self {
            inner: inner.boxed(),
            guards: Vec::new(),
        }
    }

    /// Bounded hand-off queue between producers and one consumer.
    ///
    /// The sink observes a child of `cancel`; dropping the returned stream
    /// cancels that child without touching the caller's token.
    pub fn channel(capacity: usize, cancel: &CancellationToken) -> (EntrySink, EntryStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let scope = cancel.child_token();
        let sink = EntrySink {
            tx,
            cancel: scope.clone(),
        };
        let stream = EntryStream {
            inner: ReceiverStream::new(rx).boxed(),
            guards: vec![scope.drop_guard()],
        };
        (sink, stream)
    }

    pub(crate) fn into_parts(self) -> (BoxStream<'static, Entry>, Vec<DropGuard>) {
        (self.inner, self.guards)
    }

    pub(crate) fn from_parts(inner: BoxStream<'static, Entry>, guards: Vec<DropGuard>) -> Self {
        Self { inner, guards }
    }

    /// Replace the underlying stream while keeping its cancellation scope.
    pub(crate) fn map_inner<F, S>(self, f: F) -> Self
    where
        F: FnOnce(BoxStream<'static, Entry>) -> S,
        S: Stream<Item = Entry> + Send + 'static,
    {
        let (inner, guards) = self.into_parts();
        Self::from_parts(f(inner).boxed(), guards)
    }
}

impl Stream for EntryStream {
    type Item = Entry;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl fmt::Debug for EntryStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryStream")
            .field("cancel_scopes", &self.guards.len())
            .finish_non_exhaustive()
    }
}

/// Producer half of an [`EntryStream`]. Cheap to clone; the stream closes
/// once every clone is dropped.
#[derive(Debug, Clone)]
pub struct EntrySink {
    tx: mpsc::Sender<Entry>,
    cancel: CancellationToken,
}

impl EntrySink {
    /// Deliver one entry, waiting while the queue is full.
    ///
    /// Returns `false` when the scan was cancelled or the consumer went away;
    /// the caller should stop producing.
    pub async fn send(&self, entry: Entry) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.tx.send(entry) => sent.is_ok(),
        }
    }

    /// Token producers should watch between blocking steps.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// True once the scan was cancelled or the stream was dropped.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }
}
