use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{BoxStream, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::entry::Entry;
use crate::error::Result;
use crate::scanner::Scanner;
use crate::stream::EntryStream;

/// Truncates a scan after `limit` entries and stops the inner scan.
#[derive(Debug)]
pub struct LimitScanner {
    inner: Box<dyn Scanner>,
    limit: usize,
}

impl LimitScanner {
    /// Forward at most `limit` entries of `inner`. Zero yields nothing.
    pub fn new(inner: impl Scanner + 'static, limit: usize) -> Self {
        Self {
            inner: Box::new(inner),
            limit,
        }
    }

    /// Configured entry limit.
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Scanner for LimitScanner {
    fn scan(&self, cancel: CancellationToken) -> Result<EntryStream> {
        let scope = cancel.child_token();
        let stream = self.inner.scan(scope.clone())?;
        let limit = self.limit;
        Ok(stream.map_inner(move |inner| Truncated {
            inner: (limit > 0).then_some(inner),
            remaining: limit,
            scope,
        }))
    }
}

struct Truncated {
    inner: Option<BoxStream<'static, Entry>>,
    remaining: usize,
    scope: CancellationToken,
}

impl Stream for Truncated {
    type Item = Entry;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Entry>> {
        let Some(inner) = self.inner.as_mut() else {
            self.scope.cancel();
            return Poll::Ready(None);
        };

        match inner.poll_next_unpin(cx) {
            Poll::Ready(Some(entry)) => {
                self.remaining -= 1;
                if self.remaining == 0 {
                    debug!(target: "scan::limit", "entry limit reached, stopping scan");
                    self.inner = None;
                    self.scope.cancel();
                }
                Poll::Ready(Some(entry))
            }
            Poll::Ready(None) => {
                self.inner = None;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
