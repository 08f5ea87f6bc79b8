use std::fmt;
use std::sync::Arc;

use futures::stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::entry::Entry;
use crate::error::Result;
use crate::scanner::Scanner;
use crate::stream::EntryStream;

type Observer = Arc<dyn Fn(&Entry) + Send + Sync>;

/// Side-channel observer: sees every entry on its way to the consumer without
/// altering the stream.
pub struct TraceScanner {
    inner: Box<dyn Scanner>,
    observer: Observer,
}

impl TraceScanner {
    /// Log each entry at debug level under the `scan::trace` target.
    pub fn new(inner: impl Scanner + 'static) -> Self {
        Self::with_observer(inner, log_entry)
    }

    /// Call `observer` for every entry instead of logging.
    pub fn with_observer<F>(inner: impl Scanner + 'static, observer: F) -> Self
    where
        F: Fn(&Entry) + Send + Sync + 'static,
    {
        Self {
            inner: Box::new(inner),
            observer: Arc::new(observer),
        }
    }
}

fn log_entry(entry: &Entry) {
    match entry {
        Ok(meta) => debug!(target: "scan::trace", kind = %meta.kind, path = %meta.path.display(), "entry"),
        Err(err) => debug!(target: "scan::trace", error = %err, "entry error"),
    }
}

impl fmt::Debug for TraceScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceScanner")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl Scanner for TraceScanner {
    fn scan(&self, cancel: CancellationToken) -> Result<EntryStream> {
        let observer = Arc::clone(&self.observer);
        let stream = self.inner.scan(cancel)?;
        Ok(stream.map_inner(move |inner| inner.inspect(move |entry| observer(entry))))
    }
}
