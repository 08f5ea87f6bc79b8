//! Listing tasks: one directory per task, relayed onto the shared stream.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::recursive::{SchedulerEvent, TaskId};
use crate::error::ScanError;
use crate::lister::DirectoryLister;
use crate::stream::EntrySink;

/// What one listing produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ListingOutcome {
    pub entries: usize,
    pub subdirs: usize,
    pub failed: bool,
    pub interrupted: bool,
}

/// List `dir` and forward every entry to `sink`, calling `on_subdir` for each
/// directory entry before it is forwarded.
///
/// Failing to open the directory forwards a single error entry. A failure
/// part-way through forwards one error entry and stops; whatever was already
/// forwarded stands.
pub(crate) async fn forward_listing<F>(
    lister: &dyn DirectoryLister,
    dir: &Path,
    sink: &EntrySink,
    mut on_subdir: F,
) -> ListingOutcome
where
    F: FnMut(&Path) + Send,
{
    let mut outcome = ListingOutcome::default();
    let cancel = sink.cancellation().clone();

    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            outcome.interrupted = true;
            return outcome;
        }
        opened = lister.read_dir(dir) => opened,
    };

    let mut reader = match opened {
        Ok(reader) => reader,
        Err(err) => {
            debug!(target: "scan::task", path = %dir.display(), error = %err, "failed to open directory");
            outcome.failed = true;
            outcome.interrupted = !sink.send(Err(ScanError::io(dir, err))).await;
            return outcome;
        }
    };

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                outcome.interrupted = true;
                return outcome;
            }
            next = reader.next_entry() => next,
        };

        match next {
            Ok(Some(meta)) => {
                if meta.is_dir() {
                    outcome.subdirs += 1;
                    on_subdir(&meta.path);
                }
                if !sink.send(Ok(meta)).await {
                    outcome.interrupted = true;
                    return outcome;
                }
                outcome.entries += 1;
            }
            Ok(None) => return outcome,
            Err(err) => {
                debug!(target: "scan::task", path = %dir.display(), error = %err, "directory read failed part-way");
                outcome.failed = true;
                outcome.interrupted = !sink.send(Err(ScanError::io(dir, err))).await;
                return outcome;
            }
        }
    }
}

/// Run `body`, turning a panic into one [`ScanError::ListerPanicked`] entry.
pub(crate) async fn guarded<Fut>(dir: &Path, sink: &EntrySink, body: Fut) -> Option<Fut::Output>
where
    Fut: Future,
{
    match AssertUnwindSafe(body).catch_unwind().await {
        Ok(output) => Some(output),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(target: "scan::task", path = %dir.display(), %message, "listing task panicked");
            sink.send(Err(ScanError::ListerPanicked {
                path: dir.to_path_buf(),
                message,
            }))
            .await;
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Tells the coordinator a task is done when dropped, whichever way the task
/// ended.
struct CompletionGuard {
    id: Option<TaskId>,
    events: mpsc::UnboundedSender<SchedulerEvent>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            // Coordinator gone means nobody is waiting on this notification.
            let _ = self.events.send(SchedulerEvent::Finished(id));
        }
    }
}

/// One unit of work admitted by the coordinator.
pub(crate) struct ListingTask {
    pub id: TaskId,
    pub dir: PathBuf,
    pub lister: Arc<dyn DirectoryLister>,
    pub sink: EntrySink,
    pub events: mpsc::UnboundedSender<SchedulerEvent>,
}

impl ListingTask {
    pub(crate) async fn run(self) {
        let ListingTask {
            id,
            dir,
            lister,
            sink,
            events,
        } = self;

        let _completion = CompletionGuard {
            id: Some(id),
            events: events.clone(),
        };

        let listing = forward_listing(lister.as_ref(), &dir, &sink, |subdir| {
            let _ = events.send(SchedulerEvent::Discovered(subdir.to_path_buf()));
        });

        if let Some(outcome) = guarded(&dir, &sink, listing).await {
            debug!(
                target: "scan::task",
                path = %dir.display(),
                entries = outcome.entries,
                subdirs = outcome.subdirs,
                failed = outcome.failed,
                interrupted = outcome.interrupted,
                "directory listed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lister::InMemoryLister;
    use crate::lister::memory::Fault;
    use crate::stream::EntryStream;
    use futures::StreamExt;
    use tokio_util::sync::CancellationToken;

    fn tree() -> InMemoryLister {
        let mut fs = InMemoryLister::new();
        fs.add_file("/r/a.txt", 1);
        fs.add_dir("/r/sub");
        fs.add_file("/r/b.txt", 2);
        fs
    }

    #[tokio::test]
    async fn forwards_entries_in_lister_order_and_reports_subdirs() {
        let fs = tree();
        let cancel = CancellationToken::new();
        let (sink, stream) = EntryStream::channel(8, &cancel);
        let mut subdirs = Vec::new();

        let outcome = forward_listing(&fs, Path::new("/r"), &sink, |d| subdirs.push(d.to_path_buf())).await;
        drop(sink);

        let names: Vec<String> = stream
            .map(|e| e.unwrap().name_lossy().into_owned())
            .collect()
            .await;
        assert_eq!(names, vec!["a.txt", "sub", "b.txt"]);
        assert_eq!(subdirs, vec![PathBuf::from("/r/sub")]);
        assert_eq!(outcome.entries, 3);
        assert_eq!(outcome.subdirs, 1);
        assert!(!outcome.failed);
    }

    #[tokio::test]
    async fn open_failure_is_a_single_error_entry() {
        let mut fs = tree();
        fs.inject_fault("/r", Fault::Unreadable);
        let cancel = CancellationToken::new();
        let (sink, stream) = EntryStream::channel(8, &cancel);

        let outcome = forward_listing(&fs, Path::new("/r"), &sink, |_| panic!("no subdirs expected")).await;
        drop(sink);

        let entries: Vec<_> = stream.collect().await;
        assert_eq!(entries.len(), 1);
        assert!(matches!(entries[0], Err(ScanError::Io { .. })));
        assert!(outcome.failed);
    }

    #[tokio::test]
    async fn read_failure_forwards_one_error_after_earlier_entries() {
        let mut fs = tree();
        fs.inject_fault("/r", Fault::BrokenAfter(2));
        let cancel = CancellationToken::new();
        let (sink, stream) = EntryStream::channel(8, &cancel);
        let mut subdirs = Vec::new();

        let outcome = forward_listing(&fs, Path::new("/r"), &sink, |d| subdirs.push(d.to_path_buf())).await;
        drop(sink);

        let entries: Vec<_> = stream.collect().await;
        assert_eq!(entries.len(), 3);
        let names: Vec<String> = entries[..2]
            .iter()
            .map(|e| e.as_ref().unwrap().name_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt", "sub"]);
        assert!(matches!(&entries[2], Err(ScanError::Io { path, .. }) if path == Path::new("/r")));
        assert_eq!(subdirs, vec![PathBuf::from("/r/sub")]);
        assert_eq!(outcome.entries, 2);
        assert!(outcome.failed);
        assert!(!outcome.interrupted);
    }

    #[tokio::test]
    async fn panics_become_error_entries() {
        let mut fs = tree();
        fs.inject_fault("/r", Fault::Panic);
        let cancel = CancellationToken::new();
        let (sink, stream) = EntryStream::channel(8, &cancel);

        let result = guarded(
            Path::new("/r"),
            &sink,
            forward_listing(&fs, Path::new("/r"), &sink, |_| {}),
        )
        .await;
        drop(sink);

        assert!(result.is_none());
        let entries: Vec<_> = stream.collect().await;
        assert_eq!(entries.len(), 1);
        match &entries[0] {
            Err(ScanError::ListerPanicked { path, message }) => {
                assert_eq!(path, Path::new("/r"));
                assert!(message.contains("injected lister panic"));
            }
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[tokio::test]
    async fn completion_fires_even_when_the_task_panics() {
        let mut fs = tree();
        fs.inject_fault("/r", Fault::Panic);
        let cancel = CancellationToken::new();
        let (sink, _stream) = EntryStream::channel(8, &cancel);
        let (events, mut rx) = mpsc::unbounded_channel();

        ListingTask {
            id: TaskId(7),
            dir: PathBuf::from("/r"),
            lister: Arc::new(fs),
            sink,
            events,
        }
        .run()
        .await;

        match rx.recv().await {
            Some(SchedulerEvent::Finished(id)) => assert_eq!(id, TaskId(7)),
            other => panic!("expected completion, got {other:?}"),
        }
    }
}
