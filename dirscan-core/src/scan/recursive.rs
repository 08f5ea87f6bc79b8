//! Bounded-concurrency recursive traversal.
//!
//! A single coordinator task owns the pending queue and the in-flight set.
//! Listing tasks never touch either; they talk to the coordinator through
//! [`SchedulerEvent`]s on its mailbox. Completion is detected only when a
//! task finishes and leaves both structures empty.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::task::ListingTask;
use crate::error::Result;
use crate::lister::{DirectoryLister, LocalLister, validate_roots};
use crate::scanner::{ScanOptions, Scanner};
use crate::stream::{EntrySink, EntryStream};

/// Messages accepted by the coordinator.
#[derive(Debug)]
pub(crate) enum SchedulerEvent {
    /// A listing task found a subdirectory.
    Discovered(PathBuf),
    /// A listing task is done, successfully or not.
    Finished(TaskId),
}

/// Identifies one admitted listing. Overlapping roots can put the same
/// directory in flight twice, so paths cannot key the in-flight set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TaskId(pub u64);

/// Walks every directory reachable from its roots, listing up to
/// `options.workers` directories at a time, and merges all entries into one
/// stream. Each directory appears once as an entry of its parent.
pub struct RecursiveScanner {
    roots: Vec<PathBuf>,
    options: ScanOptions,
    lister: Arc<dyn DirectoryLister>,
}

impl fmt::Debug for RecursiveScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecursiveScanner")
            .field("roots", &self.roots)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl RecursiveScanner {
    /// Scan the local filesystem with default options.
    pub fn new<I, P>(roots: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::with_lister(Arc::new(LocalLister::new()), roots, ScanOptions::default())
    }

    /// Validate options and roots up front; nothing is listed until [`scan`].
    ///
    /// [`scan`]: Scanner::scan
    pub fn with_lister<I, P>(
        lister: Arc<dyn DirectoryLister>,
        roots: I,
        options: ScanOptions,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        options.validate()?;
        let roots = validate_roots(lister.as_ref(), roots)?;
        Ok(Self {
            roots,
            options,
            lister,
        })
    }

    /// Validated, deduplicated roots.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Worker cap and buffer in effect.
    pub fn options(&self) -> ScanOptions {
        self.options
    }
}

impl Scanner for RecursiveScanner {
    fn scan(&self, cancel: CancellationToken) -> Result<EntryStream> {
        let (sink, stream) = EntryStream::channel(self.options.buffer, &cancel);
        if self.roots.is_empty() {
            return Ok(stream);
        }

        let coordinator = Coordinator::new(Arc::clone(&self.lister), sink, self.options.workers);
        tokio::spawn(coordinator.run(self.roots.clone()));
        Ok(stream)
    }
}

/// How a traversal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Termination {
    Completed,
    Cancelled,
}

struct Coordinator {
    lister: Arc<dyn DirectoryLister>,
    sink: EntrySink,
    workers: usize,
    pending: VecDeque<PathBuf>,
    in_flight: HashMap<TaskId, PathBuf>,
    next_id: u64,
    events_tx: mpsc::UnboundedSender<SchedulerEvent>,
    events_rx: mpsc::UnboundedReceiver<SchedulerEvent>,
    admitted: usize,
    peak_in_flight: usize,
}

impl Coordinator {
    fn new(lister: Arc<dyn DirectoryLister>, sink: EntrySink, workers: usize) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            lister,
            sink,
            workers,
            pending: VecDeque::new(),
            in_flight: HashMap::new(),
            next_id: 0,
            events_tx,
            events_rx,
            admitted: 0,
            peak_in_flight: 0,
        }
    }

    async fn run(mut self, roots: Vec<PathBuf>) -> Termination {
        let started = Instant::now();
        let cancel = self.sink.cancellation().clone();
        info!(
            target: "scan::scheduler",
            roots = roots.len(),
            workers = self.workers,
            "recursive scan started"
        );

        for root in roots {
            self.schedule(root);
        }

        let termination = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Termination::Cancelled,
                Some(event) = self.events_rx.recv() => match event {
                    SchedulerEvent::Discovered(dir) => self.schedule(dir),
                    SchedulerEvent::Finished(id) => {
                        if self.finish(id) {
                            break Termination::Completed;
                        }
                    }
                },
            }
        };

        if termination == Termination::Cancelled {
            self.drain().await;
        }

        info!(
            target: "scan::scheduler",
            outcome = ?termination,
            directories = self.admitted,
            peak_in_flight = self.peak_in_flight,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "recursive scan finished"
        );

        // Every admitted task has reported back, so dropping the last sink
        // held here is what closes the stream.
        termination
    }

    fn schedule(&mut self, dir: PathBuf) {
        if self.in_flight.len() < self.workers {
            self.admit(dir);
        } else {
            self.pending.push_back(dir);
        }
    }

    /// Returns true when the traversal is complete.
    fn finish(&mut self, id: TaskId) -> bool {
        if let Some(dir) = self.in_flight.remove(&id) {
            debug!(target: "scan::scheduler", path = %dir.display(), "listing finished");
        }

        if let Some(next) = self.pending.pop_front() {
            self.admit(next);
            return false;
        }

        self.in_flight.is_empty()
    }

    fn admit(&mut self, dir: PathBuf) {
        debug!(target: "scan::scheduler", path = %dir.display(), in_flight = self.in_flight.len(), "admitting directory");
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.in_flight.insert(id, dir.clone());
        self.admitted += 1;
        self.peak_in_flight = self.peak_in_flight.max(self.in_flight.len());

        let task = ListingTask {
            id,
            dir,
            lister: Arc::clone(&self.lister),
            sink: self.sink.clone(),
            events: self.events_tx.clone(),
        };
        tokio::spawn(task.run());
    }

    /// Wait for every admitted task to report back after cancellation.
    async fn drain(&mut self) {
        let abandoned = self.pending.len();
        self.pending.clear();
        debug!(
            target: "scan::scheduler",
            in_flight = self.in_flight.len(),
            abandoned,
            "scan cancelled, waiting for in-flight listings"
        );

        while !self.in_flight.is_empty() {
            match self.events_rx.recv().await {
                Some(SchedulerEvent::Finished(id)) => {
                    self.in_flight.remove(&id);
                }
                Some(SchedulerEvent::Discovered(_)) => {}
                None => break,
            }
        }
    }
}
