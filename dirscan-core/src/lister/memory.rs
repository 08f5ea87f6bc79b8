use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{DirectoryLister, DirectoryReader};
use crate::entry::{EntryKind, FileMetadata};

/// In-memory directory tree for tests and simulations.
///
/// Paths are treated literally; callers should use consistent absolute or
/// relative paths. Individual directories can be marked as faulty to
/// exercise error handling.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLister {
    nodes: HashMap<PathBuf, Node>,
    faults: HashMap<PathBuf, Fault>,
    latency: Option<Duration>,
    activity: Arc<ListingActivity>,
}

#[derive(Debug, Clone)]
enum Node {
    Dir { children: Vec<PathBuf> },
    File { len: u64 },
}

/// Failure injected when a directory is listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Opening the directory fails with `PermissionDenied`.
    Unreadable,
    /// Reading fails after the given number of entries were returned.
    BrokenAfter(usize),
    /// Opening the directory panics.
    Panic,
}

/// Counters describing how the lister has been driven.
#[derive(Debug, Default)]
pub struct ListingActivity {
    opened: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ListingActivity {
    /// Directories successfully opened so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Readers currently alive.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of readers that were alive at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(self: &Arc<Self>) -> ActiveReader {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ActiveReader(Arc::clone(self))
    }
}

struct ActiveReader(Arc<ListingActivity>);

impl Drop for ActiveReader {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InMemoryLister {
    /// Empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory, creating missing parents.
    pub fn add_dir<P: Into<PathBuf>>(&mut self, path: P) {
        let path = path.into();
        if self.nodes.contains_key(&path) {
            return;
        }
        self.ensure_parent_link(&path);
        self.nodes.insert(
            path,
            Node::Dir {
                children: Vec::new(),
            },
        );
    }

    /// Add a file of `len` bytes, creating missing parents.
    pub fn add_file<P: Into<PathBuf>>(&mut self, path: P, len: u64) {
        let path = path.into();
        self.ensure_parent_link(&path);
        self.nodes.insert(path, Node::File { len });
    }

    /// Mark a directory so that listing it fails in the given way.
    pub fn inject_fault<P: Into<PathBuf>>(&mut self, path: P, fault: Fault) {
        self.faults.insert(path.into(), fault);
    }

    /// Delay every open and every entry read, making listings overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Shared counters, still readable after the lister moves into a scanner.
    pub fn activity(&self) -> Arc<ListingActivity> {
        Arc::clone(&self.activity)
    }

    fn ensure_parent_link(&mut self, path: &Path) {
        if let Some(parent) = path.parent() {
            if parent.as_os_str().is_empty() {
                return;
            }
            // Ensure parent directory exists
            if !self.nodes.contains_key(parent) {
                self.nodes.insert(
                    parent.to_path_buf(),
                    Node::Dir {
                        children: Vec::new(),
                    },
                );
                self.ensure_parent_link(parent);
            }
            if let Some(Node::Dir { children }) = self.nodes.get_mut(parent)
                && !children.iter().any(|p| p.as_path() == path)
            {
                children.push(path.to_path_buf());
            }
        }
    }

    fn describe(&self, path: &Path) -> Option<FileMetadata> {
        let name = path.file_name()?;
        let parent = path.parent().unwrap_or_else(|| Path::new(""));
        match self.nodes.get(path)? {
            Node::Dir { .. } => Some(FileMetadata::new(parent, name, EntryKind::Directory)),
            Node::File { len } => {
                Some(FileMetadata::new(parent, name, EntryKind::File).with_len(*len))
            }
        }
    }
}

#[async_trait]
impl DirectoryLister for InMemoryLister {
    fn root_kind(&self, path: &Path) -> io::Result<EntryKind> {
        match self.nodes.get(path) {
            Some(Node::Dir { .. }) => Ok(EntryKind::Directory),
            Some(Node::File { .. }) => Ok(EntryKind::File),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such path: {}", path.display()),
            )),
        }
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Box<dyn DirectoryReader>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let fault = self.faults.get(path).copied();
        match fault {
            Some(Fault::Unreadable) => {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    format!("permission denied: {}", path.display()),
                ));
            }
            Some(Fault::Panic) => panic!("injected lister panic for {}", path.display()),
            _ => {}
        }

        match self.nodes.get(path) {
            Some(Node::Dir { children }) => {
                let queue = children
                    .iter()
                    .filter_map(|child| self.describe(child))
                    .collect::<VecDeque<_>>();
                Ok(Box::new(InMemReadDir {
                    queue,
                    remaining_before_fault: match fault {
                        Some(Fault::BrokenAfter(n)) => Some(n),
                        _ => None,
                    },
                    latency: self.latency,
                    _active: self.activity.enter(),
                }))
            }
            Some(Node::File { .. }) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("read_dir on file: {}", path.display()),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("read_dir on missing path: {}", path.display()),
            )),
        }
    }
}

struct InMemReadDir {
    queue: VecDeque<FileMetadata>,
    remaining_before_fault: Option<usize>,
    latency: Option<Duration>,
    _active: ActiveReader,
}

#[async_trait]
impl DirectoryReader for InMemReadDir {
    async fn next_entry(&mut self) -> io::Result<Option<FileMetadata>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(remaining) = self.remaining_before_fault.as_mut() {
            if *remaining == 0 {
                return Err(io::Error::other("injected read failure"));
            }
            *remaining -= 1;
        }
        Ok(self.queue.pop_front())
    }
}
