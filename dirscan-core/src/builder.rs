//! Fluent composition of scanners.
//!
//! ```no_run
//! use dirscan_core::{ScanBuilder, Scanner};
//! use futures::StreamExt;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> dirscan_core::Result<()> {
//! let scanner = ScanBuilder::new()
//!     .recursive()
//!     .files()
//!     .extensions(["jpg", "png"])
//!     .root("/srv/photos")
//!     .workers(8)
//!     .build()?;
//!
//! let mut entries = scanner.scan(CancellationToken::new())?;
//! while let Some(entry) = entries.next().await {
//!     match entry {
//!         Ok(meta) => println!("{}", meta.path.display()),
//!         Err(err) => eprintln!("{err}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::filter::{self, Directories, Extension, Filter, FilterScanner, NamePattern, RegularFiles};
use crate::limit::LimitScanner;
use crate::lister::{DirectoryLister, LocalLister, validate_roots};
use crate::scan::{FlatScanner, MultiScanner, RecursiveScanner};
use crate::scanner::{ScanOptions, Scanner};
use crate::trace::TraceScanner;

/// Which entry kinds reach the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Every entry.
    #[default]
    All,
    /// Regular files only.
    Files,
    /// Directories only.
    Directories,
}

/// Whether subdirectories are descended into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Depth {
    /// Immediate entries of each root.
    #[default]
    Flat,
    /// The whole tree under each root.
    Recursive,
}

/// Collects scan settings and assembles the matching scanner stack.
///
/// Defaults: every entry kind, flat, no roots, one worker per CPU and a
/// 64-entry buffer.
pub struct ScanBuilder {
    mode: Mode,
    depth: Depth,
    roots: Vec<PathBuf>,
    filters: Vec<Box<dyn Filter>>,
    pattern: Option<String>,
    limit: Option<usize>,
    options: ScanOptions,
    trace: bool,
    lister: Arc<dyn DirectoryLister>,
}

impl Default for ScanBuilder {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            depth: Depth::default(),
            roots: Vec::new(),
            filters: Vec::new(),
            pattern: None,
            limit: None,
            options: ScanOptions::default(),
            trace: false,
            lister: Arc::new(LocalLister::new()),
        }
    }
}

impl fmt::Debug for ScanBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filters: Vec<String> = self.filters.iter().map(|f| f.name()).collect();
        f.debug_struct("ScanBuilder")
            .field("mode", &self.mode)
            .field("depth", &self.depth)
            .field("roots", &self.roots)
            .field("filters", &filters)
            .field("pattern", &self.pattern)
            .field("limit", &self.limit)
            .field("options", &self.options)
            .field("trace", &self.trace)
            .finish_non_exhaustive()
    }
}

impl ScanBuilder {
    /// Builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report regular files only.
    pub fn files(mut self) -> Self {
        self.mode = Mode::Files;
        self
    }

    /// Report directories only.
    pub fn directories(mut self) -> Self {
        self.mode = Mode::Directories;
        self
    }

    /// Report every entry kind.
    pub fn all(mut self) -> Self {
        self.mode = Mode::All;
        self
    }

    /// Entry kinds to report.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// List the roots without descending.
    pub fn flat(mut self) -> Self {
        self.depth = Depth::Flat;
        self
    }

    /// Walk the full tree under every root.
    pub fn recursive(mut self) -> Self {
        self.depth = Depth::Recursive;
        self
    }

    /// Flat or recursive walk.
    pub fn depth(mut self, depth: Depth) -> Self {
        self.depth = depth;
        self
    }

    /// Add one root.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Add several roots. Duplicates are removed at build time.
    pub fn roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.roots.extend(roots.into_iter().map(Into::into));
        self
    }

    /// Add a filter; every added filter must match.
    pub fn matching(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Keep entries with one of these extensions.
    pub fn extensions<I, S>(self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.matching(Extension::new(extensions))
    }

    /// File-name regular expression, compiled by [`build`](Self::build).
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Stop after `limit` entries.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Maximum directories listed at once (recursive scans).
    pub fn workers(mut self, workers: usize) -> Self {
        self.options.workers = workers;
        self
    }

    /// Capacity of the output queue.
    pub fn buffer(mut self, buffer: usize) -> Self {
        self.options.buffer = buffer;
        self
    }

    /// Log every entry at debug level as it passes.
    pub fn trace(mut self) -> Self {
        self.trace = true;
        self
    }

    /// Listing backend; defaults to the local filesystem.
    pub fn lister(mut self, lister: Arc<dyn DirectoryLister>) -> Self {
        self.lister = lister;
        self
    }

    /// Validate settings and roots, then assemble the scanner.
    pub fn build(self) -> Result<Box<dyn Scanner>> {
        self.options.validate()?;

        let ScanBuilder {
            mode,
            depth,
            roots,
            mut filters,
            pattern,
            limit,
            options,
            trace,
            lister,
        } = self;

        let mut scanner = Self::build_listing(depth, roots, options, lister)?;

        match mode {
            Mode::All => {}
            Mode::Files => filters.insert(0, Box::new(RegularFiles)),
            Mode::Directories => filters.insert(0, Box::new(Directories)),
        }
        if let Some(pattern) = pattern {
            filters.push(Box::new(NamePattern::new(&pattern)?));
        }

        scanner = match filters.len() {
            0 => scanner,
            1 => {
                let only = filters.remove(0);
                Box::new(FilterScanner::new(scanner, only))
            }
            _ => Box::new(FilterScanner::new(scanner, filter::and(filters))),
        };

        if trace {
            scanner = Box::new(TraceScanner::new(scanner));
        }
        if let Some(limit) = limit {
            scanner = Box::new(LimitScanner::new(scanner, limit));
        }

        debug!(target: "scan::builder", ?mode, ?depth, ?limit, "scanner built");
        Ok(scanner)
    }

    fn build_listing(
        depth: Depth,
        roots: Vec<PathBuf>,
        options: ScanOptions,
        lister: Arc<dyn DirectoryLister>,
    ) -> Result<Box<dyn Scanner>> {
        if depth == Depth::Recursive {
            return Ok(Box::new(RecursiveScanner::with_lister(lister, roots, options)?));
        }

        let mut roots = validate_roots(lister.as_ref(), roots)?;
        match roots.len() {
            0 => Ok(Box::new(
                FlatScanner::with_lister(lister, None)?.with_buffer(options.buffer)?,
            )),
            1 => Ok(Box::new(
                FlatScanner::with_lister(lister, roots.pop())?.with_buffer(options.buffer)?,
            )),
            _ => {
                let mut multi = MultiScanner::default();
                for root in roots {
                    multi.push(
                        FlatScanner::with_lister(Arc::clone(&lister), Some(root))?
                            .with_buffer(options.buffer)?,
                    );
                }
                Ok(Box::new(multi))
            }
        }
    }
}
