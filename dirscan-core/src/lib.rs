//! # dirscan core
//!
//! Enumerates directory trees as a continuous, lazily produced stream of
//! entries (files, subdirectories, per-directory errors) without reading the
//! whole tree into memory first.
//!
//! ## Architecture
//!
//! - [`scan::RecursiveScanner`]: bounded-concurrency tree walk. One
//!   coordinator task owns the pending queue and the set of directories being
//!   listed; up to `workers` listing tasks run at once and report discovered
//!   subdirectories back through the coordinator's mailbox.
//! - [`lister`]: non-recursive directory listing ([`lister::LocalLister`] on
//!   `tokio::fs`, [`lister::InMemoryLister`] for tests).
//! - [`stream::EntryStream`]: bounded hand-off queue shared by every scanner.
//!   Producers wait when it is full; nothing is dropped.
//! - [`filter`], [`limit`], [`trace`]: stream decorators.
//! - [`builder::ScanBuilder`]: fluent composition of the above.
//!
//! Construction-time problems (missing roots, zero workers) are returned
//! synchronously as [`ScanError`]. Failures to read one directory are
//! delivered in-band as `Err` entries and never stop the traversal.

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Fluent scanner composition
pub mod builder;

/// Entry and metadata types
pub mod entry;

/// Error types and error handling utilities
pub mod error;

/// Predicate filters and the filtering scanner
pub mod filter;

/// Result-count truncation
pub mod limit;

/// Single-directory listing backends
pub mod lister;

/// Flat, merged and recursive scanners
pub mod scan;

/// The scanner trait and shared tuning
pub mod scanner;

/// Bounded entry stream
pub mod stream;

/// Diagnostic side-channel
pub mod trace;

pub use builder::{Depth, Mode, ScanBuilder};
pub use entry::{Entry, EntryKind, FileMetadata};
pub use error::{Result, ScanError};
pub use scan::{FlatScanner, MultiScanner, RecursiveScanner};
pub use scanner::{DEFAULT_BUFFER, ScanOptions, Scanner, default_workers};
pub use stream::{EntrySink, EntryStream};
