//! Predicate filtering of scan results.
//!
//! Filters only look at metadata. Error entries always pass through a
//! [`FilterScanner`] so a narrowed scan still reports unreadable directories.

use std::fmt;
use std::sync::Arc;

use futures::future;
use futures::stream::StreamExt;
use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::entry::FileMetadata;
use crate::error::{Result, ScanError};
use crate::scanner::Scanner;
use crate::stream::EntryStream;

/// Predicate over entry metadata.
pub trait Filter: Send + Sync {
    /// Whether the entry is kept.
    fn matches(&self, meta: &FileMetadata) -> bool;

    /// Label used in logs and debug output.
    fn name(&self) -> String {
        "filter".to_string()
    }
}

impl<T: Filter + ?Sized> Filter for Box<T> {
    fn matches(&self, meta: &FileMetadata) -> bool {
        (**self).matches(meta)
    }

    fn name(&self) -> String {
        (**self).name()
    }
}

impl<T: Filter + ?Sized> Filter for Arc<T> {
    fn matches(&self, meta: &FileMetadata) -> bool {
        (**self).matches(meta)
    }

    fn name(&self) -> String {
        (**self).name()
    }
}

/// Regular files only.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegularFiles;

impl Filter for RegularFiles {
    fn matches(&self, meta: &FileMetadata) -> bool {
        meta.is_file()
    }

    fn name(&self) -> String {
        "regular-files".to_string()
    }
}

/// Directories only.
#[derive(Debug, Clone, Copy, Default)]
pub struct Directories;

impl Filter for Directories {
    fn matches(&self, meta: &FileMetadata) -> bool {
        meta.is_dir()
    }

    fn name(&self) -> String {
        "directories".to_string()
    }
}

/// Entries whose extension is one of a set, compared case-insensitively.
/// Extensions may be given with or without the leading dot.
#[derive(Debug, Clone)]
pub struct Extension {
    extensions: Vec<String>,
}

impl Extension {
    /// Accept any of `extensions`.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { extensions }
    }
}

impl Filter for Extension {
    fn matches(&self, meta: &FileMetadata) -> bool {
        meta.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.extensions
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    fn name(&self) -> String {
        format!("extension({})", self.extensions.join(","))
    }
}

/// Entries whose file name matches a regular expression.
#[derive(Debug, Clone)]
pub struct NamePattern {
    regex: Regex,
}

impl NamePattern {
    /// Compile `pattern`; an invalid expression is [`ScanError::InvalidConfig`].
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|err| ScanError::InvalidConfig(format!("invalid name pattern: {err}")))?;
        Ok(Self { regex })
    }

    /// Use an already compiled expression.
    pub fn from_regex(regex: Regex) -> Self {
        Self { regex }
    }
}

impl Filter for NamePattern {
    fn matches(&self, meta: &FileMetadata) -> bool {
        self.regex.is_match(&meta.name_lossy())
    }

    fn name(&self) -> String {
        format!("pattern({})", self.regex.as_str())
    }
}

/// Matches when every inner filter matches; an empty set matches everything.
pub struct All(Vec<Box<dyn Filter>>);

impl Filter for All {
    fn matches(&self, meta: &FileMetadata) -> bool {
        self.0.iter().all(|f| f.matches(meta))
    }

    fn name(&self) -> String {
        join_names("and", &self.0)
    }
}

/// Matches when any inner filter matches; an empty set matches everything.
pub struct Any(Vec<Box<dyn Filter>>);

impl Filter for Any {
    fn matches(&self, meta: &FileMetadata) -> bool {
        self.0.is_empty() || self.0.iter().any(|f| f.matches(meta))
    }

    fn name(&self) -> String {
        join_names("or", &self.0)
    }
}

/// Inverts a filter.
pub struct Not(Box<dyn Filter>);

impl Filter for Not {
    fn matches(&self, meta: &FileMetadata) -> bool {
        !self.0.matches(meta)
    }

    fn name(&self) -> String {
        format!("not({})", self.0.name())
    }
}

/// Wraps a filter under a different label.
pub struct Named {
    name: String,
    inner: Box<dyn Filter>,
}

impl Filter for Named {
    fn matches(&self, meta: &FileMetadata) -> bool {
        self.inner.matches(meta)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Adapts a closure.
pub struct FnFilter<F> {
    name: String,
    f: F,
}

impl<F> Filter for FnFilter<F>
where
    F: Fn(&FileMetadata) -> bool + Send + Sync,
{
    fn matches(&self, meta: &FileMetadata) -> bool {
        (self.f)(meta)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// All of `filters` must match.
pub fn and(filters: Vec<Box<dyn Filter>>) -> All {
    All(filters)
}

/// At least one of `filters` must match.
pub fn or(filters: Vec<Box<dyn Filter>>) -> Any {
    Any(filters)
}

/// Negate `filter`.
pub fn not(filter: impl Filter + 'static) -> Not {
    Not(Box::new(filter))
}

/// Relabel `filter` for logs.
pub fn named(filter: impl Filter + 'static, name: impl Into<String>) -> Named {
    Named {
        name: name.into(),
        inner: Box::new(filter),
    }
}

/// Filter from a closure.
pub fn filter_fn<F>(name: impl Into<String>, f: F) -> FnFilter<F>
where
    F: Fn(&FileMetadata) -> bool + Send + Sync,
{
    FnFilter {
        name: name.into(),
        f,
    }
}

macro_rules! debug_by_name {
    ($($ty:ty),* $(,)?) => {
        $(
            impl fmt::Debug for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.name())
                }
            }
        )*
    };
}

debug_by_name!(All, Any, Not, Named);

impl<F> fmt::Debug for FnFilter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFilter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn join_names(op: &str, filters: &[Box<dyn Filter>]) -> String {
    let names: Vec<String> = filters.iter().map(|f| f.name()).collect();
    format!("{op}({})", names.join(", "))
}

/// Drops metadata entries the filter rejects.
pub struct FilterScanner {
    inner: Box<dyn Scanner>,
    filter: Arc<dyn Filter>,
}

impl FilterScanner {
    /// Filter the entries of `inner`.
    pub fn new(inner: impl Scanner + 'static, filter: impl Filter + 'static) -> Self {
        Self {
            inner: Box::new(inner),
            filter: Arc::new(filter),
        }
    }

    /// Keep regular files only.
    pub fn regular_files(inner: impl Scanner + 'static) -> Self {
        Self::new(inner, RegularFiles)
    }

    /// Keep directories only.
    pub fn directories(inner: impl Scanner + 'static) -> Self {
        Self::new(inner, Directories)
    }
}

impl fmt::Debug for FilterScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterScanner")
            .field("inner", &self.inner)
            .field("filter", &self.filter.name())
            .finish()
    }
}

impl Scanner for FilterScanner {
    fn scan(&self, cancel: CancellationToken) -> Result<EntryStream> {
        let filter = Arc::clone(&self.filter);
        let stream = self.inner.scan(cancel)?;
        Ok(stream.map_inner(move |inner| {
            inner.filter(move |entry| {
                future::ready(match entry {
                    Ok(meta) => filter.matches(meta),
                    Err(_) => true,
                })
            })
        }))
    }
}
