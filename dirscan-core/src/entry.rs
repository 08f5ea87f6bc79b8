use std::borrow::Cow;
use std::ffi::OsString;
use std::fmt;
use std::fs::FileType;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::ScanError;

/// One traversal result: metadata for a file or directory, or the error that
/// prevented a directory from being listed.
pub type Entry = std::result::Result<FileMetadata, ScanError>;

/// What an entry is, as reported by the listing (links are not resolved).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory; recursive scans descend into it.
    Directory,
    /// Symbolic link; never followed.
    Symlink,
    /// Sockets, FIFOs, devices.
    Other,
}

impl EntryKind {
    /// Classify without following symbolic links.
    pub fn from_file_type(file_type: FileType) -> Self {
        if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }

    /// Short label used in listings.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "dir",
            EntryKind::Symlink => "link",
            EntryKind::Other => "other",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lightweight `stat`-like information about a directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Final path component.
    pub name: OsString,
    /// Full path (parent directory joined with `name`).
    pub path: PathBuf,
    /// Entry type; links are not followed.
    pub kind: EntryKind,
    /// Size in bytes as reported by the filesystem.
    pub len: u64,
    /// Last modified time if available
    pub modified: Option<SystemTime>,
}

impl FileMetadata {
    /// Metadata for `name` inside `parent`, with no size or time yet.
    pub fn new(parent: &Path, name: impl Into<OsString>, kind: EntryKind) -> Self {
        let name = name.into();
        Self {
            path: parent.join(&name),
            name,
            kind,
            len: 0,
            modified: None,
        }
    }

    /// Set the size in bytes.
    pub fn with_len(mut self, len: u64) -> Self {
        self.len = len;
        self
    }

    /// Set the modification time.
    pub fn with_modified(mut self, modified: Option<SystemTime>) -> Self {
        self.modified = modified;
        self
    }

    /// True for [`EntryKind::Directory`].
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// True for [`EntryKind::File`].
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// File name with invalid UTF-8 replaced.
    pub fn name_lossy(&self) -> Cow<'_, str> {
        self.name.to_string_lossy()
    }

    /// Extension of the file name, without the dot.
    pub fn extension(&self) -> Option<&std::ffi::OsStr> {
        Path::new(&self.name).extension()
    }
}
