use std::io::{self, Write};

use chrono::{DateTime, Local};
use dirscan_core::{EntryKind, FileMetadata};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Default)]
pub struct Summary {
    pub files: u64,
    pub directories: u64,
    pub other: u64,
    pub errors: u64,
}

impl Summary {
    pub fn record(&mut self, meta: &FileMetadata) {
        match meta.kind {
            EntryKind::File => self.files += 1,
            EntryKind::Directory => self.directories += 1,
            EntryKind::Symlink | EntryKind::Other => self.other += 1,
        }
    }
}

/// One line per entry: the bare path, or `kind size modified path` in long form.
pub fn write_entry(out: &mut impl Write, meta: &FileMetadata, long: bool) -> io::Result<()> {
    if !long {
        return writeln!(out, "{}", meta.path.display());
    }

    let modified = meta
        .modified
        .map(|time| DateTime::<Local>::from(time).format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string());
    writeln!(
        out,
        "{:<5} {:>12} {:>16} {}",
        meta.kind.as_str(),
        meta.len,
        modified,
        meta.path.display()
    )
}
