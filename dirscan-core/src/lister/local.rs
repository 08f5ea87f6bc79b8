use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{DirectoryLister, DirectoryReader};
use crate::entry::{EntryKind, FileMetadata};

/// Real filesystem implementation backed by `tokio::fs`.
///
/// Entries are classified without following symbolic links, so a link to a
/// directory is reported as [`EntryKind::Symlink`] and never traversed.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalLister;

impl LocalLister {
    /// Local filesystem lister.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DirectoryLister for LocalLister {
    fn root_kind(&self, path: &Path) -> io::Result<EntryKind> {
        let md = std::fs::metadata(path)?;
        Ok(EntryKind::from_file_type(md.file_type()))
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Box<dyn DirectoryReader>> {
        let inner = tokio::fs::read_dir(path).await?;
        Ok(Box::new(LocalReadDir {
            dir: path.to_path_buf(),
            inner,
        }))
    }
}

struct LocalReadDir {
    dir: PathBuf,
    inner: tokio::fs::ReadDir,
}

#[async_trait]
impl DirectoryReader for LocalReadDir {
    async fn next_entry(&mut self) -> io::Result<Option<FileMetadata>> {
        loop {
            let Some(entry) = self.inner.next_entry().await? else {
                return Ok(None);
            };

            // DirEntry::metadata does not traverse symlinks
            let md = match entry.metadata().await {
                Ok(md) => md,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    debug!(
                        target: "scan::lister",
                        path = %entry.path().display(),
                        "entry vanished while listing"
                    );
                    continue;
                }
                Err(err) => return Err(err),
            };

            let meta = FileMetadata::new(
                &self.dir,
                entry.file_name(),
                EntryKind::from_file_type(md.file_type()),
            )
            .with_len(md.len())
            .with_modified(md.modified().ok());

            return Ok(Some(meta));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn drain(reader: &mut Box<dyn DirectoryReader>) -> Vec<FileMetadata> {
        let mut out = Vec::new();
        while let Some(meta) = reader.next_entry().await.unwrap() {
            out.push(meta);
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    #[tokio::test]
    async fn lists_immediate_entries_only() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("sub/deeper")).unwrap();
        std::fs::write(temp.path().join("a.txt"), b"hello").unwrap();

        let lister = LocalLister::new();
        let mut reader = lister.read_dir(temp.path()).await.unwrap();
        let entries = drain(&mut reader).await;

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name_lossy(), "a.txt");
        assert_eq!(entries[0].kind, EntryKind::File);
        assert_eq!(entries[0].len, 5);
        assert_eq!(entries[0].path, temp.path().join("a.txt"));
        assert!(entries[0].modified.is_some());
        assert_eq!(entries[1].name_lossy(), "sub");
        assert!(entries[1].is_dir());
    }

    #[tokio::test]
    async fn missing_directory_fails_to_open() {
        let temp = tempfile::tempdir().unwrap();
        let lister = LocalLister::new();
        let err = lister
            .read_dir(&temp.path().join("missing"))
            .await
            .err()
            .expect("opening a missing directory must fail");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn root_kind_classifies_paths() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("f");
        std::fs::write(&file, b"").unwrap();

        let lister = LocalLister::new();
        assert_eq!(lister.root_kind(temp.path()).unwrap(), EntryKind::Directory);
        assert_eq!(lister.root_kind(&file).unwrap(), EntryKind::File);
        assert!(lister.root_kind(&temp.path().join("nope")).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_are_not_followed() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir(temp.path().join("real")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("real"), temp.path().join("link")).unwrap();

        let lister = LocalLister::new();
        let mut reader = lister.read_dir(temp.path()).await.unwrap();
        let entries = drain(&mut reader).await;

        let link = entries.iter().find(|m| m.name_lossy() == "link").unwrap();
        assert_eq!(link.kind, EntryKind::Symlink);
    }
}
