use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use dirscan_core::{Entry, EntryKind, RecursiveScanner, ScanBuilder, ScanOptions, Scanner};
use dirscan_core::lister::LocalLister;
use futures::StreamExt;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

async fn scan_all(scanner: &dyn Scanner) -> Vec<Entry> {
    scanner
        .scan(CancellationToken::new())
        .expect("scan should start")
        .collect()
        .await
}

fn count_kind(entries: &[Entry], kind: EntryKind) -> usize {
    entries
        .iter()
        .filter_map(|e| e.as_ref().ok())
        .filter(|m| m.kind == kind)
        .count()
}

fn recursive(roots: &[&Path], workers: usize) -> RecursiveScanner {
    RecursiveScanner::with_lister(
        Arc::new(LocalLister::new()),
        roots.iter().copied(),
        ScanOptions::default().with_workers(workers),
    )
    .expect("valid roots")
}

fn touch(path: PathBuf) {
    fs::write(path, b"x").unwrap();
}

/// Three top-level directories with three files each, one of them holding a
/// nested directory with three more files, plus one top-level file.
fn nested_tree() -> TempDir {
    let temp = tempfile::tempdir().unwrap();
    for dir in ["level-0-directory-1", "level-0-directory-2", "level-0-directory-3"] {
        let dir = temp.path().join(dir);
        fs::create_dir(&dir).unwrap();
        for i in 1..=3 {
            touch(dir.join(format!("level-1-file-{i}.jpg")));
        }
    }
    let nested = temp.path().join("level-0-directory-1/level-1-directory-1");
    fs::create_dir(&nested).unwrap();
    for i in 1..=3 {
        touch(nested.join(format!("level-2-file-{i}.jpg")));
    }
    touch(temp.path().join("level-0-file-1.jpg"));
    temp
}

#[tokio::test]
async fn flat_directory_with_files_and_empty_directories() {
    let temp = tempfile::tempdir().unwrap();
    for i in 1..=3 {
        fs::create_dir(temp.path().join(format!("level-0-directory-{i}"))).unwrap();
        touch(temp.path().join(format!("level-0-file-{i}.jpg")));
    }

    let entries = scan_all(&recursive(&[temp.path()], 2)).await;

    assert_eq!(entries.len(), 6);
    assert_eq!(count_kind(&entries, EntryKind::Directory), 3);
    assert_eq!(count_kind(&entries, EntryKind::File), 3);
}

#[tokio::test]
async fn nested_tree_counts_match_construction() {
    let temp = nested_tree();

    for workers in [1, 2, 4, 16] {
        let entries = scan_all(&recursive(&[temp.path()], workers)).await;

        assert_eq!(count_kind(&entries, EntryKind::Directory), 4, "workers = {workers}");
        assert_eq!(count_kind(&entries, EntryKind::File), 13, "workers = {workers}");
        assert_eq!(entries.len(), 17);

        let unique: HashSet<_> = entries
            .iter()
            .map(|e| e.as_ref().unwrap().path.clone())
            .collect();
        assert_eq!(unique.len(), entries.len(), "duplicate entries emitted");
    }
}

#[tokio::test]
async fn deep_chain_is_reached_with_two_workers() {
    let temp = tempfile::tempdir().unwrap();
    let mut dir = temp.path().to_path_buf();
    for level in 0..5 {
        dir = dir.join(format!("level-{level}"));
        fs::create_dir(&dir).unwrap();
    }
    touch(dir.join("leaf.txt"));

    let entries = scan_all(&recursive(&[temp.path()], 2)).await;

    assert_eq!(entries.len(), 6);
    assert!(
        entries
            .iter()
            .any(|e| e.as_ref().unwrap().path == dir.join("leaf.txt"))
    );
}

#[tokio::test]
async fn duplicated_roots_give_identical_output() {
    let temp = nested_tree();
    let root = temp.path();

    let mut baseline: Vec<PathBuf> = scan_all(&recursive(&[root], 3))
        .await
        .into_iter()
        .map(|e| e.unwrap().path)
        .collect();
    baseline.sort();

    for roots in [vec![root, root], vec![root, root, root]] {
        let mut paths: Vec<PathBuf> = scan_all(&recursive(&roots, 3))
            .await
            .into_iter()
            .map(|e| e.unwrap().path)
            .collect();
        paths.sort();
        assert_eq!(paths, baseline);
    }
}

#[tokio::test]
async fn empty_directory_duplicated_yields_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let entries = scan_all(&recursive(&[temp.path(), temp.path(), temp.path()], 2)).await;
    assert!(entries.is_empty());
}

#[tokio::test]
async fn no_roots_yields_nothing() {
    let entries = scan_all(&recursive(&[], 2)).await;
    assert!(entries.is_empty());
}

#[test]
fn missing_root_is_a_construction_error() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("this/directory/does/not/exist");
    assert!(RecursiveScanner::new([missing]).is_err());
}

#[test]
fn file_root_is_a_construction_error() {
    let temp = tempfile::tempdir().unwrap();
    let file = temp.path().join("plain.txt");
    touch(file.clone());
    assert!(RecursiveScanner::new([file]).is_err());
}

#[cfg(unix)]
#[tokio::test]
async fn unreadable_subdirectory_is_reported_once() {
    use std::os::unix::fs::PermissionsExt;

    let temp = nested_tree();
    let locked = temp.path().join("level-0-directory-2");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users read through mode bits; nothing to observe then.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let entries = scan_all(&recursive(&[temp.path()], 2)).await;
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let errors: Vec<_> = entries.iter().filter_map(|e| e.as_ref().err()).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path(), Some(locked.as_path()));
    // the locked directory's own three files are missing, siblings are complete
    assert_eq!(count_kind(&entries, EntryKind::File), 10);
    assert_eq!(count_kind(&entries, EntryKind::Directory), 4);
}

#[tokio::test]
async fn builder_narrows_a_real_tree() {
    let temp = nested_tree();
    let scanner = ScanBuilder::new()
        .recursive()
        .files()
        .pattern("^level-2-")
        .root(temp.path())
        .workers(2)
        .build()
        .unwrap();

    let entries = scan_all(scanner.as_ref()).await;
    assert_eq!(entries.len(), 3);
}

#[tokio::test]
async fn cancelled_scan_ends_cleanly() {
    let temp = tempfile::tempdir().unwrap();
    for i in 0..40 {
        let dir = temp.path().join(format!("d{i}"));
        fs::create_dir(&dir).unwrap();
        for j in 0..5 {
            touch(dir.join(format!("f{j}")));
        }
    }

    let cancel = CancellationToken::new();
    cancel.cancel();
    let entries: Vec<Entry> = recursive(&[temp.path()], 2)
        .scan(cancel)
        .unwrap()
        .collect()
        .await;

    // every listing observes the cancelled token before reading
    assert!(entries.is_empty(), "got {} entries", entries.len());
}
