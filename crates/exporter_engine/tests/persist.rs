use std::fs;
use std::io::Write;

use exporter_engine::{ensure_output_dir, ArchiveFile};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn commit_renames_and_replaces_existing() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("posts.zip"), "old").unwrap();

    let mut file = ArchiveFile::create_in(temp.path()).unwrap();
    file.write_all(b"new archive").unwrap();
    let path = file.commit("posts.zip").unwrap();

    assert_eq!(path, temp.path().join("posts.zip"));
    assert_eq!(fs::read(&path).unwrap(), b"new archive");
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn uncommitted_archive_leaves_nothing() {
    let temp = TempDir::new().unwrap();
    {
        let mut file = ArchiveFile::create_in(temp.path()).unwrap();
        file.write_all(b"partial").unwrap();
        assert!(file.temp_path().starts_with(temp.path()));
    }
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn file_in_place_of_directory_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    assert!(ArchiveFile::create_in(&file_path).is_err());
}
