//! Integration tests for disk-backed media files.

use std::io::{Read, Write};

use broll_core::{CoreError, MediaFile, MediaSource};

#[test]
fn media_file_tests_reads_name_size_and_bytes_from_disk() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("talking-head.mp4");
    let mut file = std::fs::File::create(&path).expect("fixture file should be created");
    file.write_all(b"0123456789").expect("fixture should be written");

    let media = MediaFile::from_path(&path).expect("media file should load");
    assert_eq!(media.name(), "talking-head.mp4");
    assert_eq!(media.size(), 10);
    assert!(matches!(media.source(), MediaSource::Path(_)));

    let mut bytes = Vec::new();
    media
        .open()
        .expect("media should open")
        .read_to_end(&mut bytes)
        .expect("media should be readable");
    assert_eq!(bytes, b"0123456789");
}

#[test]
fn media_file_tests_rejects_directories_and_missing_paths() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    assert!(matches!(
        MediaFile::from_path(dir.path()),
        Err(CoreError::NotAFile(_))
    ));
    assert!(matches!(
        MediaFile::from_path(dir.path().join("missing.mp4")),
        Err(CoreError::Io { .. })
    ));
}
