use std::fs;

use neurolearn_engine::{
    ensure_cache_dir, AudioRecorder, CacheDir, ClipFileRecorder, PersistError, RecorderError,
};
use tempfile::TempDir;

#[test]
fn creates_missing_cache_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("nested").join("cache");
    assert!(!new_dir.exists());
    ensure_cache_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
    ensure_cache_dir(&new_dir).unwrap();
}

#[test]
fn entries_are_replaced_whole() {
    let temp = TempDir::new().unwrap();
    let dir = CacheDir::new(temp.path().to_path_buf());

    let first = dir.write("entry.json", "\"hello\"").unwrap();
    assert_eq!(first, dir.path_of("entry.json"));
    assert_eq!(dir.read("entry.json").unwrap().as_deref(), Some("\"hello\""));

    let second = dir.write("entry.json", "\"world\"").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "\"world\"");

    let leftovers = fs::read_dir(dir.root()).unwrap().count();
    assert_eq!(leftovers, 1);
}

#[test]
fn missing_entries_read_as_none_and_remove_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let dir = CacheDir::new(temp.path().to_path_buf());

    assert_eq!(dir.read("absent.json").unwrap(), None);
    dir.write("present.json", "1").unwrap();
    assert!(dir.remove("present.json").unwrap());
    assert!(!dir.remove("present.json").unwrap());
    assert_eq!(dir.read("present.json").unwrap(), None);
}

#[test]
fn no_partial_entry_when_root_is_a_file() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let dir = CacheDir::new(file_path.clone());
    let err = dir.write("entry.json", "data").unwrap_err();
    assert!(matches!(err, PersistError::NotADirectory { .. }));
    assert!(!file_path.with_file_name("entry.json").exists());
}

#[test]
fn recorder_allows_one_recording_at_a_time() {
    let temp = TempDir::new().unwrap();
    let clip = temp.path().join("take1.wav");
    fs::write(&clip, b"RIFF").unwrap();

    let recorder = ClipFileRecorder::new();
    assert!(matches!(recorder.start(), Err(RecorderError::NoInput)));

    recorder.arm(&clip);
    recorder.start().unwrap();
    assert!(recorder.is_recording());
    assert!(matches!(recorder.start(), Err(RecorderError::AlreadyRecording)));

    let audio = recorder.stop().unwrap();
    assert_eq!(audio.file_name, "take1.wav");
    assert_eq!(audio.mime, "audio/wav");
    assert_eq!(audio.bytes, b"RIFF");
    assert!(!recorder.is_recording());
    assert!(matches!(recorder.stop(), Err(RecorderError::NotRecording)));
}

#[test]
fn unreadable_entry_reports_action_and_path() {
    let temp = TempDir::new().unwrap();
    let dir = CacheDir::new(temp.path().to_path_buf());
    fs::create_dir(dir.path_of("summary.json")).unwrap();

    match dir.read("summary.json").unwrap_err() {
        PersistError::Io { action, path, .. } => {
            assert_eq!(action, "read");
            assert_eq!(path, dir.path_of("summary.json"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
