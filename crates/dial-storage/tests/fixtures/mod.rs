//! Fixtures for storage backend tests.

#![allow(dead_code)]

use dial_storage::{ArtifactKey, FileStorage, StorageKey};
use rstest::fixture;
use std::fs::{FileTimes, OpenOptions};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// File backend over a fresh temporary directory.
///
/// The directory guard must outlive the backend.
pub struct FileBackend {
	pub storage: FileStorage,
	pub temp_dir: TempDir,
}

#[fixture]
pub fn file_backend() -> FileBackend {
	let temp_dir = TempDir::new().expect("Failed to create temp dir");
	let storage = FileStorage::new(temp_dir.path().join("profiles"), Duration::from_secs(3600))
		.expect("Failed to create file storage");

	FileBackend { storage, temp_dir }
}

#[fixture]
pub fn profile_key() -> StorageKey {
	ArtifactKey::generate().profile_storage_key()
}

/// Profile-sized JSON payload.
#[fixture]
pub fn profile_payload() -> Vec<u8> {
	let samples: Vec<String> = (0..200).map(|i| format!("{{\"t\":{},\"stack\":[1,2,3]}}", i)).collect();
	format!("{{\"samples\":[{}]}}", samples.join(",")).into_bytes()
}

/// Move a file's deadline into the past.
pub fn backdate(path: &Path, by: Duration) {
	let past = SystemTime::now() - by;
	let file = OpenOptions::new()
		.write(true)
		.open(path)
		.expect("Failed to open artifact");
	file.set_times(FileTimes::new().set_accessed(past).set_modified(past))
		.expect("Failed to set file times");
}
