//! Integration tests for the file backend.

mod fixtures;

use bytes::Bytes;
use dial_storage::{ArtifactKey, ArtifactStorage, FileStorage, StorageKey};
use fixtures::{FileBackend, backdate, file_backend, profile_key, profile_payload};
use rstest::rstest;
use std::time::Duration;

// ============================================================================
// Round trips
// ============================================================================

mod round_trip_tests {
	use super::*;

	#[rstest]
	#[tokio::test]
	async fn test_store_then_fetch(
		file_backend: FileBackend,
		profile_key: StorageKey,
		profile_payload: Vec<u8>,
	) {
		let storage = &file_backend.storage;

		storage
			.store(&profile_key, Bytes::from(profile_payload.clone()), None)
			.await
			.expect("Failed to store");

		let fetched = storage.fetch(&profile_key).await.expect("Failed to fetch");
		assert_eq!(fetched.as_deref(), Some(profile_payload.as_slice()));
	}

	#[rstest]
	#[tokio::test]
	async fn test_fetch_unknown_key_is_absent(file_backend: FileBackend, profile_key: StorageKey) {
		let fetched = file_backend.storage.fetch(&profile_key).await.unwrap();

		assert!(fetched.is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn test_overwrite_replaces_content(file_backend: FileBackend, profile_key: StorageKey) {
		let storage = &file_backend.storage;

		storage.store(&profile_key, Bytes::from_static(b"old"), None).await.unwrap();
		storage.store(&profile_key, Bytes::from_static(b"new"), None).await.unwrap();

		assert_eq!(
			storage.fetch(&profile_key).await.unwrap(),
			Some(Bytes::from_static(b"new"))
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_delete(file_backend: FileBackend, profile_key: StorageKey) {
		let storage = &file_backend.storage;
		storage.store(&profile_key, Bytes::from_static(b"{}"), None).await.unwrap();

		storage.delete(&profile_key).await.unwrap();

		assert!(storage.fetch(&profile_key).await.unwrap().is_none());
		assert!(!storage.path_for(&profile_key).exists());
		storage.delete(&profile_key).await.expect("Deleting twice succeeds");
	}

	#[rstest]
	#[tokio::test]
	async fn test_suffixes_share_one_file(file_backend: FileBackend) {
		let storage = &file_backend.storage;
		let artifact = ArtifactKey::generate();

		storage
			.store(&artifact.storage_key("profile"), Bytes::from_static(b"first"), None)
			.await
			.unwrap();

		assert_eq!(
			storage.path_for(&artifact.storage_key("profile")),
			storage.path_for(&artifact.storage_key("other"))
		);
	}
}

// ============================================================================
// Expiry
// ============================================================================

mod expiry_tests {
	use super::*;

	#[rstest]
	#[tokio::test]
	async fn test_cleanup_removes_only_expired(file_backend: FileBackend) {
		let storage = &file_backend.storage;
		let expired = ArtifactKey::generate().profile_storage_key();
		let fresh = ArtifactKey::generate().profile_storage_key();

		storage.store(&expired, Bytes::from_static(b"expired"), None).await.unwrap();
		storage.store(&fresh, Bytes::from_static(b"fresh"), None).await.unwrap();
		backdate(&storage.path_for(&expired), Duration::from_secs(10));

		let removed = storage.cleanup().await.unwrap();

		assert_eq!(removed, 1);
		assert!(storage.fetch(&expired).await.unwrap().is_none());
		assert_eq!(
			storage.fetch(&fresh).await.unwrap(),
			Some(Bytes::from_static(b"fresh"))
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_expired_file_readable_until_swept(
		file_backend: FileBackend,
		profile_key: StorageKey,
	) {
		let storage = &file_backend.storage;
		storage.store(&profile_key, Bytes::from_static(b"{}"), None).await.unwrap();
		backdate(&storage.path_for(&profile_key), Duration::from_secs(10));

		assert!(FileStorage::is_expired(&storage.path_for(&profile_key)).await.unwrap());
		assert!(storage.fetch(&profile_key).await.unwrap().is_some());
	}

	#[rstest]
	#[tokio::test]
	async fn test_short_ttl_expires(file_backend: FileBackend, profile_key: StorageKey) {
		let storage = &file_backend.storage;

		storage
			.store(&profile_key, Bytes::from_static(b"{}"), Some(Duration::ZERO))
			.await
			.unwrap();
		tokio::time::sleep(Duration::from_millis(20)).await;

		assert_eq!(storage.cleanup().await.unwrap(), 1);
		assert!(storage.fetch(&profile_key).await.unwrap().is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn test_cleanup_of_empty_directory(file_backend: FileBackend) {
		assert!(file_backend.storage.supports_cleanup());
		assert_eq!(file_backend.storage.cleanup().await.unwrap(), 0);
	}
}
