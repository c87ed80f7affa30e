//! Integration tests for the storage facade.

use async_trait::async_trait;
use bytes::Bytes;
use dial_storage::{
	ArtifactStorage, MemcachedClient, RedisClient, Storage, StorageError, StorageKey,
	StorageSettings,
};
use parking_lot::Mutex;
use rstest::rstest;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[derive(Default)]
struct MapClient {
	entries: Mutex<HashMap<String, Bytes>>,
}

#[async_trait]
impl RedisClient for MapClient {
	async fn set_ex(&self, key: &str, value: Bytes, _seconds: u64) -> dial_storage::Result<()> {
		self.entries.lock().insert(key.to_string(), value);
		Ok(())
	}

	async fn get(&self, key: &str) -> dial_storage::Result<Option<Bytes>> {
		Ok(self.entries.lock().get(key).cloned())
	}

	async fn del(&self, key: &str) -> dial_storage::Result<()> {
		self.entries.lock().remove(key);
		Ok(())
	}
}

#[async_trait]
impl MemcachedClient for MapClient {
	async fn set(&self, key: &str, value: Bytes, _expiration: u32) -> dial_storage::Result<()> {
		self.entries.lock().insert(key.to_string(), value);
		Ok(())
	}

	async fn get(&self, key: &str) -> dial_storage::Result<Option<Bytes>> {
		Ok(self.entries.lock().get(key).cloned())
	}

	async fn delete(&self, key: &str) -> dial_storage::Result<()> {
		self.entries.lock().remove(key);
		Ok(())
	}
}

/// Adapter that records the keys it is asked for.
#[derive(Default)]
struct RecordingAdapter {
	seen: Mutex<Vec<String>>,
}

#[async_trait]
impl ArtifactStorage for RecordingAdapter {
	fn name(&self) -> &'static str {
		"recording"
	}

	async fn store(
		&self,
		key: &StorageKey,
		_data: Bytes,
		_ttl: Option<Duration>,
	) -> dial_storage::Result<()> {
		self.seen.lock().push(key.to_string());
		Ok(())
	}

	async fn fetch(&self, key: &StorageKey) -> dial_storage::Result<Option<Bytes>> {
		self.seen.lock().push(key.to_string());
		Ok(None)
	}

	async fn delete(&self, key: &StorageKey) -> dial_storage::Result<()> {
		self.seen.lock().push(key.to_string());
		Ok(())
	}
}

#[rstest]
#[case("abc:profile")]
#[case("abc_vernier")]
#[case("")]
#[tokio::test]
async fn test_malformed_keys_never_reach_adapter(#[case] key: &str) {
	let adapter = Arc::new(RecordingAdapter::default());
	let storage = Storage::with_adapter(adapter.clone());

	assert!(matches!(
		storage.store(key, "x", None).await,
		Err(StorageError::InvalidKey(_))
	));
	assert!(matches!(storage.fetch(key).await, Err(StorageError::InvalidKey(_))));
	assert!(matches!(storage.delete(key).await, Err(StorageError::InvalidKey(_))));
	assert!(adapter.seen.lock().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_cleanup_is_noop_without_support() {
	let storage = Storage::with_adapter(Arc::new(RecordingAdapter::default()));

	assert_eq!(storage.cleanup().await.unwrap(), 0);
}

#[rstest]
#[tokio::test]
async fn test_file_backend_through_facade() {
	let temp = TempDir::new().unwrap();
	let storage = Storage::new(StorageSettings::file(temp.path().join("nested").join("dir")));
	let key = Storage::profile_storage_key(&Storage::generate_profile_key());

	storage.store(key.as_str(), Bytes::from_static(b"{\"ok\":true}"), None).await.unwrap();

	assert_eq!(
		storage.fetch(key.as_str()).await.unwrap(),
		Some(Bytes::from_static(b"{\"ok\":true}"))
	);
	assert_eq!(storage.adapter().unwrap().name(), "file");
}

#[rstest]
#[tokio::test]
async fn test_redis_settings_use_cluster_keys() {
	let client = Arc::new(MapClient::default());
	let storage = Storage::new(StorageSettings::redis(client.clone()));

	storage.store("uuid1_vernier:profile", "data", None).await.unwrap();

	assert!(client.entries.lock().contains_key("{uuid1_vernier}:profile"));
	assert_eq!(
		storage.fetch("uuid1_vernier:profile").await.unwrap(),
		Some(Bytes::from_static(b"data"))
	);
}

#[rstest]
#[tokio::test]
async fn test_memcached_settings_round_trip() {
	let client = Arc::new(MapClient::default());
	let storage = Storage::new(StorageSettings::memcached(client.clone()));

	storage.store("uuid1_vernier:profile", "data", None).await.unwrap();
	storage.delete("uuid1_vernier:profile").await.unwrap();

	assert!(storage.fetch("uuid1_vernier:profile").await.unwrap().is_none());
	assert_eq!(storage.adapter().unwrap().name(), "memcached");
}

#[rstest]
#[case("redis", "Redis client required")]
#[case("memcached", "Memcached client required")]
#[tokio::test]
async fn test_remote_backend_without_client(#[case] backend: &str, #[case] message: &str) {
	let mut settings = StorageSettings::default();
	settings.backend = backend.to_string();
	let storage = Storage::new(settings);

	let err = storage.fetch("abc_vernier:profile").await.unwrap_err();

	assert_eq!(err.to_string(), message);
}
