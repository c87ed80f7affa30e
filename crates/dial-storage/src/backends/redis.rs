//! Redis artifact backend
//!
//! Keys are written in their cluster form (`{token}:suffix`) so that a Redis
//! Cluster routes every key of one artifact to the same slot.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::ArtifactStorage;
use crate::key::StorageKey;
use crate::{Result, StorageError};

/// Client capability the Redis backend delegates to
///
/// Implemented for `deadpool_redis::Pool` with the `redis-backend` feature.
#[async_trait]
pub trait RedisClient: Send + Sync {
	/// `SETEX key seconds value`
	async fn set_ex(&self, key: &str, value: Bytes, seconds: u64) -> Result<()>;

	/// `GET key`
	async fn get(&self, key: &str) -> Result<Option<Bytes>>;

	/// `DEL key`
	async fn del(&self, key: &str) -> Result<()>;
}

/// Redis storage backend.
#[derive(Clone)]
pub struct RedisStorage {
	client: Arc<dyn RedisClient>,
	default_ttl: Duration,
}

impl RedisStorage {
	/// Create the backend around a client.
	///
	/// # Errors
	///
	/// Returns `StorageError::MissingClient` when no client is given.
	pub fn new(client: Option<Arc<dyn RedisClient>>, default_ttl: Duration) -> Result<Self> {
		let client = client.ok_or(StorageError::MissingClient("Redis"))?;

		Ok(Self {
			client,
			default_ttl,
		})
	}
}

impl std::fmt::Debug for RedisStorage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RedisStorage")
			.field("default_ttl", &self.default_ttl)
			.finish_non_exhaustive()
	}
}

#[async_trait]
impl ArtifactStorage for RedisStorage {
	fn name(&self) -> &'static str {
		"redis"
	}

	async fn store(&self, key: &StorageKey, data: Bytes, ttl: Option<Duration>) -> Result<()> {
		// SETEX rejects a zero expiry.
		let seconds = ttl.unwrap_or(self.default_ttl).as_secs().max(1);
		self.client.set_ex(&key.cluster_key(), data, seconds).await
	}

	async fn fetch(&self, key: &StorageKey) -> Result<Option<Bytes>> {
		self.client.get(&key.cluster_key()).await
	}

	async fn delete(&self, key: &StorageKey) -> Result<()> {
		self.client.del(&key.cluster_key()).await
	}
}

#[cfg(feature = "redis-backend")]
mod pool {
	use super::RedisClient;
	use crate::{Result, StorageError};
	use async_trait::async_trait;
	use bytes::Bytes;
	use deadpool_redis::Pool;
	use redis::AsyncCommands;

	async fn connection(pool: &Pool) -> Result<deadpool_redis::Connection> {
		pool.get().await.map_err(|e| {
			StorageError::Backend(format!("Failed to get connection from pool: {}", e))
		})
	}

	#[async_trait]
	impl RedisClient for Pool {
		async fn set_ex(&self, key: &str, value: Bytes, seconds: u64) -> Result<()> {
			let mut conn = connection(self).await?;
			let _: () = conn
				.set_ex(key, value.to_vec(), seconds)
				.await
				.map_err(|e| StorageError::Backend(format!("Failed to set value in Redis: {}", e)))?;
			Ok(())
		}

		async fn get(&self, key: &str) -> Result<Option<Bytes>> {
			let mut conn = connection(self).await?;
			let value: Option<Vec<u8>> = conn
				.get(key)
				.await
				.map_err(|e| StorageError::Backend(format!("Failed to get value from Redis: {}", e)))?;
			Ok(value.map(Bytes::from))
		}

		async fn del(&self, key: &str) -> Result<()> {
			let mut conn = connection(self).await?;
			let _: () = conn.del(key).await.map_err(|e| {
				StorageError::Backend(format!("Failed to delete value from Redis: {}", e))
			})?;
			Ok(())
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use parking_lot::Mutex;
	use rstest::rstest;
	use std::collections::HashMap;

	#[derive(Default)]
	struct RecordingClient {
		entries: Mutex<HashMap<String, (Bytes, u64)>>,
	}

	#[async_trait]
	impl RedisClient for RecordingClient {
		async fn set_ex(&self, key: &str, value: Bytes, seconds: u64) -> Result<()> {
			self.entries.lock().insert(key.to_string(), (value, seconds));
			Ok(())
		}

		async fn get(&self, key: &str) -> Result<Option<Bytes>> {
			Ok(self.entries.lock().get(key).map(|(v, _)| v.clone()))
		}

		async fn del(&self, key: &str) -> Result<()> {
			self.entries.lock().remove(key);
			Ok(())
		}
	}

	struct FailingClient;

	#[async_trait]
	impl RedisClient for FailingClient {
		async fn set_ex(&self, _key: &str, _value: Bytes, _seconds: u64) -> Result<()> {
			Err(StorageError::Backend("connection refused".to_string()))
		}

		async fn get(&self, _key: &str) -> Result<Option<Bytes>> {
			Err(StorageError::Backend("connection refused".to_string()))
		}

		async fn del(&self, _key: &str) -> Result<()> {
			Err(StorageError::Backend("connection refused".to_string()))
		}
	}

	#[rstest]
	fn test_missing_client() {
		let err = RedisStorage::new(None, Duration::from_secs(60)).unwrap_err();

		assert_eq!(err.to_string(), "Redis client required");
	}

	#[rstest]
	#[tokio::test]
	async fn test_uses_cluster_keys_and_default_ttl() {
		let client = Arc::new(RecordingClient::default());
		let storage = RedisStorage::new(Some(client.clone() as Arc<dyn RedisClient>), Duration::from_secs(3600)).unwrap();
		let key = StorageKey::parse("uuid1_vernier:profile").unwrap();

		storage.store(&key, Bytes::from_static(b"data"), None).await.unwrap();

		let entries = client.entries.lock().clone();
		assert_eq!(
			entries.get("{uuid1_vernier}:profile"),
			Some(&(Bytes::from_static(b"data"), 3600))
		);
		drop(entries);

		assert_eq!(storage.fetch(&key).await.unwrap(), Some(Bytes::from_static(b"data")));
		storage.delete(&key).await.unwrap();
		assert_eq!(storage.fetch(&key).await.unwrap(), None);
	}

	#[rstest]
	#[tokio::test]
	async fn test_explicit_ttl_wins() {
		let client = Arc::new(RecordingClient::default());
		let storage = RedisStorage::new(Some(client.clone() as Arc<dyn RedisClient>), Duration::from_secs(3600)).unwrap();
		let key = StorageKey::parse("uuid1_vernier:profile").unwrap();

		storage
			.store(&key, Bytes::from_static(b"data"), Some(Duration::from_secs(5)))
			.await
			.unwrap();

		assert_eq!(client.entries.lock()["{uuid1_vernier}:profile"].1, 5);
	}

	#[rstest]
	#[tokio::test]
	async fn test_client_errors_propagate() {
		let storage = RedisStorage::new(
			Some(Arc::new(FailingClient) as Arc<dyn RedisClient>),
			Duration::from_secs(60),
		)
		.unwrap();
		let key = StorageKey::parse("uuid1_vernier:profile").unwrap();

		let err = storage.fetch(&key).await.unwrap_err();
		assert!(matches!(err, StorageError::Backend(ref msg) if msg == "connection refused"));
		assert!(storage.store(&key, Bytes::new(), None).await.is_err());
	}
}
