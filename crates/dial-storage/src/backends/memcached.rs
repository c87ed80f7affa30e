//! Memcached artifact backend.
//!
//! Same contract as the Redis backend, through a client with Memcached's
//! `set` / `get` / `delete` vocabulary. With the `memcached-backend` feature,
//! [`MemcachedConnection`] provides a client over the ASCII protocol of the
//! `memcache-async` crate.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::ArtifactStorage;
use crate::key::StorageKey;
use crate::{Result, StorageError};

/// Client capability the Memcached backend delegates to
#[async_trait]
pub trait MemcachedClient: Send + Sync {
	/// Store `value` under `key` for `expiration` seconds.
	async fn set(&self, key: &str, value: Bytes, expiration: u32) -> Result<()>;

	/// Read the value under `key`.
	async fn get(&self, key: &str) -> Result<Option<Bytes>>;

	/// Remove the value under `key`.
	async fn delete(&self, key: &str) -> Result<()>;
}

/// Memcached storage backend.
#[derive(Clone)]
pub struct MemcachedStorage {
	client: Arc<dyn MemcachedClient>,
	default_ttl: Duration,
}

impl MemcachedStorage {
	/// Create the backend around a client.
	///
	/// # Errors
	///
	/// Returns `StorageError::MissingClient` when no client is given.
	pub fn new(client: Option<Arc<dyn MemcachedClient>>, default_ttl: Duration) -> Result<Self> {
		let client = client.ok_or(StorageError::MissingClient("Memcached"))?;

		Ok(Self {
			client,
			default_ttl,
		})
	}
}

impl std::fmt::Debug for MemcachedStorage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MemcachedStorage")
			.field("default_ttl", &self.default_ttl)
			.finish_non_exhaustive()
	}
}

#[async_trait]
impl ArtifactStorage for MemcachedStorage {
	fn name(&self) -> &'static str {
		"memcached"
	}

	async fn store(&self, key: &StorageKey, data: Bytes, ttl: Option<Duration>) -> Result<()> {
		let ttl = ttl.unwrap_or(self.default_ttl);
		let expiration = u32::try_from(ttl.as_secs()).unwrap_or(u32::MAX);
		self.client.set(&key.cluster_key(), data, expiration).await
	}

	async fn fetch(&self, key: &StorageKey) -> Result<Option<Bytes>> {
		self.client.get(&key.cluster_key()).await
	}

	async fn delete(&self, key: &StorageKey) -> Result<()> {
		self.client.delete(&key.cluster_key()).await
	}
}

#[cfg(feature = "memcached-backend")]
pub use connection::MemcachedConnection;

#[cfg(feature = "memcached-backend")]
mod connection {
	use super::MemcachedClient;
	use crate::{Result, StorageError};
	use async_trait::async_trait;
	use bytes::Bytes;
	use memcache_async::ascii::Protocol;
	use tokio::net::TcpStream;
	use tokio::sync::Mutex;
	use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

	type MemcachedProtocol = Protocol<Compat<TcpStream>>;

	/// Single-server Memcached client over one TCP connection
	pub struct MemcachedConnection {
		protocol: Mutex<MemcachedProtocol>,
	}

	impl MemcachedConnection {
		/// Connect to `addr` (`host:port`).
		pub async fn connect(addr: &str) -> Result<Self> {
			let stream = TcpStream::connect(addr).await.map_err(|e| {
				StorageError::Backend(format!("Failed to connect to Memcached: {}", e))
			})?;

			Ok(Self {
				protocol: Mutex::new(Protocol::new(stream.compat())),
			})
		}
	}

	#[async_trait]
	impl MemcachedClient for MemcachedConnection {
		async fn set(&self, key: &str, value: Bytes, expiration: u32) -> Result<()> {
			let mut protocol = self.protocol.lock().await;
			protocol
				.set(&key, &value, expiration)
				.await
				.map_err(|e| StorageError::Backend(format!("Memcached set error: {}", e)))
		}

		async fn get(&self, key: &str) -> Result<Option<Bytes>> {
			let mut protocol = self.protocol.lock().await;
			match protocol.get(&key).await {
				Ok(value) if value.is_empty() => Ok(None),
				Ok(value) => Ok(Some(Bytes::from(value))),
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
				Err(e) => Err(StorageError::Backend(format!("Memcached get error: {}", e))),
			}
		}

		async fn delete(&self, key: &str) -> Result<()> {
			let mut protocol = self.protocol.lock().await;
			// The ASCII protocol client has no delete; an empty value expiring
			// after one second reads back as missing.
			protocol
				.set(&key, &[], 1)
				.await
				.map_err(|e| StorageError::Backend(format!("Memcached delete error: {}", e)))
		}
	}
}
