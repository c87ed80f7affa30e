//! Storage backend trait definition.

use crate::Result;
use crate::key::StorageKey;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Capability shared by every artifact backend.
///
/// Keys reaching a backend are already validated. Backend failures are
/// returned unchanged; no backend retries on its own.
///
/// # Examples
///
/// ```rust,no_run
/// use dial_storage::{ArtifactKey, ArtifactStorage, Result};
/// use std::time::Duration;
///
/// async fn example(storage: &dyn ArtifactStorage) -> Result<()> {
///     let key = ArtifactKey::generate().profile_storage_key();
///
///     storage.store(&key, "{}".into(), Some(Duration::from_secs(60))).await?;
///     assert!(storage.fetch(&key).await?.is_some());
///     storage.delete(&key).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait ArtifactStorage: Send + Sync {
	/// Short adapter name, as used in configuration.
	fn name(&self) -> &'static str;

	/// Store `data` under `key`, expiring after `ttl` when given.
	///
	/// # Errors
	///
	/// Returns the backend's I/O or client error.
	async fn store(&self, key: &StorageKey, data: Bytes, ttl: Option<Duration>) -> Result<()>;

	/// Fetch the bytes stored under `key`.
	///
	/// A missing entry is `Ok(None)`, never an error.
	async fn fetch(&self, key: &StorageKey) -> Result<Option<Bytes>>;

	/// Remove the entry under `key`. Removing a missing entry succeeds.
	async fn delete(&self, key: &StorageKey) -> Result<()>;

	/// Whether [`ArtifactStorage::cleanup`] does any work.
	fn supports_cleanup(&self) -> bool {
		false
	}

	/// Remove expired entries, returning how many were removed.
	///
	/// Backends whose entries expire on their own do nothing.
	async fn cleanup(&self) -> Result<usize> {
		Ok(0)
	}
}
