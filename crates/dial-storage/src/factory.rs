//! Factory function for creating storage backends.

use crate::backends::{FileStorage, MemcachedStorage, RedisStorage};
use crate::config::{BackendType, StorageSettings};
use crate::{ArtifactStorage, Result};
use std::sync::Arc;

/// Create a storage backend from configuration.
///
/// # Errors
///
/// Returns `StorageError::UnsupportedAdapter` for an unknown backend name,
/// `StorageError::MissingClient` for a remote backend without a client and
/// `StorageError::Io` when the file backend cannot create its directory.
///
/// # Examples
///
/// ```
/// use dial_storage::{StorageSettings, create_storage};
///
/// let temp = tempfile::tempdir().unwrap();
/// let storage = create_storage(&StorageSettings::file(temp.path())).unwrap();
/// assert_eq!(storage.name(), "file");
///
/// let mut settings = StorageSettings::default();
/// settings.backend = "redis".to_string();
/// assert!(create_storage(&settings).is_err());
/// ```
pub fn create_storage(settings: &StorageSettings) -> Result<Arc<dyn ArtifactStorage>> {
	let backend_type = settings.backend_type()?;
	tracing::debug!(backend = %backend_type, "Building artifact storage adapter");

	match backend_type {
		BackendType::File => Ok(Arc::new(FileStorage::new(&settings.dir, settings.ttl)?)),
		BackendType::Redis => Ok(Arc::new(RedisStorage::new(
			settings.redis_client.clone(),
			settings.ttl,
		)?)),
		BackendType::Memcached => Ok(Arc::new(MemcachedStorage::new(
			settings.memcached_client.clone(),
			settings.ttl,
		)?)),
	}
}
