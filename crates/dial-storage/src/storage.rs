//! Lazily built storage facade.

use bytes::Bytes;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Duration;

use crate::config::StorageSettings;
use crate::factory::create_storage;
use crate::key::{ArtifactKey, StorageKey};
use crate::{ArtifactStorage, Result};

/// Entry point for storing and retrieving artifacts.
///
/// The adapter is built from the settings on first use. Concurrent first
/// calls build at most one adapter; later calls read it without locking.
/// Every operation validates its key before the adapter is touched.
///
/// # Examples
///
/// ```
/// use dial_storage::{Storage, StorageSettings};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let temp = tempfile::tempdir().unwrap();
/// let storage = Storage::new(StorageSettings::file(temp.path()));
///
/// let key = Storage::generate_profile_key();
/// let storage_key = Storage::profile_storage_key(&key);
/// storage.store(storage_key.as_str(), "{}", None).await.unwrap();
///
/// let data = storage.fetch(storage_key.as_str()).await.unwrap();
/// assert_eq!(data.as_deref(), Some(&b"{}"[..]));
///
/// assert!(storage.fetch("not-a-key").await.is_err());
/// # });
/// ```
pub struct Storage {
	settings: StorageSettings,
	adapter: OnceCell<Arc<dyn ArtifactStorage>>,
}

impl Storage {
	/// Create a facade that builds its adapter from `settings` on first use
	pub fn new(settings: StorageSettings) -> Self {
		Self {
			settings,
			adapter: OnceCell::new(),
		}
	}

	/// Create a facade around an already built adapter
	pub fn with_adapter(adapter: Arc<dyn ArtifactStorage>) -> Self {
		Self {
			settings: StorageSettings::default(),
			adapter: OnceCell::with_value(adapter),
		}
	}

	/// Settings the adapter is built from
	pub fn settings(&self) -> &StorageSettings {
		&self.settings
	}

	/// The adapter, built on first call
	///
	/// # Errors
	///
	/// Returns the construction error; a failed construction is retried by
	/// the next call.
	pub fn adapter(&self) -> Result<&Arc<dyn ArtifactStorage>> {
		self.adapter
			.get_or_try_init(|| create_storage(&self.settings))
	}

	/// Store `data` under `key`
	pub async fn store(
		&self,
		key: &str,
		data: impl Into<Bytes>,
		ttl: Option<Duration>,
	) -> Result<()> {
		let key = StorageKey::parse(key)?;
		self.adapter()?.store(&key, data.into(), ttl).await
	}

	/// Fetch the bytes under `key`, `None` when absent
	pub async fn fetch(&self, key: &str) -> Result<Option<Bytes>> {
		let key = StorageKey::parse(key)?;
		self.adapter()?.fetch(&key).await
	}

	/// Remove the entry under `key`
	pub async fn delete(&self, key: &str) -> Result<()> {
		let key = StorageKey::parse(key)?;
		self.adapter()?.delete(&key).await
	}

	/// Sweep expired entries when the adapter needs it
	pub async fn cleanup(&self) -> Result<usize> {
		let adapter = self.adapter()?;
		if !adapter.supports_cleanup() {
			return Ok(0);
		}
		adapter.cleanup().await
	}

	/// Generate a fresh artifact key
	pub fn generate_profile_key() -> ArtifactKey {
		ArtifactKey::generate()
	}

	/// Storage key of the profile artifact behind `key` (`<key>:profile`)
	pub fn profile_storage_key(key: &ArtifactKey) -> StorageKey {
		key.profile_storage_key()
	}
}

impl std::fmt::Debug for Storage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Storage")
			.field("settings", &self.settings)
			.field("adapter", &self.adapter.get().map(|a| a.name()))
			.finish()
	}
}
