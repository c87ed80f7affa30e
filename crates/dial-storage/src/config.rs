//! Configuration types for storage backends.

use crate::backends::{MemcachedClient, RedisClient};
use crate::{Result, StorageError};
use dial_core::constants::{MAX_STORAGE_TTL, PROFILE_OUT_RELATIVE_DIRNAME, STORAGE_TTL};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Storage backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
	/// Files with a modification-time deadline
	File,
	/// Redis, cluster-aware keys
	Redis,
	/// Memcached
	Memcached,
}

impl BackendType {
	/// Every supported adapter, by configuration name
	pub const SUPPORTED: [&'static str; 3] = ["file", "redis", "memcached"];

	/// Configuration name of the backend
	pub fn as_str(&self) -> &'static str {
		match self {
			BackendType::File => "file",
			BackendType::Redis => "redis",
			BackendType::Memcached => "memcached",
		}
	}
}

impl fmt::Display for BackendType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for BackendType {
	type Err = StorageError;

	fn from_str(s: &str) -> Result<Self> {
		match s.trim().to_lowercase().as_str() {
			"file" => Ok(BackendType::File),
			"redis" => Ok(BackendType::Redis),
			"memcached" => Ok(BackendType::Memcached),
			_ => Err(StorageError::UnsupportedAdapter {
				value: s.to_string(),
				supported: Self::SUPPORTED.to_vec(),
			}),
		}
	}
}

/// Storage configuration.
///
/// `backend` stays a plain string until the adapter is built, so an unknown
/// name is reported on first use together with the supported set.
///
/// # Examples
///
/// ```
/// use dial_storage::StorageSettings;
/// use std::time::Duration;
///
/// let settings = StorageSettings::file("tmp/profiles").with_ttl(Duration::from_secs(600));
/// assert_eq!(settings.backend, "file");
/// assert_eq!(settings.ttl, Duration::from_secs(600));
/// ```
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
	/// Adapter name: `file`, `redis` or `memcached`
	pub backend: String,
	/// Default time-to-live, in seconds when deserialized
	#[serde(deserialize_with = "deserialize_secs")]
	pub ttl: Duration,
	/// Directory of the file backend
	pub dir: PathBuf,
	/// Client of the Redis backend
	#[serde(skip)]
	pub redis_client: Option<Arc<dyn RedisClient>>,
	/// Client of the Memcached backend
	#[serde(skip)]
	pub memcached_client: Option<Arc<dyn MemcachedClient>>,
}

fn deserialize_secs<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
	D: Deserializer<'de>,
{
	u64::deserialize(deserializer).map(Duration::from_secs)
}

impl StorageSettings {
	/// File backend writing to `dir`
	pub fn file(dir: impl Into<PathBuf>) -> Self {
		Self {
			dir: dir.into(),
			..Self::default()
		}
	}

	/// Redis backend over `client`
	pub fn redis(client: Arc<dyn RedisClient>) -> Self {
		Self {
			backend: BackendType::Redis.to_string(),
			redis_client: Some(client),
			..Self::default()
		}
	}

	/// Memcached backend over `client`
	pub fn memcached(client: Arc<dyn MemcachedClient>) -> Self {
		Self {
			backend: BackendType::Memcached.to_string(),
			memcached_client: Some(client),
			..Self::default()
		}
	}

	/// Override the default time-to-live
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;
		self
	}

	/// Resolve the configured adapter name
	pub fn backend_type(&self) -> Result<BackendType> {
		self.backend.parse()
	}

	/// Check the adapter name and the time-to-live
	///
	/// # Errors
	///
	/// Returns `StorageError::UnsupportedAdapter` for an unknown backend and
	/// `StorageError::InvalidTtl` for a TTL longer than [`MAX_STORAGE_TTL`].
	pub fn validate(&self) -> Result<()> {
		self.backend_type()?;
		if self.ttl > MAX_STORAGE_TTL {
			return Err(StorageError::InvalidTtl(self.ttl));
		}
		Ok(())
	}
}

impl Default for StorageSettings {
	fn default() -> Self {
		Self {
			backend: BackendType::File.to_string(),
			ttl: STORAGE_TTL,
			dir: PathBuf::from(PROFILE_OUT_RELATIVE_DIRNAME),
			redis_client: None,
			memcached_client: None,
		}
	}
}

impl fmt::Debug for StorageSettings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StorageSettings")
			.field("backend", &self.backend)
			.field("ttl", &self.ttl)
			.field("dir", &self.dir)
			.field("redis_client", &self.redis_client.is_some())
			.field("memcached_client", &self.memcached_client.is_some())
			.finish()
	}
}
