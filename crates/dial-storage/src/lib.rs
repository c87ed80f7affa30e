//! # dial-storage
//!
//! Storage for profiling artifacts.
//!
//! Artifacts are opaque byte payloads stored under a validated
//! [`StorageKey`] with a time-to-live. One adapter is selected from
//! configuration and built lazily by the [`Storage`] facade:
//!
//! - **file**: one file per artifact, the deadline kept as the file's
//!   modification time and swept by [`Storage::cleanup`]
//! - **redis**: `SETEX`/`GET`/`DEL` on cluster hash-tagged keys
//! - **memcached**: `set`/`get`/`delete` with an expiration
//!
//! ## Features
//!
//! - `redis-backend`: [`RedisClient`] for `deadpool_redis::Pool`
//! - `memcached-backend`: [`MemcachedConnection`] over `memcache-async`

pub mod backend;
pub mod backends;
pub mod config;
pub mod error;
pub mod factory;
pub mod key;
pub mod storage;

pub use backend::ArtifactStorage;
pub use backends::{
	FileStorage, MemcachedClient, MemcachedStorage, RedisClient, RedisStorage,
};
pub use config::{BackendType, StorageSettings};
pub use error::{Result, StorageError};
pub use factory::create_storage;
pub use key::{ArtifactKey, StorageKey};
pub use storage::Storage;

#[cfg(feature = "memcached-backend")]
pub use backends::MemcachedConnection;
