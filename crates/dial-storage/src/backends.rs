//! Storage backend implementations.

pub mod file;
pub mod memcached;
pub mod redis;

pub use file::FileStorage;
pub use memcached::{MemcachedClient, MemcachedStorage};
pub use redis::{RedisClient, RedisStorage};

#[cfg(feature = "memcached-backend")]
pub use memcached::MemcachedConnection;
