//! File system artifact backend.
//!
//! One file per artifact token: `<dir>/<token>.json`. The time-to-live is
//! recorded as the file's modification time, set into the future at
//! `now + ttl`; a file is expired once the clock passes that deadline. A TTL
//! whose deadline the clock cannot represent is rejected.
//! Expired files stay readable until [`FileStorage::cleanup`] sweeps them.

use async_trait::async_trait;
use bytes::Bytes;
use dial_core::constants::PROFILE_FILE_EXTENSION;
use std::fs::{FileTimes, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;

use crate::backend::ArtifactStorage;
use crate::key::StorageKey;
use crate::{Result, StorageError};

/// File system storage backend.
#[derive(Debug, Clone)]
pub struct FileStorage {
	dir: PathBuf,
	default_ttl: Duration,
}

impl FileStorage {
	/// Create the backend, creating `dir` and any missing parents.
	///
	/// # Errors
	///
	/// Returns `StorageError::Io` if the directory cannot be created.
	pub fn new(dir: impl Into<PathBuf>, default_ttl: Duration) -> Result<Self> {
		let dir = dir.into();
		std::fs::create_dir_all(&dir)?;

		Ok(Self { dir, default_ttl })
	}

	/// Directory artifacts are written to
	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Path of the file holding the artifact behind `key`
	///
	/// Tokens never contain path separators, so the path stays inside
	/// [`FileStorage::dir`].
	pub fn path_for(&self, key: &StorageKey) -> PathBuf {
		self.dir
			.join(format!("{}{}", key.token(), PROFILE_FILE_EXTENSION))
	}

	/// Whether the deadline recorded on `path` has passed
	pub async fn is_expired(path: &Path) -> Result<bool> {
		let modified = fs::metadata(path).await?.modified()?;
		Ok(modified < SystemTime::now())
	}
}

fn write_with_deadline(path: &Path, data: &[u8], deadline: SystemTime) -> io::Result<()> {
	std::fs::write(path, data)?;
	let file = OpenOptions::new().write(true).open(path)?;
	file.set_times(
		FileTimes::new()
			.set_accessed(deadline)
			.set_modified(deadline),
	)
}

#[async_trait]
impl ArtifactStorage for FileStorage {
	fn name(&self) -> &'static str {
		"file"
	}

	async fn store(&self, key: &StorageKey, data: Bytes, ttl: Option<Duration>) -> Result<()> {
		let path = self.path_for(key);
		let ttl = ttl.unwrap_or(self.default_ttl);
		let deadline = SystemTime::now()
			.checked_add(ttl)
			.ok_or(StorageError::InvalidTtl(ttl))?;

		tokio::task::spawn_blocking(move || write_with_deadline(&path, &data, deadline))
			.await
			.map_err(|e| StorageError::Io(io::Error::other(e)))??;

		Ok(())
	}

	async fn fetch(&self, key: &StorageKey) -> Result<Option<Bytes>> {
		match fs::read(self.path_for(key)).await {
			Ok(content) => Ok(Some(Bytes::from(content))),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(e.into()),
		}
	}

	async fn delete(&self, key: &StorageKey) -> Result<()> {
		match fs::remove_file(self.path_for(key)).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e.into()),
		}
	}

	fn supports_cleanup(&self) -> bool {
		true
	}

	async fn cleanup(&self) -> Result<usize> {
		let mut entries = fs::read_dir(&self.dir).await?;
		let mut removed = 0;

		while let Some(entry) = entries.next_entry().await? {
			let path = entry.path();
			let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
			if !is_file || !Self::is_expired(&path).await.unwrap_or(false) {
				continue;
			}

			// A concurrent delete may win the race; the file is gone either way.
			match fs::remove_file(&path).await {
				Ok(()) => removed += 1,
				Err(e) => {
					tracing::debug!(path = %path.display(), error = %e, "Skipping expired artifact");
				}
			}
		}

		if removed > 0 {
			tracing::debug!(removed, dir = %self.dir.display(), "Removed expired artifacts");
		}
		Ok(removed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use tempfile::TempDir;

	#[rstest]
	fn test_new_creates_missing_parents() {
		let temp = TempDir::new().unwrap();
		let dir = temp.path().join("tmp").join("dial").join("profiles");

		let storage = FileStorage::new(&dir, Duration::from_secs(60)).unwrap();

		assert!(dir.is_dir());
		assert_eq!(storage.dir(), dir.as_path());
		FileStorage::new(&dir, Duration::from_secs(60)).unwrap();
	}

	#[rstest]
	fn test_path_uses_token_only() {
		let temp = TempDir::new().unwrap();
		let storage = FileStorage::new(temp.path(), Duration::from_secs(60)).unwrap();
		let key = StorageKey::parse("abc_vernier:profile").unwrap();

		assert_eq!(storage.path_for(&key), temp.path().join("abc_vernier.json"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_store_sets_future_deadline() {
		let temp = TempDir::new().unwrap();
		let storage = FileStorage::new(temp.path(), Duration::from_secs(3600)).unwrap();
		let key = StorageKey::parse("abc_vernier:profile").unwrap();

		storage.store(&key, Bytes::from_static(b"{}"), None).await.unwrap();

		let modified = std::fs::metadata(storage.path_for(&key))
			.unwrap()
			.modified()
			.unwrap();
		assert!(modified > SystemTime::now() + Duration::from_secs(3500));
		assert!(!FileStorage::is_expired(&storage.path_for(&key)).await.unwrap());
	}

	#[rstest]
	#[tokio::test]
	async fn test_unrepresentable_ttl_is_rejected() {
		let temp = TempDir::new().unwrap();
		let storage = FileStorage::new(temp.path(), Duration::from_secs(60)).unwrap();
		let key = StorageKey::parse("abc_vernier:profile").unwrap();

		let err = storage
			.store(&key, Bytes::from_static(b"{}"), Some(Duration::from_secs(u64::MAX)))
			.await
			.unwrap_err();

		assert!(matches!(err, StorageError::InvalidTtl(_)));
		assert!(!storage.path_for(&key).exists());
	}

	#[rstest]
	#[case("../escape_vernier:profile")]
	#[case("nested/abc_vernier:profile")]
	#[case("..\\escape_vernier:profile")]
	fn test_keys_cannot_leave_directory(#[case] raw: &str) {
		assert!(matches!(
			StorageKey::parse(raw),
			Err(StorageError::InvalidKey(_))
		));
	}
}
