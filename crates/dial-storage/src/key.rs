//! Artifact and storage keys
//!
//! An [`ArtifactKey`] (`<uuid>_vernier`) is the public name of one profiling
//! artifact. A [`StorageKey`] (`<token>:<suffix>`) is what backends are
//! addressed with; the token is an artifact key and the suffix names the
//! purpose of the stored value.

use crate::error::{Result, StorageError};
use dial_core::constants::{ARTIFACT_KEY_SUFFIX, PROFILE_STORAGE_SUFFIX};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use uuid::Uuid;

static ARTIFACT_KEY_PATTERN: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^(?i:[0-9a-f-]+)_vernier$").expect("valid regex"));

static STORAGE_KEY_PATTERN: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^([^:/\\]+_vernier):(.+)$").expect("valid regex"));

/// Public identifier of one profiling artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey(String);

impl ArtifactKey {
	/// Generate a fresh key
	///
	/// # Examples
	///
	/// ```
	/// use dial_storage::ArtifactKey;
	///
	/// let key = ArtifactKey::generate();
	/// assert!(key.as_str().ends_with("_vernier"));
	/// assert_ne!(key, ArtifactKey::generate());
	/// ```
	pub fn generate() -> Self {
		Self(format!("{}{}", Uuid::now_v7(), ARTIFACT_KEY_SUFFIX))
	}

	/// Validate a key received from a client
	///
	/// Accepts hex digits and dashes in any case followed by a lower-case
	/// `_vernier`.
	pub fn parse(value: &str) -> Result<Self> {
		if ARTIFACT_KEY_PATTERN.is_match(value) {
			Ok(Self(value.to_string()))
		} else {
			Err(StorageError::InvalidKey(value.to_string()))
		}
	}

	/// Borrow the key text
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Storage key of the profile artifact (`<key>:profile`)
	pub fn profile_storage_key(&self) -> StorageKey {
		self.storage_key(PROFILE_STORAGE_SUFFIX)
	}

	/// Storage key of this artifact for an arbitrary purpose
	pub fn storage_key(&self, suffix: &str) -> StorageKey {
		StorageKey {
			raw: format!("{}:{}", self.0, suffix),
			split: self.0.len(),
		}
	}
}

impl fmt::Display for ArtifactKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for ArtifactKey {
	type Err = StorageError;

	fn from_str(s: &str) -> Result<Self> {
		Self::parse(s)
	}
}

/// Backend-facing key of the shape `<token>:<suffix>`
///
/// The token ends with `_vernier` and contains no `:`, so every key splits
/// into exactly one `(token, suffix)` pair. It contains no `/` or `\`
/// either, so it is safe to use as a file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
	raw: String,
	split: usize,
}

impl StorageKey {
	/// Validate a raw storage key
	///
	/// # Examples
	///
	/// ```
	/// use dial_storage::StorageKey;
	///
	/// let key = StorageKey::parse("abc_vernier:profile").unwrap();
	/// assert_eq!(key.token(), "abc_vernier");
	/// assert_eq!(key.suffix(), "profile");
	///
	/// assert!(StorageKey::parse("abc:profile").is_err());
	/// assert!(StorageKey::parse("abc_vernier").is_err());
	/// ```
	pub fn parse(value: &str) -> Result<Self> {
		let captures = STORAGE_KEY_PATTERN
			.captures(value)
			.ok_or_else(|| StorageError::InvalidKey(value.to_string()))?;
		let split = captures.get(1).map(|m| m.end()).unwrap_or_default();

		Ok(Self {
			raw: value.to_string(),
			split,
		})
	}

	/// The whole key
	pub fn as_str(&self) -> &str {
		&self.raw
	}

	/// The part before the first `:`
	pub fn token(&self) -> &str {
		&self.raw[..self.split]
	}

	/// The part after the first `:`
	pub fn suffix(&self) -> &str {
		&self.raw[self.split + 1..]
	}

	/// Key with the token wrapped in a hash tag, `{token}:suffix`
	///
	/// Cluster-aware caches hash only the braced part, so every key of one
	/// artifact lands on the same shard.
	pub fn cluster_key(&self) -> String {
		format!("{{{}}}:{}", self.token(), self.suffix())
	}
}

impl fmt::Display for StorageKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.raw)
	}
}

impl FromStr for StorageKey {
	type Err = StorageError;

	fn from_str(s: &str) -> Result<Self> {
		Self::parse(s)
	}
}
