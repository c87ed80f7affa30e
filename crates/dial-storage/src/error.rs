//! Error types for artifact storage.

use thiserror::Error;

/// Result alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors raised by key validation, adapter selection and backends.
#[derive(Debug, Error)]
pub enum StorageError {
	/// A key did not match the required shape; no backend was touched.
	#[error("Invalid key format: {0}")]
	InvalidKey(String),

	/// The configured adapter name is not one of the supported ones.
	#[error("Unsupported storage type: {value}. Supported adapters: {}", .supported.join(", "))]
	UnsupportedAdapter {
		/// Offending configured value
		value: String,
		/// Names of every supported adapter
		supported: Vec<&'static str>,
	},

	/// A time-to-live outside the accepted range.
	#[error("TTL out of range: {0:?}")]
	InvalidTtl(std::time::Duration),

	/// A remote adapter was selected without a client.
	#[error("{0} client required")]
	MissingClient(&'static str),

	/// File system failure.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// Failure reported by a remote cache client.
	#[error("Backend error: {0}")]
	Backend(String),
}

impl StorageError {
	/// Whether the error was raised before any I/O happened.
	pub fn is_validation(&self) -> bool {
		matches!(
			self,
			StorageError::InvalidKey(_)
				| StorageError::InvalidTtl(_)
				| StorageError::UnsupportedAdapter { .. }
				| StorageError::MissingClient(_)
		)
	}
}

impl From<StorageError> for dial_core::Error {
	fn from(err: StorageError) -> Self {
		match err {
			StorageError::InvalidKey(_) | StorageError::InvalidTtl(_) => {
				dial_core::Error::Validation(err.to_string())
			}
			StorageError::UnsupportedAdapter { .. } | StorageError::MissingClient(_) => {
				dial_core::Error::Configuration(err.to_string())
			}
			StorageError::Io(_) | StorageError::Backend(_) => {
				dial_core::Error::Storage(err.to_string())
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_unsupported_adapter_message() {
		let err = StorageError::UnsupportedAdapter {
			value: "s3".to_string(),
			supported: vec!["file", "redis", "memcached"],
		};

		assert_eq!(
			err.to_string(),
			"Unsupported storage type: s3. Supported adapters: file, redis, memcached"
		);
	}

	#[rstest]
	#[case(StorageError::InvalidKey("abc".into()), true)]
	#[case(StorageError::MissingClient("Redis"), true)]
	#[case(StorageError::InvalidTtl(std::time::Duration::MAX), true)]
	#[case(StorageError::Backend("timeout".into()), false)]
	fn test_is_validation(#[case] err: StorageError, #[case] expected: bool) {
		assert_eq!(err.is_validation(), expected);
	}

	#[rstest]
	fn test_conversion_into_core_error() {
		let err: dial_core::Error = StorageError::Backend("down".into()).into();
		assert!(matches!(err, dial_core::Error::Storage(_)));

		let err: dial_core::Error = StorageError::InvalidKey("abc".into()).into();
		assert!(err.is_validation());
	}
}
