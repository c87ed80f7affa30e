//! Error types shared by all Dial crates.

use thiserror::Error;

/// Errors raised by the profiling pipeline.
///
/// Crate-specific error enums (storage, body streaming) convert into this
/// type so that middleware and handlers can use a single `Result`.
#[derive(Debug, Error)]
pub enum Error {
	/// Input failed validation before any work was attempted.
	#[error("Validation error: {0}")]
	Validation(String),

	/// Configuration is inconsistent or unsupported.
	#[error("Configuration error: {0}")]
	Configuration(String),

	/// Request or response could not be processed.
	#[error("HTTP error: {0}")]
	Http(String),

	/// The downstream handler failed.
	#[error("Handler error: {0}")]
	Handler(String),

	/// The profiler could not start, stop or serialize its result.
	#[error("Profiler error: {0}")]
	Profiler(String),

	/// An artifact storage backend failed.
	#[error("Storage error: {0}")]
	Storage(String),

	/// Unexpected internal failure.
	#[error("Internal error: {0}")]
	Internal(String),
}

impl Error {
	/// Whether this error stems from bad input rather than a failing backend.
	pub fn is_validation(&self) -> bool {
		matches!(self, Error::Validation(_) | Error::Configuration(_))
	}
}

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;
