//! # Dial Core
//!
//! Shared building blocks for the Dial request profiler: the error type every
//! crate converts into, and the constants that tie the profiler, the storage
//! layer and the external profile viewer together.

#![warn(missing_docs)]

pub mod constants;
pub mod exception;

pub use exception::{Error, Result};
