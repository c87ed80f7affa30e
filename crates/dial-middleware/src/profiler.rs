//! Profiler capability
//!
//! The middleware starts one [`ProfileSession`] per profiled request and
//! hands the finished [`ProfileResult`] to a background task that writes it
//! to storage. Sampling profilers plug in by implementing [`Profiler`];
//! [`WallClockProfiler`] is the built-in implementation.

use chrono::{DateTime, Utc};
use dial_core::{Error, Result};
use serde::Serialize;
use std::io;
use std::time::Instant;

/// Settings handed to the profiler for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilerOptions {
	/// Sampling interval in microseconds
	pub interval_micros: u64,
	/// Allocation sampling interval
	pub allocation_interval: u64,
	/// Named instrumentation hooks to enable
	pub hooks: Vec<String>,
}

impl Default for ProfilerOptions {
	fn default() -> Self {
		Self {
			interval_micros: dial_core::constants::PROFILER_INTERVAL,
			allocation_interval: dial_core::constants::PROFILER_ALLOCATION_INTERVAL,
			hooks: vec!["memory_usage".to_string(), "http".to_string()],
		}
	}
}

/// Starts profiling sessions
pub trait Profiler: Send + Sync {
	/// Start profiling the current request
	///
	/// # Errors
	///
	/// Returns `Error::Profiler` when the profiler cannot start.
	fn begin(&self, options: &ProfilerOptions) -> Result<Box<dyn ProfileSession>>;
}

/// A running profile
pub trait ProfileSession: Send {
	/// Stop profiling and return the raw result
	///
	/// # Errors
	///
	/// Returns `Error::Profiler` when the result cannot be produced.
	fn end(self: Box<Self>) -> Result<Box<dyn ProfileResult>>;
}

/// Raw profiler output, owned so it can move to a background task
pub trait ProfileResult: Send + Sync {
	/// Write the serialized profile to `out`
	fn write(&self, out: &mut dyn io::Write) -> io::Result<()>;

	/// Serialize the profile into memory
	fn to_bytes(&self) -> io::Result<Vec<u8>> {
		let mut buf = Vec::new();
		self.write(&mut buf)?;
		Ok(buf)
	}
}

/// Profiler recording wall-clock bounds of the request
///
/// # Examples
///
/// ```
/// use dial_middleware::profiler::{Profiler, ProfilerOptions, WallClockProfiler};
///
/// let session = WallClockProfiler.begin(&ProfilerOptions::default()).unwrap();
/// let result = session.end().unwrap();
///
/// let json: serde_json::Value = serde_json::from_slice(&result.to_bytes().unwrap()).unwrap();
/// assert_eq!(json["meta"]["interval_micros"], 200);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClockProfiler;

impl Profiler for WallClockProfiler {
	fn begin(&self, options: &ProfilerOptions) -> Result<Box<dyn ProfileSession>> {
		if options.interval_micros == 0 {
			return Err(Error::Profiler(
				"sampling interval must be greater than zero".to_string(),
			));
		}

		Ok(Box::new(WallClockSession {
			options: options.clone(),
			started_at: Utc::now(),
			started: Instant::now(),
		}))
	}
}

struct WallClockSession {
	options: ProfilerOptions,
	started_at: DateTime<Utc>,
	started: Instant,
}

impl ProfileSession for WallClockSession {
	fn end(self: Box<Self>) -> Result<Box<dyn ProfileResult>> {
		let elapsed = self.started.elapsed();

		Ok(Box::new(WallClockProfile {
			meta: ProfileMeta {
				profiler: "dial-wall-clock",
				interval_micros: self.options.interval_micros,
				allocation_interval: self.options.allocation_interval,
				hooks: self.options.hooks,
				started_at: self.started_at,
				finished_at: Utc::now(),
			},
			duration_ms: elapsed.as_secs_f64() * 1_000.0,
			samples: Vec::new(),
		}))
	}
}

#[derive(Debug, Serialize)]
struct ProfileMeta {
	profiler: &'static str,
	interval_micros: u64,
	allocation_interval: u64,
	hooks: Vec<String>,
	started_at: DateTime<Utc>,
	finished_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct WallClockProfile {
	meta: ProfileMeta,
	duration_ms: f64,
	samples: Vec<u64>,
}

impl ProfileResult for WallClockProfile {
	fn write(&self, out: &mut dyn io::Write) -> io::Result<()> {
		serde_json::to_writer(out, self).map_err(io::Error::other)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_profile_document() {
		let options = ProfilerOptions {
			interval_micros: 500,
			allocation_interval: 1_000,
			hooks: vec!["http".to_string()],
		};

		let session = WallClockProfiler.begin(&options).unwrap();
		std::thread::sleep(std::time::Duration::from_millis(2));
		let bytes = session.end().unwrap().to_bytes().unwrap();

		let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
		assert_eq!(json["meta"]["profiler"], "dial-wall-clock");
		assert_eq!(json["meta"]["allocation_interval"], 1_000);
		assert_eq!(json["meta"]["hooks"][0], "http");
		assert!(json["duration_ms"].as_f64().unwrap() >= 2.0);
	}

	#[rstest]
	fn test_zero_interval_is_rejected() {
		let options = ProfilerOptions {
			interval_micros: 0,
			..Default::default()
		};

		let err = WallClockProfiler.begin(&options).err().unwrap();

		assert!(matches!(err, Error::Profiler(_)));
	}
}
