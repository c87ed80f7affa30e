//! Duplicate-query logs
//!
//! During a profiled request a [`QueryScanner`] writes free-text log lines
//! to the request's [`QueryLogSink`]. When the request finishes, the sink is
//! drained and the text is parsed into [`QueryLogEntry`] values for the
//! panel. The sink is created per request and passed explicitly, so
//! concurrent requests never see each other's entries.

mod normalize;
mod parser;
mod scanner;

pub use normalize::{normalize_sql, squish};
pub use parser::{QueryLogEntry, QueryLogParser, parse_query_log};
pub use scanner::{DuplicateQueryScanner, QueryRecorder, QueryScanner, RecordedQuery, ScanSession};

use parking_lot::Mutex;
use std::sync::Arc;

/// Per-request buffer the scanner writes its log text to
#[derive(Debug, Clone, Default)]
pub struct QueryLogSink {
	buffer: Arc<Mutex<String>>,
}

impl QueryLogSink {
	/// Create an empty sink
	pub fn new() -> Self {
		Self::default()
	}

	/// Append raw log text
	pub fn write(&self, text: &str) {
		self.buffer.lock().push_str(text);
	}

	/// Append one line, adding the newline
	pub fn write_line(&self, line: &str) {
		let mut buffer = self.buffer.lock();
		buffer.push_str(line);
		buffer.push('\n');
	}

	/// Take the accumulated text, leaving the sink empty
	pub fn drain(&self) -> String {
		std::mem::take(&mut *self.buffer.lock())
	}

	/// Drain the sink and parse its text
	///
	/// # Examples
	///
	/// ```
	/// use dial_middleware::query_log::QueryLogSink;
	///
	/// let sink = QueryLogSink::new();
	/// sink.write("N+1 queries detected:\n  SELECT 1\n  SELECT 1\nCall stack:\n  app.rs:10\n\n");
	///
	/// let entries = sink.drain_entries();
	/// assert_eq!(entries[0].queries, vec!["SELECT 1", "+ 1 more queries"]);
	/// assert!(sink.drain().is_empty());
	/// ```
	pub fn drain_entries(&self) -> Vec<QueryLogEntry> {
		parse_query_log(&self.drain())
	}
}
