//! Duplicate-query scanner
//!
//! Handlers report executed SQL through the [`QueryRecorder`] found in the
//! request's extensions while a scan is active. At scan end, executions with
//! the same fingerprint and the same call stack are reported as one N+1
//! group in the log format understood by the parser.

use super::QueryLogSink;
use super::normalize::{normalize_sql, squish};
use crate::config::DialConfig;
use dial_core::Result;
use dial_http::{Extensions, Request};
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

/// One executed query and the frames that issued it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedQuery {
	/// SQL text as executed
	pub sql: String,
	/// Innermost frame first
	pub call_stack: Vec<String>,
}

/// Collects the queries executed while handling one request
///
/// # Examples
///
/// ```
/// use dial_middleware::query_log::QueryRecorder;
/// use dial_http::Request;
///
/// let request = Request::builder().uri("/").build().unwrap();
/// request.extensions.insert(QueryRecorder::new());
///
/// // Inside the handler:
/// if let Some(recorder) = QueryRecorder::from_request(&request) {
///     recorder.record("SELECT * FROM posts WHERE id = 1", ["posts.rs:12"]);
/// }
///
/// assert_eq!(QueryRecorder::from_request(&request).unwrap().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryRecorder {
	queries: Arc<Mutex<Vec<RecordedQuery>>>,
}

impl QueryRecorder {
	/// Create an empty recorder
	pub fn new() -> Self {
		Self::default()
	}

	/// The recorder of the scan active for `request`, if any
	pub fn from_request(request: &Request) -> Option<Self> {
		request.extensions.get::<QueryRecorder>()
	}

	/// Record one executed query
	pub fn record<I, S>(&self, sql: impl Into<String>, call_stack: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.queries.lock().push(RecordedQuery {
			sql: sql.into(),
			call_stack: call_stack.into_iter().map(Into::into).collect(),
		});
	}

	/// Number of recorded queries
	pub fn len(&self) -> usize {
		self.queries.lock().len()
	}

	/// Whether nothing was recorded
	pub fn is_empty(&self) -> bool {
		self.queries.lock().is_empty()
	}

	/// Take every recorded query
	pub fn take(&self) -> Vec<RecordedQuery> {
		std::mem::take(&mut *self.queries.lock())
	}
}

/// Starts duplicate-query scans
pub trait QueryScanner: Send + Sync {
	/// Start scanning the queries of `request`
	fn begin_scan(&self, request: &Request) -> Box<dyn ScanSession>;
}

/// An active scan
pub trait ScanSession: Send {
	/// Stop scanning and write findings to `sink`
	fn end_scan(self: Box<Self>, sink: &QueryLogSink);
}

/// Scanner reporting repeated queries from the same call stack
#[derive(Debug, Clone, Default)]
pub struct DuplicateQueryScanner {
	ignored: Arc<Vec<Regex>>,
}

impl DuplicateQueryScanner {
	/// Create a scanner skipping queries that match any of `ignored`
	pub fn new(ignored: Vec<Regex>) -> Self {
		Self {
			ignored: Arc::new(ignored),
		}
	}

	/// Create a scanner with the configured ignore patterns
	pub fn from_config(config: &DialConfig) -> Result<Self> {
		Ok(Self::new(config.ignored_query_regexes()?))
	}
}

impl QueryScanner for DuplicateQueryScanner {
	fn begin_scan(&self, request: &Request) -> Box<dyn ScanSession> {
		let recorder = QueryRecorder::new();
		request.extensions.insert(recorder.clone());

		Box::new(DuplicateScan {
			recorder,
			extensions: request.extensions.clone(),
			ignored: self.ignored.clone(),
		})
	}
}

struct DuplicateScan {
	recorder: QueryRecorder,
	extensions: Extensions,
	ignored: Arc<Vec<Regex>>,
}

impl DuplicateScan {
	fn is_ignored(&self, sql: &str) -> bool {
		self.ignored.iter().any(|re| re.is_match(sql))
	}
}

impl ScanSession for DuplicateScan {
	fn end_scan(self: Box<Self>, sink: &QueryLogSink) {
		self.extensions.remove::<QueryRecorder>();

		let mut index: HashMap<(String, Vec<String>), usize> = HashMap::new();
		let mut groups: Vec<Vec<RecordedQuery>> = Vec::new();

		for query in self.recorder.take() {
			if self.is_ignored(&query.sql) {
				continue;
			}
			let key = (normalize_sql(&query.sql), query.call_stack.clone());
			match index.get(&key) {
				Some(&i) => groups[i].push(query),
				None => {
					index.insert(key, groups.len());
					groups.push(vec![query]);
				}
			}
		}

		for group in groups.iter().filter(|group| group.len() > 1) {
			sink.write_line("N+1 queries detected:");
			for query in group {
				sink.write_line(&format!("  {}", squish(&query.sql)));
			}
			sink.write_line("Call stack:");
			for frame in &group[0].call_stack {
				sink.write_line(&format!("  {}", frame));
			}
			sink.write_line("");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::query_log::parse_query_log;
	use rstest::{fixture, rstest};

	#[fixture]
	fn request() -> Request {
		Request::builder().uri("/posts").build().unwrap()
	}

	fn scan(scanner: &DuplicateQueryScanner, request: &Request, queries: &[(&str, Vec<&str>)]) -> String {
		let session = scanner.begin_scan(request);
		let recorder = QueryRecorder::from_request(request).unwrap();
		for (sql, stack) in queries {
			recorder.record(*sql, stack.iter().copied());
		}
		let sink = QueryLogSink::new();
		session.end_scan(&sink);
		sink.drain()
	}

	#[rstest]
	fn test_repeated_queries_are_reported(request: Request) {
		let scanner = DuplicateQueryScanner::default();

		let log = scan(
			&scanner,
			&request,
			&[
				("SELECT * FROM authors WHERE id = 1", vec!["posts.rs:10", "handler.rs:3"]),
				("SELECT *\n  FROM authors WHERE id = 2", vec!["posts.rs:10", "handler.rs:3"]),
				("SELECT * FROM settings", vec!["handler.rs:1"]),
			],
		);

		assert_eq!(
			log,
			"N+1 queries detected:\n  SELECT * FROM authors WHERE id = 1\n  SELECT * FROM authors WHERE id = 2\nCall stack:\n  posts.rs:10\n  handler.rs:3\n\n"
		);
		let entries = parse_query_log(&log);
		assert_eq!(entries[0].queries[1], "+ 1 more queries");
	}

	#[rstest]
	fn test_same_query_from_different_stacks_is_not_grouped(request: Request) {
		let scanner = DuplicateQueryScanner::default();

		let log = scan(
			&scanner,
			&request,
			&[
				("SELECT * FROM users WHERE id = 1", vec!["a.rs:1"]),
				("SELECT * FROM users WHERE id = 2", vec!["b.rs:1"]),
			],
		);

		assert!(log.is_empty());
	}

	#[rstest]
	fn test_ignored_queries_are_skipped(request: Request) {
		let scanner =
			DuplicateQueryScanner::from_config(&DialConfig::default()).unwrap();

		let log = scan(
			&scanner,
			&request,
			&[
				("SELECT version FROM schema_migrations", vec!["boot.rs:1"]),
				("SELECT version FROM SCHEMA_MIGRATIONS", vec!["boot.rs:1"]),
			],
		);

		assert!(log.is_empty());
	}

	#[rstest]
	fn test_recorder_is_removed_after_scan(request: Request) {
		let scanner = DuplicateQueryScanner::default();

		let session = scanner.begin_scan(&request);
		assert!(QueryRecorder::from_request(&request).is_some());

		session.end_scan(&QueryLogSink::new());
		assert!(QueryRecorder::from_request(&request).is_none());
	}

	#[rstest]
	fn test_groups_are_written_in_first_seen_order(request: Request) {
		let scanner = DuplicateQueryScanner::default();

		let log = scan(
			&scanner,
			&request,
			&[
				("SELECT * FROM b WHERE id = 1", vec!["b.rs:1"]),
				("SELECT * FROM a WHERE id = 1", vec!["a.rs:1"]),
				("SELECT * FROM a WHERE id = 2", vec!["a.rs:1"]),
				("SELECT * FROM b WHERE id = 2", vec!["b.rs:1"]),
			],
		);

		let entries = parse_query_log(&log);
		assert_eq!(entries[0].call_stack, vec!["b.rs:1"]);
		assert_eq!(entries[1].call_stack, vec!["a.rs:1"]);
	}
}
