//! Line-oriented parser of duplicate-query logs
//!
//! ```text
//! N+1 queries detected:          -> starts an entry
//!   SELECT ... WHERE id = 1      -> first query kept verbatim
//!   SELECT ... WHERE id = 2      -> counted
//! Call stack:                    -> "+ 1 more queries" appended
//!   app/models/post.rs:42        -> frame
//!                                -> blank line closes the entry
//! ```
//!
//! Marker lines are recognised anywhere in the line, so prefixes added by a
//! logger (timestamps, levels) do not matter. An entry whose call stack is
//! never closed by a blank line is not emitted.

use serde::Serialize;

const ENTRY_MARKER: &str = "N+1 queries detected";
const CALL_STACK_MARKER: &str = "Call stack";

/// One detected group of repeated queries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryLogEntry {
	/// First query verbatim, then a `+ N more queries` summary when repeated
	pub queries: Vec<String>,
	/// Call stack frames that issued the queries
	pub call_stack: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
	Idle,
	Queries,
	CallStack,
}

/// Incremental parser, fed one line at a time
#[derive(Debug)]
pub struct QueryLogParser {
	section: Section,
	entry: Option<QueryLogEntry>,
	count: usize,
	entries: Vec<QueryLogEntry>,
}

impl Default for QueryLogParser {
	fn default() -> Self {
		Self::new()
	}
}

impl QueryLogParser {
	/// Create a parser in the idle state
	pub fn new() -> Self {
		Self {
			section: Section::Idle,
			entry: None,
			count: 0,
			entries: Vec::new(),
		}
	}

	/// Feed one line, with or without its trailing newline
	pub fn feed_line(&mut self, line: &str) {
		if line.contains(ENTRY_MARKER) {
			// An unterminated entry is dropped when the next one starts.
			self.entry = Some(QueryLogEntry::default());
			self.section = Section::Queries;
			self.count = 0;
			return;
		}

		if line.contains(CALL_STACK_MARKER) {
			if let Some(entry) = self.entry.as_mut() {
				if self.count > 1 {
					entry.queries.push(format!("+ {} more queries", self.count - 1));
				}
				self.section = Section::CallStack;
			}
			return;
		}

		let Some(entry) = self.entry.as_mut() else {
			return;
		};
		let trimmed = line.trim();

		match self.section {
			Section::Idle => {}
			Section::Queries => {
				self.count += 1;
				if self.count == 1 {
					entry.queries.push(trimmed.to_string());
				}
			}
			Section::CallStack if trimmed.is_empty() => {
				if let Some(entry) = self.entry.take() {
					self.entries.push(entry);
				}
				self.section = Section::Idle;
			}
			Section::CallStack => entry.call_stack.push(trimmed.to_string()),
		}
	}

	/// Feed a block of text, line by line
	pub fn feed(&mut self, text: &str) {
		for line in text.lines() {
			self.feed_line(line);
		}
	}

	/// Completed entries, in the order their markers appeared
	pub fn finish(self) -> Vec<QueryLogEntry> {
		self.entries
	}
}

/// Parse a complete log text
///
/// # Examples
///
/// ```
/// use dial_middleware::query_log::parse_query_log;
///
/// let entries = parse_query_log("N+1 queries detected\nQ1\nQ1\nQ1\nCall stack\nframe1\nframe2\n\n");
///
/// assert_eq!(entries.len(), 1);
/// assert_eq!(entries[0].queries, vec!["Q1", "+ 2 more queries"]);
/// assert_eq!(entries[0].call_stack, vec!["frame1", "frame2"]);
/// ```
pub fn parse_query_log(text: &str) -> Vec<QueryLogEntry> {
	let mut parser = QueryLogParser::new();
	parser.feed(text);
	parser.finish()
}
