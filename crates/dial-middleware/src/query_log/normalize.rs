//! SQL fingerprints for duplicate detection

use regex::Regex;
use std::sync::LazyLock;

static COMMENT_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?m)--.*$").expect("valid regex"));
static BLOCK_COMMENT_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"));
static STRING_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"'([^'\\]|\\.)*'").expect("valid regex"));
static NUMERIC_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\b\d+(\.\d+)?\b").expect("valid regex"));
static PLACEHOLDER_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\$\d+").expect("valid regex"));
static IN_LIST_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\(\s*\?(\s*,\s*\?)*\s*\)").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Collapse runs of whitespace into one space and trim the ends
///
/// # Examples
///
/// ```
/// use dial_middleware::query_log::squish;
///
/// assert_eq!(squish("  SELECT *\n\t FROM posts "), "SELECT * FROM posts");
/// ```
pub fn squish(text: &str) -> String {
	WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Fingerprint a query so that executions differing only in literal values
/// compare equal
///
/// Comments are removed, string and numeric literals and positional
/// placeholders become `?`, literal lists collapse to `(?)`, whitespace is
/// squished and the result is uppercased.
///
/// # Examples
///
/// ```
/// use dial_middleware::query_log::normalize_sql;
///
/// let sql1 = "SELECT * FROM users WHERE id = 123";
/// let sql2 = "SELECT * FROM users WHERE id = 456";
/// assert_eq!(normalize_sql(sql1), normalize_sql(sql2));
/// assert_eq!(normalize_sql(sql1), "SELECT * FROM USERS WHERE ID = ?");
/// ```
pub fn normalize_sql(sql: &str) -> String {
	let sql = COMMENT_RE.replace_all(sql, "");
	let sql = BLOCK_COMMENT_RE.replace_all(&sql, "");
	let sql = STRING_RE.replace_all(&sql, "?");
	let sql = PLACEHOLDER_RE.replace_all(&sql, "?");
	let sql = NUMERIC_RE.replace_all(&sql, "?");
	let sql = IN_LIST_RE.replace_all(&sql, "(?)");

	squish(&sql).to_uppercase()
}
