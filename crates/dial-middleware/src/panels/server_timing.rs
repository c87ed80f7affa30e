//! `Server-Timing` response header

use dial_http::HeaderMap;
use serde::Serialize;

/// One timed event reported by the application
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerTimingEntry {
	/// Metric name
	pub event: String,
	/// Duration in milliseconds, 0 when not reported
	pub duration_ms: f64,
}

/// Parse every `Server-Timing` header, longest duration first
///
/// # Examples
///
/// ```
/// use dial_middleware::panels::parse_server_timing;
/// use dial_http::HeaderMap;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("server-timing", "db;dur=12.5, render;dur=40;desc=\"View\", cache".parse().unwrap());
///
/// let timings = parse_server_timing(&headers);
/// assert_eq!(timings[0].event, "render");
/// assert_eq!(timings[1].duration_ms, 12.5);
/// assert_eq!(timings[2].event, "cache");
/// ```
pub fn parse_server_timing(headers: &HeaderMap) -> Vec<ServerTimingEntry> {
	let mut entries: Vec<ServerTimingEntry> = headers
		.get_all("server-timing")
		.iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(|value| value.split(','))
		.filter_map(parse_metric)
		.collect();

	entries.sort_by(|a, b| b.duration_ms.total_cmp(&a.duration_ms));
	entries
}

fn parse_metric(metric: &str) -> Option<ServerTimingEntry> {
	let mut params = metric.split(';').map(str::trim);
	let event = params.next().filter(|name| !name.is_empty())?;

	let duration_ms = params
		.filter_map(|param| param.split_once('='))
		.find(|(key, _)| key.trim().eq_ignore_ascii_case("dur"))
		.and_then(|(_, value)| value.trim().trim_matches('"').parse::<f64>().ok())
		.unwrap_or(0.0);

	Some(ServerTimingEntry {
		event: event.to_string(),
		duration_ms,
	})
}
