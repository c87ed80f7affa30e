//! Panel data and rendering
//!
//! The middleware gathers everything the panel shows into a [`PanelData`]
//! and hands it to a [`PanelRenderer`]. [`HtmlPanelRenderer`] is the
//! default; hosts with their own templates implement the trait.

mod html;
mod route;
mod server_timing;

pub use html::{HtmlPanelRenderer, html_escape, truncate_query};
pub use route::{NoRouteResolver, RouteInfo, RouteResolver, RouteTable};
pub use server_timing::{ServerTimingEntry, parse_server_timing};

use crate::config::DialConfig;
use crate::query_log::QueryLogEntry;
use crate::stats::StatsFamily;
use dial_core::Result;
use dial_core::constants::{NOT_AVAILABLE, PROFILE_VIEWER_URL};
use dial_http::Request;
use dial_storage::ArtifactKey;
use serde::Serialize;
use std::collections::BTreeMap;

/// Route names as displayed, `N/A` when unknown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
	/// View name
	pub view: String,
	/// Action name
	pub action: String,
}

impl From<RouteInfo> for RouteSummary {
	fn from(info: RouteInfo) -> Self {
		Self {
			view: info.view.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
			action: info.action.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
		}
	}
}

impl RouteSummary {
	/// Summary of a route lookup; a failed lookup shows `N/A`
	pub fn from_lookup(lookup: Result<RouteInfo>) -> Self {
		match lookup {
			Ok(info) => info.into(),
			Err(e) => {
				tracing::debug!(error = %e, "Route lookup failed");
				RouteInfo::default().into()
			}
		}
	}
}

/// Everything shown in the panel of one profiled request
#[derive(Debug, Clone, Serialize)]
pub struct PanelData {
	/// Route that handled the request
	pub route: RouteSummary,
	/// Wall time of the downstream call in milliseconds, 2 decimals
	pub request_timing_ms: f64,
	/// Key of the stored profile
	pub profile_key: String,
	/// Endpoint URL serving the stored profile
	pub profile_url: String,
	/// External viewer URL loading the stored profile
	pub viewer_url: String,
	/// Version and environment facts
	pub environment: BTreeMap<String, String>,
	/// Duplicate-query entries
	pub query_logs: Vec<QueryLogEntry>,
	/// Diffed stats, one family per source
	pub stats: Vec<StatsFamily>,
	/// `Server-Timing` events, longest first
	pub server_timing: Vec<ServerTimingEntry>,
	/// Panel toggle key combination
	pub toggle_shortcut_keys: Vec<String>,
	/// Nonce of the inline script
	pub nonce: String,
}

/// Renders panel markup
pub trait PanelRenderer: Send + Sync {
	/// Render `data` into markup inserted before `</body>`
	///
	/// # Errors
	///
	/// A failing renderer leaves the response unmodified.
	fn render(&self, data: &PanelData) -> Result<String>;
}

/// URL of the endpoint serving the profile behind `key`
///
/// # Examples
///
/// ```
/// use dial_middleware::DialConfig;
/// use dial_middleware::panels::profile_url;
/// use dial_http::Request;
/// use dial_storage::ArtifactKey;
///
/// let request = Request::builder()
///     .uri("/posts")
///     .header("host", "localhost:3000")
///     .build()
///     .unwrap();
/// let key = ArtifactKey::parse("0190a1b2-c3d4_vernier").unwrap();
///
/// assert_eq!(
///     profile_url(&request, &DialConfig::default(), &key),
///     "http://localhost:3000/dial/profile?key=0190a1b2-c3d4_vernier"
/// );
/// ```
pub fn profile_url(request: &Request, config: &DialConfig, key: &ArtifactKey) -> String {
	format!("{}{}?key={}", request.base_url(), config.profile_path(), key)
}

/// External viewer URL loading the profile served at `profile_url`
///
/// # Examples
///
/// ```
/// use dial_middleware::panels::viewer_url;
///
/// assert_eq!(
///     viewer_url("http://localhost:3000/dial/profile?key=abc_vernier"),
///     "https://vernier.prof/from-url/http%3A%2F%2Flocalhost%3A3000%2Fdial%2Fprofile%3Fkey%3Dabc_vernier"
/// );
/// ```
pub fn viewer_url(profile_url: &str) -> String {
	let encoded: String = url::form_urlencoded::byte_serialize(profile_url.as_bytes()).collect();
	format!("{}/from-url/{}", PROFILE_VIEWER_URL, encoded)
}

/// Round a duration in milliseconds to 2 decimals
pub fn round_ms(ms: f64) -> f64 {
	(ms * 100.0).round() / 100.0
}
