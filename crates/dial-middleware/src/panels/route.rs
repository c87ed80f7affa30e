//! Route information shown in the panel header

use dial_core::{Error, Result};
use dial_http::{Method, Request};
use regex::Regex;

/// View and action that handled a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteInfo {
	/// Handler, controller or view name
	pub view: Option<String>,
	/// Action within the view
	pub action: Option<String>,
}

/// Looks up the route of a request
///
/// A failing lookup never aborts rendering; the panel shows `N/A` instead.
pub trait RouteResolver: Send + Sync {
	/// Resolve the route of `request`
	///
	/// # Errors
	///
	/// Returns an error when no route matches.
	fn resolve(&self, request: &Request) -> Result<RouteInfo>;
}

/// Resolver for hosts without route information
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRouteResolver;

impl RouteResolver for NoRouteResolver {
	fn resolve(&self, _request: &Request) -> Result<RouteInfo> {
		Ok(RouteInfo::default())
	}
}

struct RouteEntry {
	method: Method,
	pattern: String,
	regex: Regex,
	view: String,
	action: String,
}

/// Ordered table of path patterns
///
/// Patterns use `{name}` placeholders for one path segment. The first entry
/// matching method and path wins.
///
/// # Examples
///
/// ```
/// use dial_middleware::panels::{RouteResolver, RouteTable};
/// use dial_http::{Method, Request};
///
/// let table = RouteTable::new()
///     .route(Method::GET, "/posts", "PostsView", "index")
///     .unwrap()
///     .route(Method::GET, "/posts/{id}", "PostsView", "show")
///     .unwrap();
///
/// let request = Request::builder().uri("/posts/42").build().unwrap();
/// let info = table.resolve(&request).unwrap();
/// assert_eq!(info.action.as_deref(), Some("show"));
/// ```
#[derive(Default)]
pub struct RouteTable {
	entries: Vec<RouteEntry>,
}

impl RouteTable {
	/// Create an empty table
	pub fn new() -> Self {
		Self::default()
	}

	/// Append a route
	///
	/// # Errors
	///
	/// Returns `Error::Configuration` for a malformed placeholder.
	pub fn route(
		mut self,
		method: Method,
		pattern: &str,
		view: impl Into<String>,
		action: impl Into<String>,
	) -> Result<Self> {
		self.entries.push(RouteEntry {
			method,
			pattern: pattern.to_string(),
			regex: compile_pattern(pattern)?,
			view: view.into(),
			action: action.into(),
		});
		Ok(self)
	}

	/// Number of routes
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Whether the table has no routes
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
	let mut regex_str = String::from("^");

	for segment in pattern.split('/').skip(1) {
		regex_str.push('/');
		if let Some(name) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
			if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
				return Err(Error::Configuration(format!(
					"Invalid route placeholder {:?} in {}",
					segment, pattern
				)));
			}
			regex_str.push_str("[^/]+");
		} else {
			regex_str.push_str(&regex::escape(segment));
		}
	}
	regex_str.push('$');

	Regex::new(&regex_str)
		.map_err(|e| Error::Configuration(format!("Invalid route pattern {}: {}", pattern, e)))
}

impl RouteResolver for RouteTable {
	fn resolve(&self, request: &Request) -> Result<RouteInfo> {
		let path = request.path();

		self.entries
			.iter()
			.find(|entry| entry.method == request.method && entry.regex.is_match(path))
			.map(|entry| {
				tracing::trace!(pattern = %entry.pattern, "Resolved route");
				RouteInfo {
					view: Some(entry.view.clone()),
					action: Some(entry.action.clone()),
				}
			})
			.ok_or_else(|| {
				Error::Http(format!("No route matches {} {}", request.method, path))
			})
	}
}
