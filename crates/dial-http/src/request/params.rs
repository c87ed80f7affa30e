use super::Request;
use hyper::Uri;
use hyper::header::CONTENT_TYPE;
use std::collections::HashMap;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

impl Request {
	/// Parse URL-decoded query parameters from URI
	///
	/// A repeated key keeps its last value. A malformed query string yields
	/// no parameters.
	pub(super) fn parse_query_params(uri: &Uri) -> HashMap<String, String> {
		uri.query()
			.map(Self::parse_urlencoded)
			.unwrap_or_default()
	}

	fn parse_urlencoded(input: &str) -> HashMap<String, String> {
		serde_urlencoded::from_str::<Vec<(String, String)>>(input)
			.map(|pairs| pairs.into_iter().collect())
			.unwrap_or_default()
	}

	/// Get the request path
	pub fn path(&self) -> &str {
		self.uri.path()
	}

	/// Get the decoded query parameters
	pub fn query_params(&self) -> &HashMap<String, String> {
		&self.query_params
	}

	/// Get a single decoded query parameter
	pub fn query_param(&self, name: &str) -> Option<&str> {
		self.query_params.get(name).map(String::as_str)
	}

	/// Parse an url-encoded form body
	///
	/// Returns an empty map unless the request declares
	/// `application/x-www-form-urlencoded`.
	///
	/// # Examples
	///
	/// ```
	/// use dial_http::{Method, Request};
	///
	/// let request = Request::builder()
	///     .method(Method::POST)
	///     .uri("/comments")
	///     .header("content-type", "application/x-www-form-urlencoded")
	///     .body("dial_force=1&text=hello+world")
	///     .build()
	///     .unwrap();
	///
	/// let form = request.form_params();
	/// assert_eq!(form.get("text"), Some(&"hello world".to_string()));
	/// ```
	pub fn form_params(&self) -> HashMap<String, String> {
		let is_form = self
			.headers
			.get(CONTENT_TYPE)
			.and_then(|h| h.to_str().ok())
			.map(|ct| ct.to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE))
			.unwrap_or(false);

		if !is_form {
			return HashMap::new();
		}

		std::str::from_utf8(&self.body)
			.map(Self::parse_urlencoded)
			.unwrap_or_default()
	}

	/// Look up a parameter in the query string or the form body
	///
	/// A form value takes precedence over a query value of the same name.
	pub fn param(&self, name: &str) -> Option<String> {
		self.form_params()
			.remove(name)
			.or_else(|| self.query_param(name).map(str::to_string))
	}
}

#[cfg(test)]
mod tests {
	use crate::Request;
	use hyper::Method;
	use rstest::rstest;

	#[rstest]
	#[case("/?a=1&b=2", "a", Some("1"))]
	#[case("/?name=John%20Doe", "name", Some("John Doe"))]
	#[case("/?token=abc%3D%3D", "token", Some("abc=="))]
	#[case("/?flag", "flag", Some(""))]
	#[case("/", "a", None)]
	fn test_query_param(#[case] uri: &str, #[case] name: &str, #[case] expected: Option<&str>) {
		let request = Request::builder().uri(uri).build().unwrap();

		assert_eq!(request.query_param(name), expected);
	}

	#[rstest]
	fn test_form_params_require_form_content_type() {
		let request = Request::builder()
			.method(Method::POST)
			.header("content-type", "application/json")
			.body("a=1")
			.build()
			.unwrap();

		assert!(request.form_params().is_empty());
	}

	#[rstest]
	fn test_param_prefers_form_value() {
		let request = Request::builder()
			.method(Method::POST)
			.uri("/?mode=query&only_query=1")
			.header("content-type", "application/x-www-form-urlencoded; charset=utf-8")
			.body("mode=form")
			.build()
			.unwrap();

		assert_eq!(request.param("mode"), Some("form".to_string()));
		assert_eq!(request.param("only_query"), Some("1".to_string()));
		assert_eq!(request.param("missing"), None);
	}
}
