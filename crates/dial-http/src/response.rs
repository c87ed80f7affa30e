use crate::body::{Body, BodyError};
use bytes::Bytes;
use futures::stream::Stream;
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderName, HeaderValue};
use hyper::{HeaderMap, StatusCode};

/// HTTP Response representation
///
/// The body may be buffered or streamed; see [`Body`].
#[derive(Debug)]
pub struct Response {
	/// Response status
	pub status: StatusCode,
	/// Response headers
	pub headers: HeaderMap,
	/// Response body, consumed at most once
	pub body: Body,
}

impl Response {
	/// Create a new Response with the given status code
	///
	/// # Examples
	///
	/// ```
	/// use dial_http::{Response, StatusCode};
	///
	/// let response = Response::new(StatusCode::OK);
	/// assert_eq!(response.status, StatusCode::OK);
	/// assert_eq!(response.body.size_hint(), Some(0));
	/// ```
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Body::empty(),
		}
	}

	/// Create a Response with HTTP 200 OK status
	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	/// Create a Response with HTTP 400 Bad Request status
	pub fn bad_request() -> Self {
		Self::new(StatusCode::BAD_REQUEST)
	}

	/// Create a Response with HTTP 404 Not Found status
	pub fn not_found() -> Self {
		Self::new(StatusCode::NOT_FOUND)
	}

	/// Create a Response with HTTP 500 Internal Server Error status
	pub fn internal_server_error() -> Self {
		Self::new(StatusCode::INTERNAL_SERVER_ERROR)
	}

	/// Set the response body
	///
	/// # Examples
	///
	/// ```
	/// use dial_http::Response;
	///
	/// let response = Response::ok().with_body("Hello, World!");
	/// assert_eq!(response.body.as_bytes().unwrap(), "Hello, World!");
	/// ```
	pub fn with_body(mut self, body: impl Into<Body>) -> Self {
		self.body = body.into();
		self
	}

	/// Set a streaming response body
	pub fn with_stream<S>(self, stream: S) -> Self
	where
		S: Stream<Item = Result<Bytes, BodyError>> + Send + 'static,
	{
		self.with_body(Body::from_stream(stream))
	}

	/// Add a custom header to the response
	///
	/// Invalid names or values are ignored.
	///
	/// # Examples
	///
	/// ```
	/// use dial_http::Response;
	///
	/// let response = Response::ok().with_header("X-Custom-Header", "custom-value");
	/// assert_eq!(
	///     response.headers.get("X-Custom-Header").unwrap().to_str().unwrap(),
	///     "custom-value"
	/// );
	/// ```
	pub fn with_header(mut self, name: &str, value: &str) -> Self {
		if let Ok(header_name) = HeaderName::from_bytes(name.as_bytes())
			&& let Ok(header_value) = HeaderValue::from_str(value)
		{
			self.headers.insert(header_name, header_value);
		}
		self
	}

	/// Add a custom header using typed HeaderName and HeaderValue
	pub fn with_typed_header(mut self, key: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(key, value);
		self
	}

	/// Set the `Content-Type` header
	pub fn with_content_type(self, media_type: &str) -> Self {
		self.with_header(CONTENT_TYPE.as_str(), media_type)
	}

	/// The `Content-Type` header, when present and readable
	pub fn content_type(&self) -> Option<&str> {
		self.headers.get(CONTENT_TYPE).and_then(|h| h.to_str().ok())
	}

	/// Whether the response declares an HTML document
	///
	/// # Examples
	///
	/// ```
	/// use dial_http::Response;
	///
	/// let response = Response::ok().with_content_type("text/html; charset=utf-8");
	/// assert!(response.is_html());
	///
	/// let response = Response::ok().with_content_type("application/json");
	/// assert!(!response.is_html());
	/// ```
	pub fn is_html(&self) -> bool {
		self.content_type()
			.map(|ct| ct.to_ascii_lowercase().contains("text/html"))
			.unwrap_or(false)
	}

	/// Set `Content-Length` from a buffered body, drop it for a streaming one
	pub fn sync_content_length(&mut self) {
		match self.body.size_hint() {
			Some(len) => {
				self.headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
			}
			None => {
				self.headers.remove(CONTENT_LENGTH);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::stream;
	use rstest::rstest;

	#[rstest]
	fn test_invalid_header_is_ignored() {
		let response = Response::ok().with_header("bad header", "x");

		assert!(response.headers.is_empty());
	}

	#[rstest]
	fn test_sync_content_length_for_full_body() {
		let mut response = Response::ok().with_body("12345");

		response.sync_content_length();

		assert_eq!(response.headers.get(CONTENT_LENGTH).unwrap(), "5");
	}

	#[rstest]
	fn test_sync_content_length_for_stream() {
		let mut response = Response::ok()
			.with_header("content-length", "99")
			.with_stream(stream::iter(vec![Ok(Bytes::from_static(b"chunk"))]));

		response.sync_content_length();

		assert!(response.headers.get(CONTENT_LENGTH).is_none());
	}
}
