//! Incoming HTTP requests

mod methods;
mod params;

use crate::extensions::Extensions;
use bytes::Bytes;
use dial_core::{Error, Result};
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, Uri, Version};
use std::collections::HashMap;

/// HTTP Request representation
#[derive(Debug, Clone)]
pub struct Request {
	/// Request method
	pub method: Method,
	/// Request target
	pub uri: Uri,
	/// Protocol version
	pub version: Version,
	/// Request headers
	pub headers: HeaderMap,
	/// Buffered request body
	pub body: Bytes,
	/// Whether the connection itself is TLS
	pub is_secure: bool,
	/// Per-request values shared along the middleware chain
	pub extensions: Extensions,
	query_params: HashMap<String, String>,
}

impl Request {
	/// Start building a request
	///
	/// # Examples
	///
	/// ```
	/// use dial_http::{Method, Request};
	///
	/// let request = Request::builder()
	///     .method(Method::GET)
	///     .uri("/posts?page=2")
	///     .header("accept", "text/html")
	///     .build()
	///     .unwrap();
	///
	/// assert_eq!(request.path(), "/posts");
	/// assert_eq!(request.query_param("page"), Some("2"));
	/// ```
	pub fn builder() -> RequestBuilder {
		RequestBuilder::default()
	}
}

/// Builder for [`Request`]
#[derive(Debug, Default)]
pub struct RequestBuilder {
	method: Method,
	uri: Option<String>,
	version: Version,
	headers: HeaderMap,
	body: Bytes,
	is_secure: bool,
	invalid_header: Option<String>,
}

impl RequestBuilder {
	/// Set the request method
	pub fn method(mut self, method: Method) -> Self {
		self.method = method;
		self
	}

	/// Set the request target, validated by [`RequestBuilder::build`]
	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = Some(uri.into());
		self
	}

	/// Set the protocol version
	pub fn version(mut self, version: Version) -> Self {
		self.version = version;
		self
	}

	/// Replace all headers
	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;
		self
	}

	/// Append a single header
	pub fn header(mut self, name: &str, value: &str) -> Self {
		match (
			HeaderName::from_bytes(name.as_bytes()),
			HeaderValue::from_str(value),
		) {
			(Ok(name), Ok(value)) => {
				self.headers.append(name, value);
			}
			_ => {
				self.invalid_header.get_or_insert_with(|| name.to_string());
			}
		}
		self
	}

	/// Set the buffered body
	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Mark the connection as TLS
	pub fn secure(mut self, is_secure: bool) -> Self {
		self.is_secure = is_secure;
		self
	}

	/// Validate and assemble the request
	pub fn build(self) -> Result<Request> {
		if let Some(name) = self.invalid_header {
			return Err(Error::Http(format!("Invalid header: {}", name)));
		}

		let uri = match self.uri {
			Some(uri) => uri
				.parse::<Uri>()
				.map_err(|e| Error::Http(format!("Invalid URI '{}': {}", uri, e)))?,
			None => Uri::from_static("/"),
		};
		let query_params = Request::parse_query_params(&uri);

		Ok(Request {
			method: self.method,
			uri,
			version: self.version,
			headers: self.headers,
			body: self.body,
			is_secure: self.is_secure,
			extensions: Extensions::new(),
			query_params,
		})
	}
}
