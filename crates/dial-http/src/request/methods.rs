use super::Request;
use hyper::header::{ACCEPT, HOST};

impl Request {
	/// Returns true if the request was made over HTTPS
	///
	/// Either the connection itself is TLS, or a reverse proxy reported
	/// `https` through `X-Forwarded-Proto`.
	pub fn is_secure(&self) -> bool {
		if self.is_secure {
			return true;
		}

		self.header("x-forwarded-proto")
			.map(|proto| proto.eq_ignore_ascii_case("https"))
			.unwrap_or(false)
	}

	/// Returns the scheme of the request (http or https)
	///
	/// # Examples
	///
	/// ```
	/// use dial_http::Request;
	///
	/// let request = Request::builder().uri("/").secure(true).build().unwrap();
	/// assert_eq!(request.scheme(), "https");
	///
	/// let request = Request::builder().uri("/").build().unwrap();
	/// assert_eq!(request.scheme(), "http");
	/// ```
	pub fn scheme(&self) -> &str {
		if self.is_secure() { "https" } else { "http" }
	}

	/// Get the host, from the `Host` header or the request target
	pub fn host(&self) -> Option<String> {
		self.header(HOST.as_str())
			.map(str::to_string)
			.or_else(|| self.uri.authority().map(|a| a.to_string()))
	}

	/// `scheme://host` of the request, `localhost` when no host is known
	///
	/// # Examples
	///
	/// ```
	/// use dial_http::Request;
	///
	/// let request = Request::builder()
	///     .uri("/posts")
	///     .header("host", "example.com:3000")
	///     .build()
	///     .unwrap();
	///
	/// assert_eq!(request.base_url(), "http://example.com:3000");
	/// ```
	pub fn base_url(&self) -> String {
		let host = self.host().unwrap_or_else(|| "localhost".to_string());
		format!("{}://{}", self.scheme(), host)
	}

	/// Get a header value as a string
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|h| h.to_str().ok())
	}

	/// Whether the `Accept` header mentions the given media type
	pub fn accepts(&self, media_type: &str) -> bool {
		self.headers
			.get_all(ACCEPT)
			.iter()
			.filter_map(|h| h.to_str().ok())
			.any(|accept| {
				accept
					.to_ascii_lowercase()
					.contains(&media_type.to_ascii_lowercase())
			})
	}
}
