//! Retrieval of stored profiles
//!
//! `GET <mount_path>/profile?key=<artifact key>` returns the stored profile
//! as JSON so the external viewer can load it cross-origin.

use async_trait::async_trait;
use dial_core::Result;
use dial_core::constants::PROFILE_VIEWER_URL;
use dial_http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW, HeaderValue};
use dial_http::{Handler, Method, Middleware, Request, Response, StatusCode};
use dial_storage::{ArtifactKey, Storage};
use std::sync::Arc;

/// Handler serving stored profiles
///
/// | Outcome                | Status | Body                    |
/// |------------------------|--------|-------------------------|
/// | missing or invalid key | 400    | `Bad Request`           |
/// | stored profile         | 200    | profile JSON            |
/// | no profile under key   | 404    | `Not Found`             |
/// | storage failure        | 500    | `Internal Server Error` |
#[derive(Debug, Clone)]
pub struct ProfileEndpoint {
	storage: Arc<Storage>,
}

impl ProfileEndpoint {
	/// Serve profiles from `storage`
	pub fn new(storage: Arc<Storage>) -> Self {
		Self { storage }
	}

	fn plain(response: Response, text: &'static str) -> Response {
		response.with_content_type("text/plain").with_body(text)
	}
}

#[async_trait]
impl Handler for ProfileEndpoint {
	async fn handle(&self, request: Request) -> Result<Response> {
		if request.method != Method::GET && request.method != Method::HEAD {
			return Ok(Self::plain(
				Response::new(StatusCode::METHOD_NOT_ALLOWED),
				"Method Not Allowed",
			)
			.with_typed_header(ALLOW, HeaderValue::from_static("GET, HEAD")));
		}

		let Some(key) = request
			.query_param("key")
			.and_then(|key| ArtifactKey::parse(key).ok())
		else {
			return Ok(Self::plain(Response::bad_request(), "Bad Request"));
		};

		let storage_key = key.profile_storage_key();
		match self.storage.fetch(storage_key.as_str()).await {
			Ok(Some(data)) => Ok(Response::ok()
				.with_content_type("application/json")
				.with_typed_header(
					ACCESS_CONTROL_ALLOW_ORIGIN,
					HeaderValue::from_static(PROFILE_VIEWER_URL),
				)
				.with_body(data)),
			Ok(None) => Ok(Self::plain(Response::not_found(), "Not Found")),
			Err(e) => {
				tracing::error!(key = %storage_key, error = %e, "Failed to fetch profile");
				Ok(Self::plain(
					Response::internal_server_error(),
					"Internal Server Error",
				))
			}
		}
	}
}

/// Middleware answering requests for the profile path itself
///
/// Requests for any other path go to the next handler.
#[derive(Debug, Clone)]
pub struct ProfileRoute {
	path: String,
	endpoint: ProfileEndpoint,
}

impl ProfileRoute {
	/// Serve `endpoint` at `path`
	pub fn new(path: impl Into<String>, endpoint: ProfileEndpoint) -> Self {
		Self {
			path: path.into(),
			endpoint,
		}
	}

	/// The path served by the endpoint
	pub fn path(&self) -> &str {
		&self.path
	}
}

#[async_trait]
impl Middleware for ProfileRoute {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		if request.path() == self.path {
			return self.endpoint.handle(request).await;
		}
		next.handle(request).await
	}
}
