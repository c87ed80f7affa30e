//! Middleware and handler traits for HTTP request processing.
//!
//! ## Handler
//!
//! The `Handler` trait is the application being wrapped:
//!
//! ```rust
//! use dial_http::{Handler, Request, Response};
//! use async_trait::async_trait;
//!
//! struct Page;
//!
//! #[async_trait]
//! impl Handler for Page {
//!     async fn handle(&self, _request: Request) -> dial_http::Result<Response> {
//!         Ok(Response::ok()
//!             .with_content_type("text/html")
//!             .with_body("<html><body>Hi</body></html>"))
//!     }
//! }
//! ```
//!
//! ## Middleware
//!
//! Middleware wraps a handler and may rewrite the response on its way out:
//!
//! ```rust
//! use dial_http::{Handler, Middleware, Request, Response};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Tagging;
//!
//! #[async_trait]
//! impl Middleware for Tagging {
//!     async fn process(&self, request: Request, next: Arc<dyn Handler>) -> dial_http::Result<Response> {
//!         let response = next.handle(request).await?;
//!         Ok(response.with_header("x-tagged", "1"))
//!     }
//! }
//! ```

use async_trait::async_trait;
use dial_core::Result;
use std::sync::Arc;

use crate::{Request, Response};

/// Handler trait for processing requests.
#[async_trait]
pub trait Handler: Send + Sync {
	/// Handles an HTTP request and produces a response.
	///
	/// # Errors
	///
	/// Returns an error if the request cannot be processed.
	async fn handle(&self, request: Request) -> Result<Response>;
}

#[async_trait]
impl<T: Handler + ?Sized> Handler for Arc<T> {
	async fn handle(&self, request: Request) -> Result<Response> {
		(**self).handle(request).await
	}
}

/// Middleware trait for request/response processing.
#[async_trait]
pub trait Middleware: Send + Sync {
	/// Processes a request through this middleware.
	///
	/// # Arguments
	///
	/// * `request` - The incoming HTTP request
	/// * `next` - The next handler in the chain to call
	///
	/// # Errors
	///
	/// Returns an error if the middleware or next handler fails.
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response>;

	/// Whether this middleware runs for the given request.
	///
	/// Skipped middleware is bypassed entirely. Defaults to `true`.
	fn should_continue(&self, _request: &Request) -> bool {
		true
	}
}

/// Middleware chain - composes multiple middleware into a single handler.
///
/// The first middleware added is the outermost one.
pub struct MiddlewareChain {
	middlewares: Vec<Arc<dyn Middleware>>,
	handler: Arc<dyn Handler>,
}

impl MiddlewareChain {
	/// Creates a new middleware chain around the given handler.
	pub fn new(handler: Arc<dyn Handler>) -> Self {
		Self {
			middlewares: Vec::new(),
			handler,
		}
	}

	/// Adds a middleware to the chain using builder pattern.
	pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
		self.middlewares.push(middleware);
		self
	}

	/// Adds a middleware to the chain.
	pub fn add_middleware(&mut self, middleware: Arc<dyn Middleware>) {
		self.middlewares.push(middleware);
	}
}

#[async_trait]
impl Handler for MiddlewareChain {
	async fn handle(&self, request: Request) -> Result<Response> {
		let mut current_handler = self.handler.clone();

		let active_middlewares: Vec<_> = self
			.middlewares
			.iter()
			.rev()
			.filter(|mw| mw.should_continue(&request))
			.collect();

		for middleware in active_middlewares {
			current_handler = Arc::new(ComposedHandler {
				middleware: middleware.clone(),
				next: current_handler,
			});
		}

		current_handler.handle(request).await
	}
}

struct ComposedHandler {
	middleware: Arc<dyn Middleware>,
	next: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for ComposedHandler {
	async fn handle(&self, request: Request) -> Result<Response> {
		self.middleware.process(request, self.next.clone()).await
	}
}
