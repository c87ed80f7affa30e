//! # Dial
//!
//! Request-profiling middleware. For a sampled share of HTML requests Dial
//! records a profile, duplicate-query warnings and runtime stats, stores
//! the profile for an external viewer and injects a diagnostic panel into
//! the page, without buffering streamed responses.
//!
//! ## Feature Flags
//!
//! - `redis-backend` - Redis artifact storage
//! - `memcached-backend` - Memcached artifact storage
//! - `all-backends` - Every storage backend
//! - `full` - All features enabled
//!
//! ## Crates
//!
//! - [`core`]: errors and defaults
//! - [`http`]: request, response, streaming body and middleware traits
//! - [`storage`]: artifact storage with TTL
//! - [`middleware`]: the profiler middleware, panel and endpoint
//!
//! ## Quick Start
//!
//! ```
//! use dial::prelude::*;
//! use std::sync::Arc;
//!
//! struct Home;
//!
//! #[async_trait]
//! impl Handler for Home {
//!     async fn handle(&self, _request: Request) -> Result<Response> {
//!         Ok(Response::ok()
//!             .with_content_type("text/html")
//!             .with_body("<html><body>Home</body></html>"))
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let temp = tempfile::tempdir().unwrap();
//! let config = DialConfig::default()
//!     .with_sampling_percentage(10)
//!     .with_storage(StorageSettings::file(temp.path()));
//! let dial = Arc::new(DialMiddleware::new(config).unwrap());
//! dial.sweep_expired().await.unwrap();
//!
//! let app = MiddlewareChain::new(Arc::new(Home))
//!     .with_middleware(Arc::new(dial.profile_route()))
//!     .with_middleware(dial);
//!
//! let request = Request::builder()
//!     .uri("/?dial_force=1")
//!     .header("accept", "text/html")
//!     .build()
//!     .unwrap();
//! let response = app.handle(request).await.unwrap();
//! let html = response.body.collect().await.unwrap();
//! assert!(String::from_utf8_lossy(&html).contains(r#"<div id="dial""#));
//! # });
//! ```

#![warn(missing_docs)]

pub use dial_core as core;
pub use dial_http as http;
pub use dial_middleware as middleware;
pub use dial_storage as storage;

pub use dial_core::{Error, Result};
pub use dial_http::{Body, Handler, Middleware, MiddlewareChain, Request, Response, StatusCode};
pub use dial_middleware::{
	CspNonce, DialConfig, DialMiddleware, HtmlPanelRenderer, PanelData, PanelRenderer,
	ProfileEndpoint, ProfileRoute, Profiler, QueryRecorder, QueryScanner, RouteResolver,
	RouteTable, StatsSource,
};
pub use dial_storage::{ArtifactKey, ArtifactStorage, Storage, StorageSettings};

/// Prelude module for convenient imports
///
/// ```
/// use dial::prelude::*;
/// ```
pub mod prelude {
	pub use crate::{
		ArtifactKey, Body, CspNonce, DialConfig, DialMiddleware, Error, Handler, Middleware,
		MiddlewareChain, ProfileRoute, QueryRecorder, Request, Response, Result, RouteTable,
		StatusCode, Storage, StorageSettings,
	};

	pub use async_trait::async_trait;
}
