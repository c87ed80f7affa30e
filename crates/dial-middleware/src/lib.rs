//! # Dial Middleware
//!
//! An in-process request profiler. For a sampled share of HTML requests it
//! records a profile, a duplicate-query log and runtime stats, stores the
//! profile under a fresh key and injects a panel into the page.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dial_middleware::{DialConfig, DialMiddleware};
//! use dial_http::MiddlewareChain;
//! use std::sync::Arc;
//!
//! let config = DialConfig::from_toml_str(include_str!("dial.toml"))?;
//! let dial = Arc::new(DialMiddleware::new(config)?);
//! dial.sweep_expired().await?;
//!
//! let app = MiddlewareChain::new(Arc::new(app))
//!     .with_middleware(Arc::new(dial.profile_route()))
//!     .with_middleware(dial);
//! ```
//!
//! ## Architecture
//!
//! 1. **Gate**: HTML `Accept` check, force parameter and sampling
//! 2. **Capture**: profiler session, stats baselines and a duplicate-query
//!    scan around the downstream call
//! 3. **Query log**: the scan's text output parsed into entries
//! 4. **Panel**: data gathered into [`PanelData`] and rendered
//! 5. **Injection**: markup placed before `</body>`, buffered or streamed
//! 6. **Endpoint**: stored profiles served back for the external viewer
//!
//! ## Allocation stats
//!
//! Allocation counters only move when [`stats::CountingAllocator`] is the
//! global allocator:
//!
//! ```rust,ignore
//! #[global_allocator]
//! static GLOBAL: dial_middleware::stats::CountingAllocator =
//!     dial_middleware::stats::CountingAllocator::system();
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod endpoint;
pub mod gate;
pub mod injection;
pub mod middleware;
pub mod panels;
pub mod profiler;
pub mod query_log;
pub mod stats;

pub use config::{CspNonce, DialConfig, NonceProvider, NonceSource};
pub use endpoint::{ProfileEndpoint, ProfileRoute};
pub use gate::{accepts_html, is_forced, should_profile};
pub use injection::{InjectedBody, inject_markup};
pub use middleware::DialMiddleware;
pub use panels::{HtmlPanelRenderer, PanelData, PanelRenderer, RouteInfo, RouteResolver, RouteTable};
pub use profiler::{ProfileResult, ProfileSession, Profiler, ProfilerOptions, WallClockProfiler};
pub use query_log::{
	DuplicateQueryScanner, QueryLogEntry, QueryLogSink, QueryRecorder, QueryScanner,
	parse_query_log,
};
pub use stats::{StatsFamily, StatsSource};
