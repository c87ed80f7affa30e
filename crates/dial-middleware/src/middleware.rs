//! The profiling middleware
//!
//! For each request:
//!
//! 1. Requests that do not accept HTML pass straight through.
//! 2. The gate decides whether to profile; unsampled requests pass through.
//! 3. A duplicate-query scan, a profiler session and a stats baseline are
//!    started, the downstream handler runs, and all three are stopped.
//! 4. A response that is not HTML is returned unmodified.
//! 5. The profile is written to storage by a background task under a fresh
//!    artifact key, the query log is parsed, the panel is rendered and
//!    injected before `</body>`.

use crate::config::DialConfig;
use crate::endpoint::{ProfileEndpoint, ProfileRoute};
use crate::gate::{accepts_html, should_profile};
use crate::injection::inject_markup;
use crate::panels::{
	HtmlPanelRenderer, NoRouteResolver, PanelData, PanelRenderer, RouteResolver, RouteSummary,
	parse_server_timing, profile_url, round_ms, viewer_url,
};
use crate::profiler::{ProfileResult, Profiler, ProfilerOptions, WallClockProfiler};
use crate::query_log::{DuplicateQueryScanner, QueryLogSink, QueryScanner};
use crate::stats::{StatsCapture, StatsSource, default_sources};
use async_trait::async_trait;
use dial_core::Result;
use dial_http::{Handler, Middleware, Request, Response};
use dial_storage::{ArtifactKey, Storage};
use std::sync::Arc;
use std::time::Instant;

/// Middleware profiling sampled HTML requests
///
/// # Examples
///
/// ```
/// use dial_middleware::{DialConfig, DialMiddleware};
/// use dial_http::{Handler, MiddlewareChain, Request, Response};
/// use dial_storage::StorageSettings;
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct Page;
///
/// #[async_trait]
/// impl Handler for Page {
///     async fn handle(&self, _request: Request) -> dial_http::Result<Response> {
///         Ok(Response::ok()
///             .with_content_type("text/html")
///             .with_body("<html><body>Hello</body></html>"))
///     }
/// }
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let temp = tempfile::tempdir().unwrap();
/// let config = DialConfig::default().with_storage(StorageSettings::file(temp.path()));
/// let dial = Arc::new(DialMiddleware::new(config).unwrap());
///
/// let app = MiddlewareChain::new(Arc::new(Page))
///     .with_middleware(Arc::new(dial.profile_route()))
///     .with_middleware(dial.clone());
///
/// let request = Request::builder()
///     .uri("/")
///     .header("accept", "text/html")
///     .build()
///     .unwrap();
/// let response = app.handle(request).await.unwrap();
///
/// let html = response.body.collect().await.unwrap();
/// assert!(String::from_utf8_lossy(&html).contains(r#"<div id="dial""#));
/// # });
/// ```
pub struct DialMiddleware {
	config: Arc<DialConfig>,
	storage: Arc<Storage>,
	profiler: Arc<dyn Profiler>,
	scanner: Arc<dyn QueryScanner>,
	stats_sources: Vec<Arc<dyn StatsSource>>,
	route_resolver: Arc<dyn RouteResolver>,
	renderer: Arc<dyn PanelRenderer>,
}

impl DialMiddleware {
	/// Create the middleware from a configuration
	///
	/// # Errors
	///
	/// Returns `Error::Configuration` when the configuration is invalid.
	pub fn new(config: DialConfig) -> Result<Self> {
		config.validate()?;
		let scanner = DuplicateQueryScanner::from_config(&config)?;
		let storage = Storage::new(config.storage.clone());

		Ok(Self {
			config: Arc::new(config),
			storage: Arc::new(storage),
			profiler: Arc::new(WallClockProfiler),
			scanner: Arc::new(scanner),
			stats_sources: default_sources(),
			route_resolver: Arc::new(NoRouteResolver),
			renderer: Arc::new(HtmlPanelRenderer),
		})
	}

	/// Share an existing storage facade
	pub fn with_storage(mut self, storage: Arc<Storage>) -> Self {
		self.storage = storage;
		self
	}

	/// Replace the profiler
	pub fn with_profiler(mut self, profiler: Arc<dyn Profiler>) -> Self {
		self.profiler = profiler;
		self
	}

	/// Replace the duplicate-query scanner
	pub fn with_query_scanner(mut self, scanner: Arc<dyn QueryScanner>) -> Self {
		self.scanner = scanner;
		self
	}

	/// Add a stats source
	pub fn with_stats_source(mut self, source: Arc<dyn StatsSource>) -> Self {
		self.stats_sources.push(source);
		self
	}

	/// Replace every stats source
	pub fn with_stats_sources(mut self, sources: Vec<Arc<dyn StatsSource>>) -> Self {
		self.stats_sources = sources;
		self
	}

	/// Resolve route information through `resolver`
	pub fn with_route_resolver(mut self, resolver: Arc<dyn RouteResolver>) -> Self {
		self.route_resolver = resolver;
		self
	}

	/// Replace the panel renderer
	pub fn with_renderer(mut self, renderer: Arc<dyn PanelRenderer>) -> Self {
		self.renderer = renderer;
		self
	}

	/// The frozen configuration
	pub fn config(&self) -> &DialConfig {
		&self.config
	}

	/// The artifact storage
	pub fn storage(&self) -> &Arc<Storage> {
		&self.storage
	}

	/// Handler serving stored profiles
	pub fn endpoint(&self) -> ProfileEndpoint {
		ProfileEndpoint::new(self.storage.clone())
	}

	/// Middleware serving stored profiles at `<mount_path>/profile`
	pub fn profile_route(&self) -> ProfileRoute {
		ProfileRoute::new(self.config.profile_path(), self.endpoint())
	}

	/// Remove expired artifacts, typically once at startup
	///
	/// Returns the number of removed artifacts; 0 for backends that expire
	/// entries themselves.
	pub async fn sweep_expired(&self) -> Result<usize> {
		let removed = self.storage.cleanup().await?;
		if removed > 0 {
			tracing::debug!(removed, "Removed expired profiles");
		}
		Ok(removed)
	}

	fn profiler_options(&self) -> ProfilerOptions {
		ProfilerOptions {
			interval_micros: self.config.profiler_interval,
			allocation_interval: self.config.profiler_allocation_interval,
			..ProfilerOptions::default()
		}
	}

	async fn profile(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let started = Instant::now();
		let sink = QueryLogSink::new();

		let scan = self.scanner.begin_scan(&request);
		let session = match self.profiler.begin(&self.profiler_options()) {
			Ok(session) => session,
			Err(e) => {
				tracing::warn!(error = %e, "Failed to start profiler, skipping profile");
				scan.end_scan(&sink);
				return next.handle(request).await;
			}
		};
		let observed = request.clone();

		let capture = StatsCapture::begin(&self.stats_sources);
		let result = next.handle(request).await;
		let stats = capture.finish();

		let profile = session.end();
		scan.end_scan(&sink);

		let response = result?;
		let request_timing_ms = round_ms(started.elapsed().as_secs_f64() * 1_000.0);

		if !response.is_html() {
			tracing::debug!(path = %observed.path(), "Response is not HTML, skipping panel");
			return Ok(response);
		}

		let profile = match profile {
			Ok(profile) => profile,
			Err(e) => {
				tracing::warn!(error = %e, "Failed to stop profiler, skipping panel");
				return Ok(response);
			}
		};

		let key = Storage::generate_profile_key();
		tracing::debug!(path = %observed.path(), key = %key, request_timing_ms, "Profiled request");
		self.persist(&key, profile);

		let profile_url = profile_url(&observed, &self.config, &key);
		let data = PanelData {
			route: RouteSummary::from_lookup(self.route_resolver.resolve(&observed)),
			request_timing_ms,
			profile_key: key.to_string(),
			viewer_url: viewer_url(&profile_url),
			profile_url,
			environment: self.config.environment_facts.clone(),
			query_logs: sink.drain_entries(),
			stats,
			server_timing: parse_server_timing(&response.headers),
			toggle_shortcut_keys: self.config.toggle_shortcut_keys.clone(),
			nonce: self.config.csp_nonce.resolve(&observed, &response.headers),
		};

		match self.renderer.render(&data) {
			Ok(markup) => Ok(inject_markup(response, markup)),
			Err(e) => {
				tracing::warn!(error = %e, "Failed to render panel");
				Ok(response)
			}
		}
	}

	/// Write the profile in the background; failures are logged and dropped
	fn persist(&self, key: &ArtifactKey, profile: Box<dyn ProfileResult>) {
		let Ok(runtime) = tokio::runtime::Handle::try_current() else {
			tracing::warn!(key = %key, "No async runtime to persist profile");
			return;
		};
		let storage = self.storage.clone();
		let storage_key = Storage::profile_storage_key(key);

		runtime.spawn(async move {
			let data = match profile.to_bytes() {
				Ok(data) => data,
				Err(e) => {
					tracing::warn!(key = %storage_key, error = %e, "Failed to serialize profile");
					return;
				}
			};
			drop(profile);

			if let Err(e) = storage.store(storage_key.as_str(), data, None).await {
				tracing::warn!(key = %storage_key, error = %e, "Failed to persist profile");
			}
		});
	}
}

#[async_trait]
impl Middleware for DialMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		if !accepts_html(&request) {
			return next.handle(request).await;
		}
		if !should_profile(&request, &self.config) {
			return next.handle(request).await;
		}
		self.profile(request, next).await
	}
}
