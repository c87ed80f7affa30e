//! Profiler configuration

use dial_core::constants::{
	FORCE_PARAM, IGNORED_QUERY_PATTERNS, MOUNT_PATH, PROFILER_ALLOCATION_INTERVAL,
	PROFILER_INTERVAL, SAMPLING_PERCENTAGE, TOGGLE_SHORTCUT_KEYS,
};
use dial_core::{Error, Result};
use dial_http::{HeaderMap, Request};
use dial_storage::StorageSettings;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// CSP nonce placed in request extensions by the host application
#[derive(Debug, Clone)]
pub struct CspNonce(pub String);

/// Closure computing the nonce from the request and the response headers
pub type NonceProvider = Arc<dyn Fn(&Request, &HeaderMap) -> String + Send + Sync>;

/// Where the panel's `<script>` nonce comes from
#[derive(Clone)]
pub enum NonceSource {
	/// The same nonce for every response
	Static(String),
	/// A nonce computed per response
	Provider(NonceProvider),
}

impl NonceSource {
	/// Resolve the nonce for one response
	///
	/// # Examples
	///
	/// ```
	/// use dial_middleware::config::{CspNonce, NonceSource};
	/// use dial_http::{HeaderMap, Request};
	///
	/// let request = Request::builder().uri("/").build().unwrap();
	/// let headers = HeaderMap::new();
	///
	/// assert_eq!(NonceSource::default().resolve(&request, &headers), "");
	///
	/// request.extensions.insert(CspNonce("abc123".to_string()));
	/// assert_eq!(NonceSource::default().resolve(&request, &headers), "abc123");
	///
	/// let fixed = NonceSource::Static("fixed".to_string());
	/// assert_eq!(fixed.resolve(&request, &headers), "fixed");
	/// ```
	pub fn resolve(&self, request: &Request, headers: &HeaderMap) -> String {
		match self {
			NonceSource::Static(nonce) => nonce.clone(),
			NonceSource::Provider(provider) => provider(request, headers),
		}
	}
}

impl Default for NonceSource {
	fn default() -> Self {
		NonceSource::Provider(Arc::new(|request, _headers| {
			request
				.extensions
				.get::<CspNonce>()
				.map(|nonce| nonce.0)
				.unwrap_or_default()
		}))
	}
}

impl fmt::Debug for NonceSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			NonceSource::Static(nonce) => f.debug_tuple("Static").field(nonce).finish(),
			NonceSource::Provider(_) => f.write_str("Provider(..)"),
		}
	}
}

/// Profiler middleware configuration
///
/// Everything except storage clients and the nonce provider can be loaded
/// from TOML with [`DialConfig::from_toml_str`]. The middleware shares the
/// configuration behind an `Arc`, so it is frozen once the middleware is
/// built.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DialConfig {
	/// Profile sampled requests at all
	pub enabled: bool,

	/// Query/form parameter that forces profiling of one request
	pub force_param: String,

	/// Share of requests profiled, 0 to 100
	pub sampling_percentage: u8,

	/// Artifact storage backend
	pub storage: StorageSettings,

	/// Key combination toggling the panel; the last entry is the key, the
	/// others are modifiers
	pub toggle_shortcut_keys: Vec<String>,

	/// Profiler sampling interval in microseconds
	pub profiler_interval: u64,

	/// Profiler allocation sampling interval
	pub profiler_allocation_interval: u64,

	/// Regexes of queries excluded from duplicate-query detection
	pub ignored_query_patterns: Vec<String>,

	/// Nonce of the panel's inline script
	#[serde(skip)]
	pub csp_nonce: NonceSource,

	/// Route prefix of the profile endpoint
	pub mount_path: String,

	/// Version and environment facts shown in the panel header
	pub environment_facts: BTreeMap<String, String>,
}

impl Default for DialConfig {
	fn default() -> Self {
		let mut environment_facts = BTreeMap::new();
		environment_facts.insert(
			"Dial version".to_string(),
			env!("CARGO_PKG_VERSION").to_string(),
		);

		Self {
			enabled: true,
			force_param: FORCE_PARAM.to_string(),
			sampling_percentage: SAMPLING_PERCENTAGE,
			storage: StorageSettings::default(),
			toggle_shortcut_keys: TOGGLE_SHORTCUT_KEYS.iter().map(|k| k.to_string()).collect(),
			profiler_interval: PROFILER_INTERVAL,
			profiler_allocation_interval: PROFILER_ALLOCATION_INTERVAL,
			ignored_query_patterns: IGNORED_QUERY_PATTERNS
				.iter()
				.map(|p| p.to_string())
				.collect(),
			csp_nonce: NonceSource::default(),
			mount_path: MOUNT_PATH.to_string(),
			environment_facts,
		}
	}
}

impl DialConfig {
	/// Create a configuration with default values
	pub fn new() -> Self {
		Self::default()
	}

	/// Load a configuration from TOML
	///
	/// Missing keys keep their defaults. Storage TTLs are given in seconds.
	///
	/// # Examples
	///
	/// ```
	/// use dial_middleware::DialConfig;
	/// use std::time::Duration;
	///
	/// let config = DialConfig::from_toml_str(r#"
	///     sampling_percentage = 25
	///     force_param = "profile"
	///
	///     [storage]
	///     backend = "file"
	///     ttl = 600
	///     dir = "/var/tmp/dial"
	/// "#).unwrap();
	///
	/// assert_eq!(config.sampling_percentage, 25);
	/// assert_eq!(config.force_param, "profile");
	/// assert_eq!(config.storage.ttl, Duration::from_secs(600));
	/// assert!(config.enabled);
	/// ```
	///
	/// # Errors
	///
	/// Returns `Error::Configuration` for malformed TOML or values rejected
	/// by [`DialConfig::validate`].
	pub fn from_toml_str(source: &str) -> Result<Self> {
		let config: Self = toml::from_str(source)
			.map_err(|e| Error::Configuration(format!("Invalid Dial configuration: {}", e)))?;
		config.validate()?;
		Ok(config)
	}

	/// Check option values
	///
	/// # Errors
	///
	/// Returns `Error::Configuration` naming the first invalid option.
	pub fn validate(&self) -> Result<()> {
		if self.sampling_percentage > 100 {
			return Err(Error::Configuration(format!(
				"sampling_percentage must be between 0 and 100, got {}",
				self.sampling_percentage
			)));
		}
		if self.toggle_shortcut_keys.is_empty() {
			return Err(Error::Configuration(
				"toggle_shortcut_keys must name at least one key".to_string(),
			));
		}
		if !self.mount_path.starts_with('/') {
			return Err(Error::Configuration(format!(
				"mount_path must start with '/', got {:?}",
				self.mount_path
			)));
		}
		self.storage
			.validate()
			.map_err(|e| Error::Configuration(format!("Invalid storage settings: {}", e)))?;
		self.ignored_query_regexes()?;
		Ok(())
	}

	/// Compile `ignored_query_patterns`
	pub fn ignored_query_regexes(&self) -> Result<Vec<Regex>> {
		self.ignored_query_patterns
			.iter()
			.map(|pattern| {
				Regex::new(pattern).map_err(|e| {
					Error::Configuration(format!("Invalid ignored query pattern {:?}: {}", pattern, e))
				})
			})
			.collect()
	}

	/// Set whether sampled requests are profiled
	pub fn with_enabled(mut self, enabled: bool) -> Self {
		self.enabled = enabled;
		self
	}

	/// Set the parameter that forces profiling
	pub fn with_force_param(mut self, param: impl Into<String>) -> Self {
		self.force_param = param.into();
		self
	}

	/// Set the sampling percentage
	pub fn with_sampling_percentage(mut self, percentage: u8) -> Self {
		self.sampling_percentage = percentage;
		self
	}

	/// Set the artifact storage backend
	pub fn with_storage(mut self, storage: StorageSettings) -> Self {
		self.storage = storage;
		self
	}

	/// Set the panel toggle key combination
	pub fn with_toggle_shortcut_keys<I, S>(mut self, keys: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.toggle_shortcut_keys = keys.into_iter().map(Into::into).collect();
		self
	}

	/// Set the profiler sampling intervals
	pub fn with_profiler_intervals(mut self, interval: u64, allocation_interval: u64) -> Self {
		self.profiler_interval = interval;
		self.profiler_allocation_interval = allocation_interval;
		self
	}

	/// Add a pattern of queries excluded from duplicate-query detection
	pub fn with_ignored_query_pattern(mut self, pattern: impl Into<String>) -> Self {
		self.ignored_query_patterns.push(pattern.into());
		self
	}

	/// Use the same nonce for every response
	pub fn with_static_nonce(mut self, nonce: impl Into<String>) -> Self {
		self.csp_nonce = NonceSource::Static(nonce.into());
		self
	}

	/// Compute the nonce per response
	pub fn with_nonce_provider<F>(mut self, provider: F) -> Self
	where
		F: Fn(&Request, &HeaderMap) -> String + Send + Sync + 'static,
	{
		self.csp_nonce = NonceSource::Provider(Arc::new(provider));
		self
	}

	/// Set the route prefix of the profile endpoint
	pub fn with_mount_path(mut self, mount_path: impl Into<String>) -> Self {
		self.mount_path = mount_path.into();
		self
	}

	/// Add a fact shown in the panel header
	pub fn with_environment_fact(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.environment_facts.insert(name.into(), value.into());
		self
	}

	/// Path of the profile endpoint (`<mount_path>/profile`)
	pub fn profile_path(&self) -> String {
		format!("{}/profile", self.mount_path.trim_end_matches('/'))
	}
}
