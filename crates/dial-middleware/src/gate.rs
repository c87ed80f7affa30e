//! Sampling decision
//!
//! A request is profiled when it carries a truthy force parameter, or when
//! profiling is enabled and one uniform draw in `0..100` falls below the
//! sampling percentage. Force wins over both `enabled = false` and a
//! sampling percentage of 0.

use crate::config::DialConfig;
use dial_core::constants::CONTENT_TYPE_HTML;
use dial_http::Request;
use rand::Rng;

/// Whether the client accepts an HTML response
pub fn accepts_html(request: &Request) -> bool {
	request.accepts(CONTENT_TYPE_HTML)
}

/// Whether a force parameter value switches profiling on
///
/// # Examples
///
/// ```
/// use dial_middleware::gate::is_truthy;
///
/// assert!(is_truthy("1"));
/// assert!(is_truthy("true"));
/// assert!(!is_truthy("0"));
/// assert!(!is_truthy("Off"));
/// assert!(!is_truthy(""));
/// ```
pub fn is_truthy(value: &str) -> bool {
	!matches!(
		value.trim().to_ascii_lowercase().as_str(),
		"" | "0" | "false" | "off" | "no"
	)
}

/// Whether the request forces profiling through `config.force_param`
pub fn is_forced(request: &Request, config: &DialConfig) -> bool {
	request
		.param(&config.force_param)
		.is_some_and(|value| is_truthy(&value))
}

/// Decide whether to profile `request`, drawing from the thread RNG
pub fn should_profile(request: &Request, config: &DialConfig) -> bool {
	should_profile_with(request, config, &mut rand::thread_rng())
}

/// Decide whether to profile `request`, drawing from `rng`
pub fn should_profile_with<R>(request: &Request, config: &DialConfig, rng: &mut R) -> bool
where
	R: Rng + ?Sized,
{
	if is_forced(request, config) {
		return true;
	}
	if !config.enabled {
		return false;
	}
	rng.gen_range(0..100u8) < config.sampling_percentage
}
