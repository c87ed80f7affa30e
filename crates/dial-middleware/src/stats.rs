//! Runtime counters diffed around the downstream call
//!
//! Each [`StatsSource`] produces one family of named counters. A
//! [`StatsCapture`] snapshots every source right before the handler runs and
//! again right after it returns; the panel shows the per-key deltas.

mod alloc;
mod runtime;

pub use alloc::{AllocStats, CountingAllocator};
pub use runtime::TokioRuntimeStats;

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Named counters of one family at one instant
pub type StatsSnapshot = BTreeMap<String, i64>;

/// A family of counters that can be snapshotted
pub trait StatsSource: Send + Sync {
	/// Family name shown in the panel
	fn name(&self) -> &'static str;

	/// Current counter values
	fn snapshot(&self) -> StatsSnapshot;
}

/// Per-key change between two snapshots
///
/// The diff covers the keys of `after` only; a key missing from `before`
/// counts from 0 and a key only present in `before` is dropped.
///
/// # Examples
///
/// ```
/// use dial_middleware::stats::{StatsSnapshot, diff};
///
/// let before = StatsSnapshot::from([("a".to_string(), 5), ("gone".to_string(), 1)]);
/// let after = StatsSnapshot::from([("a".to_string(), 8), ("new".to_string(), 2)]);
///
/// let delta = diff(&before, &after);
/// assert_eq!(delta["a"], 3);
/// assert_eq!(delta["new"], 2);
/// assert!(!delta.contains_key("gone"));
/// ```
pub fn diff(before: &StatsSnapshot, after: &StatsSnapshot) -> StatsSnapshot {
	after
		.iter()
		.map(|(key, value)| {
			let base = before.get(key).copied().unwrap_or(0);
			(key.clone(), value.saturating_sub(base))
		})
		.collect()
}

/// Diffed counters of one family
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsFamily {
	/// Family name
	pub name: String,
	/// Per-key deltas
	pub values: StatsSnapshot,
}

/// Baselines taken before the downstream call
pub struct StatsCapture {
	baselines: Vec<(Arc<dyn StatsSource>, StatsSnapshot)>,
}

impl StatsCapture {
	/// Snapshot every source
	pub fn begin(sources: &[Arc<dyn StatsSource>]) -> Self {
		Self {
			baselines: sources
				.iter()
				.map(|source| (source.clone(), source.snapshot()))
				.collect(),
		}
	}

	/// Snapshot every source again and diff against the baselines
	pub fn finish(self) -> Vec<StatsFamily> {
		self.baselines
			.into_iter()
			.map(|(source, before)| StatsFamily {
				name: source.name().to_string(),
				values: diff(&before, &source.snapshot()),
			})
			.collect()
	}
}

/// Sources registered by default: tokio runtime and allocation counters
pub fn default_sources() -> Vec<Arc<dyn StatsSource>> {
	vec![Arc::new(TokioRuntimeStats), Arc::new(AllocStats)]
}
