use super::{StatsSnapshot, StatsSource};
use tokio::runtime::Handle;

/// Counters of the tokio runtime driving the request
///
/// Outside a runtime the snapshot is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRuntimeStats;

impl StatsSource for TokioRuntimeStats {
	fn name(&self) -> &'static str {
		"runtime"
	}

	fn snapshot(&self) -> StatsSnapshot {
		let Ok(handle) = Handle::try_current() else {
			return StatsSnapshot::new();
		};
		let metrics = handle.metrics();

		StatsSnapshot::from([
			("num_workers".to_string(), to_i64(metrics.num_workers())),
			("num_alive_tasks".to_string(), to_i64(metrics.num_alive_tasks())),
			("global_queue_depth".to_string(), to_i64(metrics.global_queue_depth())),
		])
	}
}

fn to_i64(value: usize) -> i64 {
	i64::try_from(value).unwrap_or(i64::MAX)
}
