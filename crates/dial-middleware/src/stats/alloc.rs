use super::{StatsSnapshot, StatsSource};
use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};

static ALLOCATIONS: AtomicU64 = AtomicU64::new(0);
static DEALLOCATIONS: AtomicU64 = AtomicU64::new(0);
static ALLOCATED_BYTES: AtomicU64 = AtomicU64::new(0);
static FREED_BYTES: AtomicU64 = AtomicU64::new(0);

/// Global allocator wrapper feeding the `alloc` stats family
///
/// Install it in the host binary; without it the `alloc` counters stay at 0.
///
/// ```no_run
/// use dial_middleware::stats::CountingAllocator;
///
/// #[global_allocator]
/// static ALLOCATOR: CountingAllocator = CountingAllocator::system();
/// ```
#[derive(Debug, Default)]
pub struct CountingAllocator<A = System> {
	inner: A,
}

impl CountingAllocator<System> {
	/// Count allocations made through the system allocator
	pub const fn system() -> Self {
		Self { inner: System }
	}
}

impl<A> CountingAllocator<A> {
	/// Count allocations made through `inner`
	pub const fn new(inner: A) -> Self {
		Self { inner }
	}
}

#[inline]
fn record_alloc(size: usize) {
	ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
	ALLOCATED_BYTES.fetch_add(size as u64, Ordering::Relaxed);
}

#[inline]
fn record_dealloc(size: usize) {
	DEALLOCATIONS.fetch_add(1, Ordering::Relaxed);
	FREED_BYTES.fetch_add(size as u64, Ordering::Relaxed);
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for CountingAllocator<A> {
	#[inline]
	unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
		let ptr = unsafe { self.inner.alloc(layout) };
		if !ptr.is_null() {
			record_alloc(layout.size());
		}
		ptr
	}

	#[inline]
	unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
		let ptr = unsafe { self.inner.alloc_zeroed(layout) };
		if !ptr.is_null() {
			record_alloc(layout.size());
		}
		ptr
	}

	#[inline]
	unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
		record_dealloc(layout.size());
		unsafe { self.inner.dealloc(ptr, layout) }
	}

	#[inline]
	unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
		let new_ptr = unsafe { self.inner.realloc(ptr, layout, new_size) };
		if !new_ptr.is_null() {
			record_dealloc(layout.size());
			record_alloc(new_size);
		}
		new_ptr
	}
}

/// Process-wide allocation counters recorded by [`CountingAllocator`]
#[derive(Debug, Clone, Copy, Default)]
pub struct AllocStats;

impl StatsSource for AllocStats {
	fn name(&self) -> &'static str {
		"alloc"
	}

	fn snapshot(&self) -> StatsSnapshot {
		let allocated = ALLOCATED_BYTES.load(Ordering::Relaxed);
		let freed = FREED_BYTES.load(Ordering::Relaxed);

		StatsSnapshot::from([
			("allocations".to_string(), to_i64(ALLOCATIONS.load(Ordering::Relaxed))),
			("deallocations".to_string(), to_i64(DEALLOCATIONS.load(Ordering::Relaxed))),
			("allocated_bytes".to_string(), to_i64(allocated)),
			("freed_bytes".to_string(), to_i64(freed)),
			("live_bytes".to_string(), to_i64(allocated.saturating_sub(freed))),
		])
	}
}

fn to_i64(value: u64) -> i64 {
	i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_snapshot_keys() {
		let snapshot = AllocStats.snapshot();

		assert_eq!(
			snapshot.keys().map(String::as_str).collect::<Vec<_>>(),
			vec!["allocated_bytes", "allocations", "deallocations", "freed_bytes", "live_bytes"]
		);
	}

	#[rstest]
	fn test_wrapper_counts_through_inner_allocator() {
		let allocator = CountingAllocator::new(System);
		let layout = Layout::from_size_align(64, 8).unwrap();
		let before = AllocStats.snapshot();

		unsafe {
			let ptr = allocator.alloc(layout);
			assert!(!ptr.is_null());
			allocator.dealloc(ptr, layout);
		}

		let after = AllocStats.snapshot();
		assert!(after["allocations"] > before["allocations"]);
		assert!(after["allocated_bytes"] - before["allocated_bytes"] >= 64);
		assert!(after["deallocations"] > before["deallocations"]);
	}
}
