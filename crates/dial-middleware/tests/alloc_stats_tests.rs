//! Allocation stats with the counting allocator installed

use async_trait::async_trait;
use dial_core::Result;
use dial_http::{Handler, Middleware, Request, Response};
use dial_middleware::stats::{AllocStats, CountingAllocator, StatsCapture, StatsSource};
use dial_middleware::{DialConfig, DialMiddleware};
use dial_storage::StorageSettings;
use regex::Regex;
use rstest::rstest;
use serial_test::serial;
use std::hint::black_box;
use std::sync::Arc;
use tempfile::TempDir;

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator::system();

const BUFFER_BYTES: usize = 1 << 20;

struct BufferingPage;

#[async_trait]
impl Handler for BufferingPage {
	async fn handle(&self, _request: Request) -> Result<Response> {
		let buffer = black_box(vec![0u8; BUFFER_BYTES]);
		drop(buffer);
		Ok(Response::ok()
			.with_content_type("text/html")
			.with_body("<html><body></body></html>"))
	}
}

#[rstest]
#[serial(alloc)]
fn test_capture_sees_allocations() {
	let sources: Vec<Arc<dyn StatsSource>> = vec![Arc::new(AllocStats)];

	let capture = StatsCapture::begin(&sources);
	let buffer = black_box(vec![1u8; BUFFER_BYTES]);
	drop(buffer);
	let families = capture.finish();

	let alloc = &families[0];
	assert_eq!(alloc.name, "alloc");
	assert!(alloc.values["allocations"] >= 1);
	assert!(alloc.values["deallocations"] >= 1);
	assert!(alloc.values["allocated_bytes"] >= BUFFER_BYTES as i64);
	assert!(alloc.values["freed_bytes"] >= BUFFER_BYTES as i64);
}

#[rstest]
#[serial(alloc)]
#[tokio::test]
async fn test_panel_reports_request_allocations() {
	let temp = TempDir::new().unwrap();
	let dial = DialMiddleware::new(
		DialConfig::default().with_storage(StorageSettings::file(temp.path())),
	)
	.unwrap()
	.with_stats_sources(vec![Arc::new(AllocStats)]);
	let request = Request::builder()
		.uri("/")
		.header("accept", "text/html")
		.build()
		.unwrap();

	let response = dial.process(request, Arc::new(BufferingPage)).await.unwrap();
	let html = String::from_utf8(response.body.collect().await.unwrap().to_vec()).unwrap();

	assert!(html.contains(r#"<details id="dial-details-alloc-stats">"#));
	assert!(!html.contains("dial-details-runtime-stats"));
	let re = Regex::new(r"<b>allocated_bytes:</b> (\d+)").unwrap();
	let allocated: i64 = re.captures(&html).unwrap()[1].parse().unwrap();
	assert!(allocated >= BUFFER_BYTES as i64);
}
