//! Consumption paths of response bodies

use bytes::Bytes;
use dial_http::{Body, BodyError, Response};
use futures::StreamExt;
use futures::stream;
use rstest::rstest;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

fn counted(body: Body) -> (Body, Arc<AtomicUsize>) {
	let closes = Arc::new(AtomicUsize::new(0));
	let counter = closes.clone();
	let body = body.with_close_hook(move || {
		counter.fetch_add(1, Ordering::SeqCst);
		Ok(())
	});
	(body, closes)
}

/// Writer refusing every write
struct BrokenPipe;

impl AsyncWrite for BrokenPipe {
	fn poll_write(
		self: Pin<&mut Self>,
		_cx: &mut Context<'_>,
		_buf: &[u8],
	) -> Poll<io::Result<usize>> {
		Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away")))
	}

	fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
		Poll::Ready(Ok(()))
	}

	fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
		Poll::Ready(Ok(()))
	}
}

#[rstest]
#[tokio::test]
async fn test_write_to_streams_every_chunk() {
	let (body, closes) = counted(Body::from_chunks(["<html>", "<body>", "</body></html>"]));
	let mut out = Vec::new();

	let written = body.write_to(&mut out).await.unwrap();

	assert_eq!(written, 26);
	assert_eq!(out, b"<html><body></body></html>".to_vec());
	assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[rstest]
#[tokio::test]
async fn test_write_failure_closes_body() {
	let (body, closes) = counted(Body::from_chunks(["a", "b"]));

	let result = body.write_to(&mut BrokenPipe).await;

	assert!(matches!(result, Err(BodyError::Io(_))));
	assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[rstest]
#[tokio::test]
async fn test_iteration_then_drop_closes_once() {
	let (mut body, closes) = counted(Body::from_chunks(["one", "two"]));

	assert_eq!(body.next().await.unwrap().unwrap(), Bytes::from("one"));
	assert_eq!(body.next().await.unwrap().unwrap(), Bytes::from("two"));
	assert!(body.next().await.is_none());
	assert!(body.is_closed());
	drop(body);

	assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[rstest]
#[tokio::test]
async fn test_stream_error_surfaces_and_closes() {
	let source = stream::iter(vec![
		Ok(Bytes::from("partial")),
		Err(BodyError::Stream("upstream reset".into())),
	]);
	let (body, closes) = counted(Body::from_stream(source));

	let result = body.collect().await;

	assert!(matches!(result, Err(BodyError::Stream(_))));
	assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[rstest]
#[tokio::test]
async fn test_abandoned_response_releases_body() {
	let (body, closes) = counted(Body::from_chunks(["never", "read"]));
	let response = Response::ok().with_content_type("text/html").with_body(body);

	drop(response);

	assert_eq!(closes.load(Ordering::SeqCst), 1);
}
