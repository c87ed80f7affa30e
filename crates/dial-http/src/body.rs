//! Response bodies
//!
//! A [`Body`] is either a fully buffered byte payload or a lazily produced,
//! non-restartable stream of chunks. Close hooks registered on a body run
//! exactly once: when iteration reaches the end, when the stream yields an
//! error, when [`Body::close`] is called, or when the body is dropped,
//! whichever happens first.

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Boxed error accepted from close hooks and foreign streams
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for a streaming body
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, BodyError>> + Send>>;

type CloseHook = Box<dyn FnOnce() -> Result<(), BoxError> + Send>;

/// Errors produced while consuming a body
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
	/// The underlying stream failed
	#[error("Body stream error: {0}")]
	Stream(String),

	/// Writing the body to its destination failed
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

impl From<BoxError> for BodyError {
	fn from(err: BoxError) -> Self {
		BodyError::Stream(err.to_string())
	}
}

impl From<BodyError> for dial_core::Error {
	fn from(err: BodyError) -> Self {
		dial_core::Error::Http(err.to_string())
	}
}

enum Kind {
	/// `None` once the payload has been yielded or released
	Full(Option<Bytes>),
	/// `None` once the stream has been released
	Streaming(Option<BodyStream>),
}

/// HTTP body that is consumed at most once
pub struct Body {
	kind: Kind,
	on_close: Vec<CloseHook>,
	closed: bool,
}

impl Body {
	/// Create an empty body
	pub fn empty() -> Self {
		Self::full(Bytes::new())
	}

	/// Create a fully buffered body
	///
	/// # Examples
	///
	/// ```
	/// use dial_http::Body;
	///
	/// let body = Body::full("hello");
	/// assert_eq!(body.size_hint(), Some(5));
	/// assert!(!body.is_streaming());
	/// ```
	pub fn full(bytes: impl Into<Bytes>) -> Self {
		Self {
			kind: Kind::Full(Some(bytes.into())),
			on_close: Vec::new(),
			closed: false,
		}
	}

	/// Create a body from a stream of chunks
	pub fn from_stream<S>(stream: S) -> Self
	where
		S: Stream<Item = Result<Bytes, BodyError>> + Send + 'static,
	{
		Self {
			kind: Kind::Streaming(Some(Box::pin(stream))),
			on_close: Vec::new(),
			closed: false,
		}
	}

	/// Create a streaming body that yields the given chunks in order
	///
	/// # Examples
	///
	/// ```
	/// use dial_http::Body;
	///
	/// let body = Body::from_chunks(["<html>", "</html>"]);
	/// assert!(body.is_streaming());
	/// assert_eq!(body.size_hint(), None);
	/// ```
	pub fn from_chunks<I, T>(chunks: I) -> Self
	where
		I: IntoIterator<Item = T>,
		I::IntoIter: Send + 'static,
		T: Into<Bytes>,
	{
		Self::from_stream(stream::iter(
			chunks.into_iter().map(|chunk| Ok(chunk.into())),
		))
	}

	/// Register a hook that releases resources behind this body
	///
	/// Hooks run exactly once, in registration order. A failing hook is
	/// logged and never replaces the result of consuming the body.
	pub fn with_close_hook<F>(mut self, hook: F) -> Self
	where
		F: FnOnce() -> Result<(), BoxError> + Send + 'static,
	{
		if self.closed {
			run_hook(Box::new(hook));
		} else {
			self.on_close.push(Box::new(hook));
		}
		self
	}

	/// Whether this body is produced lazily
	pub fn is_streaming(&self) -> bool {
		matches!(self.kind, Kind::Streaming(_))
	}

	/// Whether the body has released its underlying resources
	pub fn is_closed(&self) -> bool {
		self.closed
	}

	/// Exact length when known up front
	pub fn size_hint(&self) -> Option<u64> {
		match &self.kind {
			Kind::Full(Some(bytes)) => Some(bytes.len() as u64),
			Kind::Full(None) => Some(0),
			Kind::Streaming(_) => None,
		}
	}

	/// Borrow the payload of a buffered body that has not been consumed yet
	pub fn as_bytes(&self) -> Option<&Bytes> {
		match &self.kind {
			Kind::Full(Some(bytes)) => Some(bytes),
			_ => None,
		}
	}

	/// Release the underlying resources and run the close hooks
	///
	/// Calling this more than once has no further effect.
	pub fn close(&mut self) {
		if self.closed {
			return;
		}
		self.closed = true;

		match &mut self.kind {
			Kind::Full(bytes) => {
				bytes.take();
			}
			Kind::Streaming(stream) => {
				stream.take();
			}
		}

		for hook in self.on_close.drain(..) {
			run_hook(hook);
		}
	}

	/// Read the whole body into memory
	pub async fn collect(mut self) -> Result<Bytes, BodyError> {
		if let Kind::Full(bytes) = &mut self.kind {
			let bytes = bytes.take().unwrap_or_default();
			self.close();
			return Ok(bytes);
		}

		let mut buf = BytesMut::new();
		while let Some(chunk) = self.next().await {
			buf.extend_from_slice(&chunk?);
		}
		Ok(buf.freeze())
	}

	/// Stream the body into a writer, returning the number of bytes written
	pub async fn write_to<W>(mut self, writer: &mut W) -> Result<u64, BodyError>
	where
		W: AsyncWrite + Unpin + ?Sized,
	{
		let mut written = 0u64;
		while let Some(chunk) = self.next().await {
			let chunk = chunk?;
			if let Err(e) = writer.write_all(&chunk).await {
				self.close();
				return Err(e.into());
			}
			written += chunk.len() as u64;
		}
		writer.flush().await?;
		Ok(written)
	}
}

fn run_hook(hook: CloseHook) {
	if let Err(e) = hook() {
		tracing::warn!(error = %e, "Failed to release response body");
	}
}

impl Stream for Body {
	type Item = Result<Bytes, BodyError>;

	fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		let this = self.get_mut();

		let (item, finished) = match &mut this.kind {
			Kind::Full(bytes) => match bytes.take().filter(|b| !b.is_empty()) {
				Some(bytes) => (Poll::Ready(Some(Ok(bytes))), false),
				None => (Poll::Ready(None), true),
			},
			Kind::Streaming(None) => (Poll::Ready(None), false),
			Kind::Streaming(Some(inner)) => match inner.as_mut().poll_next(cx) {
				Poll::Pending => (Poll::Pending, false),
				Poll::Ready(Some(Ok(chunk))) => (Poll::Ready(Some(Ok(chunk))), false),
				Poll::Ready(Some(Err(e))) => (Poll::Ready(Some(Err(e))), true),
				Poll::Ready(None) => (Poll::Ready(None), true),
			},
		};

		if finished {
			this.close();
		}
		item
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		match &self.kind {
			Kind::Full(Some(bytes)) if !bytes.is_empty() => (1, Some(1)),
			Kind::Full(_) | Kind::Streaming(None) => (0, Some(0)),
			Kind::Streaming(Some(inner)) => inner.size_hint(),
		}
	}
}

impl Drop for Body {
	fn drop(&mut self) {
		self.close();
	}
}

impl Default for Body {
	fn default() -> Self {
		Self::empty()
	}
}

impl fmt::Debug for Body {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let kind = match &self.kind {
			Kind::Full(_) => "full",
			Kind::Streaming(_) => "streaming",
		};
		f.debug_struct("Body")
			.field("kind", &kind)
			.field("size_hint", &Body::size_hint(self))
			.field("closed", &self.closed)
			.finish()
	}
}

impl From<Bytes> for Body {
	fn from(bytes: Bytes) -> Self {
		Self::full(bytes)
	}
}

impl From<Vec<u8>> for Body {
	fn from(bytes: Vec<u8>) -> Self {
		Self::full(bytes)
	}
}

impl From<String> for Body {
	fn from(text: String) -> Self {
		Self::full(text)
	}
}

impl From<&'static str> for Body {
	fn from(text: &'static str) -> Self {
		Self::full(text)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn counting_hook(counter: &Arc<AtomicUsize>) -> impl FnOnce() -> Result<(), BoxError> + Send + use<> {
		let counter = counter.clone();
		move || {
			counter.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_iteration_closes_once() {
		let closes = Arc::new(AtomicUsize::new(0));
		let mut body = Body::from_chunks(["a", "b"]).with_close_hook(counting_hook(&closes));

		assert_eq!(body.next().await.unwrap().unwrap(), "a");
		assert_eq!(body.next().await.unwrap().unwrap(), "b");
		assert!(body.next().await.is_none());
		assert!(body.next().await.is_none());
		assert_eq!(closes.load(Ordering::SeqCst), 1);

		drop(body);
		assert_eq!(closes.load(Ordering::SeqCst), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_drop_without_iteration_closes() {
		let closes = Arc::new(AtomicUsize::new(0));
		let body = Body::from_chunks(["a"]).with_close_hook(counting_hook(&closes));

		drop(body);
		assert_eq!(closes.load(Ordering::SeqCst), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_error_closes_and_propagates() {
		let closes = Arc::new(AtomicUsize::new(0));
		let chunks: Vec<Result<Bytes, BodyError>> = vec![
			Ok(Bytes::from_static(b"a")),
			Err(BodyError::Stream("boom".to_string())),
			Ok(Bytes::from_static(b"never")),
		];
		let body = Body::from_stream(stream::iter(chunks)).with_close_hook(counting_hook(&closes));

		let err = body.collect().await.unwrap_err();
		assert!(err.to_string().contains("boom"));
		assert_eq!(closes.load(Ordering::SeqCst), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_failing_close_hook_does_not_mask_result() {
		let body = Body::from_chunks(["ok"]).with_close_hook(|| Err("release failed".into()));

		assert_eq!(body.collect().await.unwrap(), "ok");
	}

	#[rstest]
	#[tokio::test]
	async fn test_write_to() {
		let closes = Arc::new(AtomicUsize::new(0));
		let body = Body::from_chunks(["<p>", "hi", "</p>"]).with_close_hook(counting_hook(&closes));
		let mut out: Vec<u8> = Vec::new();

		let written = body.write_to(&mut out).await.unwrap();

		assert_eq!(written, 9);
		assert_eq!(out, b"<p>hi</p>");
		assert_eq!(closes.load(Ordering::SeqCst), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_full_body_yields_single_chunk() {
		let mut body = Body::full("payload");

		assert_eq!(body.size_hint(), Some(7));
		assert_eq!(body.next().await.unwrap().unwrap(), "payload");
		assert!(body.next().await.is_none());
		assert!(body.is_closed());
	}

	#[rstest]
	#[tokio::test]
	async fn test_explicit_close_is_idempotent() {
		let closes = Arc::new(AtomicUsize::new(0));
		let mut body = Body::from_chunks(["a"]).with_close_hook(counting_hook(&closes));

		body.close();
		body.close();

		assert!(body.next().await.is_none());
		assert_eq!(closes.load(Ordering::SeqCst), 1);
	}
}
