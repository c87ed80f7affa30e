//! Panel injection into HTML bodies
//!
//! Markup is inserted right before the first `</body>` of the document. A
//! document without the marker gets the markup appended at the end.
//!
//! Buffered bodies are rewritten in place and get a recomputed
//! `Content-Length`. Streamed bodies are wrapped in an [`InjectedBody`]
//! that rewrites chunks as they are produced; they lose `Content-Length`.
//! A marker split across two chunks is still found: the injector holds back
//! a chunk tail that could be the start of the marker until the next chunk
//! arrives, so the output bytes equal those of injecting into the
//! concatenated body.

use bytes::{Bytes, BytesMut};
use dial_core::constants::BODY_CLOSE_MARKER;
use dial_http::{Body, BodyError, Response};
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};

const MARKER: &[u8] = BODY_CLOSE_MARKER.as_bytes();

fn find_marker(haystack: &[u8]) -> Option<usize> {
	haystack
		.windows(MARKER.len())
		.position(|window| window == MARKER)
}

/// Length of the longest tail of `buf` that is a proper prefix of the marker
fn partial_marker_len(buf: &[u8]) -> usize {
	let max = buf.len().min(MARKER.len() - 1);
	(1..=max)
		.rev()
		.find(|&len| buf.ends_with(&MARKER[..len]))
		.unwrap_or(0)
}

fn splice(buf: &[u8], at: usize, markup: &[u8]) -> Bytes {
	let mut out = BytesMut::with_capacity(buf.len() + markup.len());
	out.extend_from_slice(&buf[..at]);
	out.extend_from_slice(markup);
	out.extend_from_slice(&buf[at..]);
	out.freeze()
}

/// Insert `markup` before the first `</body>` of `body`, or append it
///
/// # Examples
///
/// ```
/// use dial_middleware::injection::inject_into_bytes;
///
/// let html = b"<html><body>Hi</body></html>";
/// assert_eq!(
///     inject_into_bytes(html, b"<div id=\"dial\"></div>"),
///     "<html><body>Hi<div id=\"dial\"></div></body></html>"
/// );
///
/// assert_eq!(inject_into_bytes(b"<p>truncated", b"<hr>"), "<p>truncated<hr>");
/// ```
pub fn inject_into_bytes(body: &[u8], markup: &[u8]) -> Bytes {
	let at = find_marker(body).unwrap_or(body.len());
	splice(body, at, markup)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
	/// Looking for the marker
	Scanning,
	/// Markup emitted, passing chunks through
	Injected,
	/// Body ended without a marker, markup still to emit
	Trailer,
	/// Finished or failed
	Done,
}

/// Streaming body that injects markup exactly once
///
/// The wrapped body is released exactly once: when it ends, when it fails,
/// or when this stream is dropped early. After an error the stream yields
/// nothing more.
pub struct InjectedBody {
	inner: Body,
	markup: Bytes,
	pending: BytesMut,
	state: State,
}

impl InjectedBody {
	/// Wrap `inner`, injecting `markup`
	pub fn new(inner: Body, markup: impl Into<Bytes>) -> Self {
		Self {
			inner,
			markup: markup.into(),
			pending: BytesMut::new(),
			state: State::Scanning,
		}
	}

	fn fail(&mut self, err: BodyError) -> Poll<Option<Result<Bytes, BodyError>>> {
		self.state = State::Done;
		self.pending.clear();
		self.inner.close();
		Poll::Ready(Some(Err(err)))
	}
}

impl Stream for InjectedBody {
	type Item = Result<Bytes, BodyError>;

	fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		let this = self.get_mut();

		loop {
			match this.state {
				State::Done => return Poll::Ready(None),
				State::Trailer => {
					this.state = State::Done;
					return Poll::Ready(Some(Ok(std::mem::take(&mut this.markup))));
				}
				State::Injected => {
					return match this.inner.poll_next_unpin(cx) {
						Poll::Ready(Some(Err(e))) => this.fail(e),
						Poll::Ready(None) => {
							this.state = State::Done;
							Poll::Ready(None)
						}
						other => other,
					};
				}
				State::Scanning => match this.inner.poll_next_unpin(cx) {
					Poll::Pending => return Poll::Pending,
					Poll::Ready(Some(Err(e))) => return this.fail(e),
					Poll::Ready(Some(Ok(chunk))) => {
						this.pending.extend_from_slice(&chunk);

						if let Some(at) = find_marker(&this.pending) {
							let out = splice(&this.pending, at, &this.markup);
							this.pending.clear();
							this.state = State::Injected;
							return Poll::Ready(Some(Ok(out)));
						}

						let keep = partial_marker_len(&this.pending);
						let ready = this.pending.split_to(this.pending.len() - keep);
						if !ready.is_empty() {
							return Poll::Ready(Some(Ok(ready.freeze())));
						}
					}
					Poll::Ready(None) => {
						this.state = State::Trailer;
						if !this.pending.is_empty() {
							return Poll::Ready(Some(Ok(this.pending.split().freeze())));
						}
					}
				},
			}
		}
	}
}

/// Inject `markup` into the body of `response`
///
/// Buffered bodies are rewritten eagerly and get an exact `Content-Length`.
/// Streaming bodies are wrapped lazily and lose `Content-Length`.
pub fn inject_markup(mut response: Response, markup: impl Into<Bytes>) -> Response {
	let markup = markup.into();
	let body = std::mem::take(&mut response.body);

	response.body = if body.is_streaming() {
		Body::from_stream(InjectedBody::new(body, markup))
	} else {
		let original = body.as_bytes().map(|b| b.as_ref()).unwrap_or_default();
		Body::full(inject_into_bytes(original, &markup))
	};
	response.sync_content_length();
	response
}
