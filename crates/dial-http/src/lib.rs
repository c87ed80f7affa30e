//! # Dial HTTP
//!
//! The HTTP surface the profiler works against: a [`Request`], a
//! [`Response`] whose [`Body`] may be a lazily produced, single-consumption
//! stream of chunks, and the [`Handler`] / [`Middleware`] traits used to wrap
//! a downstream application.
//!
//! A body can be consumed by iteration (it implements
//! [`futures::Stream`]), written straight to an `AsyncWrite`, or collected
//! in full. Whichever path is taken, the body releases its underlying
//! resources exactly once.

#![warn(missing_docs)]

pub mod body;
pub mod extensions;
pub mod middleware;
pub mod request;
pub mod response;

pub use body::{Body, BodyError, BodyStream, BoxError};
pub use extensions::Extensions;
pub use middleware::{Handler, Middleware, MiddlewareChain};
pub use request::{Request, RequestBuilder};
pub use response::Response;

pub use dial_core::{Error, Result};

// Re-export the HTTP primitives so downstream crates share one version.
pub use hyper::header;
pub use hyper::{HeaderMap, Method, StatusCode, Uri, Version};
