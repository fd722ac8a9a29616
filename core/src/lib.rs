//! Blocking REST client for a single named upstream endpoint.
//!
//! # Overview
//! [`RestClient`] targets one upstream service: paths passed to its
//! operations resolve against the root URL given at construction. Responses
//! are classified by status (400 and above fail, 204 is an empty success,
//! anything else carries a body), decoded per the `content-type` charset,
//! and handed to a caller-supplied transformer. Failures come back as
//! [`RestError`] values naming the endpoint and the resolved URL, and every
//! request feeds a latency timer and error counter in a shared
//! [`MetricsRegistry`].
//!
//! # Design
//! - One client instance per upstream endpoint, `Send + Sync`, shared by
//!   reference across threads.
//! - The client classifies statuses itself and follows redirects
//!   transparently, so only the final response is ever classified.
//! - Body interpretation is caller territory: transformers turn decoded
//!   text into values, and their failures surface as [`RestError::Parse`].
//! - Each non-error request emits one DEBUG line with a bounded body
//!   preview.

pub mod charset;
pub mod client;
pub mod error;
pub mod metrics;
pub mod truncate;

pub use client::{body_text, RestClient};
pub use error::{BoxError, RestError};
pub use metrics::{Counter, MetricsRegistry, Timer, TimerGuard};
pub use truncate::Truncated;
