//! mfapi-core: session handling and metric publishing for a remote
//! monitoring backend.
//!
//! `MfClient::new_session()` registers the caller's identity with the
//! backend and keeps the experiment id it hands back. `MfClient::update()`
//! stamps, serializes and posts one metric per call. All I/O is a single
//! blocking request/response through the `Publisher`.

pub mod client;
pub mod error;
pub mod hostname;
pub mod models;
pub mod publisher;
pub mod timestamp;

pub use client::{MfClient, Session};
pub use error::{MfError, Result};
pub use models::{Metric, MetricValue, SessionConfig, DEFAULT_APPLICATION, DEFAULT_JOB_ID};
pub use publisher::Publisher;
pub use timestamp::{current_timestamp, TimestampPrecision};
