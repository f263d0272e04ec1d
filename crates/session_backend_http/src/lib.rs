//! HTTP transport for the `session_backend` contract.
//!
//! This crate owns request building and response decoding for the session
//! service endpoints only. It performs no retries: a failed hydration is
//! surfaced to the caller, which decides how to report it.

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod headers;

pub use client::HttpSessionBackend;
pub use config::HttpBackendConfig;
pub use endpoints::normalize_base_url;
pub use error::HttpBackendError;
