//! Crate-wide infrastructure error type.
//!
//! Distinct from [`crate::provider_cache::ResolveError`] (provider metadata /
//! JWKS fetch failures) and [`crate::pipeline::PipelineFailure`] (the
//! outward-facing per-request validation outcome). `Error` covers misuse of
//! the crate's construction APIs — bad options, (de)serialization failures —
//! not anything a remote caller can trigger.

use thiserror::Error;

/// Result type alias for this crate's infrastructure-level fallible APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// Infrastructure errors raised by construction and (de)serialization APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// A caller-supplied option was invalid (e.g. an unparseable base URI).
    #[error("invalid option: {0}")]
    Config(String),

    /// Failure (de)serializing a provider cache snapshot.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// An unexpected internal condition; maps to a 500 at the pipeline boundary.
    #[error("internal error: {0}")]
    Internal(String),
}
