//! Failure modes for provider metadata / JWKS resolution.

use thiserror::Error;

/// Failure resolving an issuer's provider metadata or JWK Set.
///
/// All network/parse failure modes collapse into this single kind — the
/// pipeline maps every variant to `invalid_token` / 401 (an
/// `UpstreamError`), since from the caller's perspective the presented
/// token simply cannot be validated right now.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The discovery document or JWKS endpoint could not be reached.
    #[error("network error fetching {0}: {1}")]
    Network(&'static str, reqwest::Error),

    /// The discovery document or JWKS endpoint returned a non-2xx status.
    #[error("{0} responded with HTTP {1}")]
    HttpStatus(&'static str, http::StatusCode),

    /// The discovery document or JWKS body was not valid JSON in the
    /// expected shape.
    #[error("malformed {0} response: {1}")]
    MalformedResponse(&'static str, serde_json::Error),

    /// The discovery document did not carry a `jwks_uri`.
    #[error("provider metadata for {0} is missing jwks_uri")]
    MissingJwksUri(String),
}
