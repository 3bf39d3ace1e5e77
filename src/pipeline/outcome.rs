//! The terminal outcomes of running a [`super::ValidationPipeline`].

use http::StatusCode;

use crate::claims::Claims;
use crate::jwt::DecodedJwt;

/// A request that passed every validation step.
#[derive(Debug, Clone)]
pub struct Success {
    /// The verified claim set, to publish at the configured claims
    /// property.
    pub claims: Claims,
    /// The decoded JWT, published at a configured token property when one
    /// is set.
    pub jwt: DecodedJwt,
}

/// What running the pipeline produced.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Validation succeeded.
    Authenticated(Success),
    /// No credential was presented, and `optional` permitted that.
    Anonymous,
}

/// Why validation failed, and the HTTP response it maps to. A single match
/// at the HTTP boundary converts this into a response, rather than
/// throwing partway through validation and catching at the edge.
#[derive(Debug, Clone)]
pub enum PipelineFailure {
    /// Malformed input at the HTTP layer: ambiguous or malformed credential
    /// presentation. Maps to 400 `invalid_request`.
    ShapeError(String),
    /// No credential was presented and one was required. Maps to 401 with
    /// a bare challenge (no error code).
    MissingCredential,
    /// Decode, PoP, key-resolution, signature, or temporal failure. Maps
    /// to 401 `invalid_token`.
    InvalidToken(String),
    /// An allow/deny policy rejected the credential. Maps to 403
    /// `access_denied`.
    AccessDenied(String),
    /// One or more required scopes were absent from the token. Maps to 403
    /// `insufficient_scope`.
    InsufficientScope(Vec<String>),
    /// Provider metadata or a JWK Set could not be fetched. Maps to 401
    /// `invalid_token` — from the caller's perspective the token simply
    /// cannot be validated right now.
    UpstreamError(String),
    /// An unexpected internal condition. Maps to 500, no challenge.
    InternalError(String),
}

impl PipelineFailure {
    /// The HTTP status this failure maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ShapeError(_) => StatusCode::BAD_REQUEST,
            Self::MissingCredential | Self::InvalidToken(_) | Self::UpstreamError(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::AccessDenied(_) | Self::InsufficientScope(_) => StatusCode::FORBIDDEN,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The RFC 6750 `error` parameter, absent for bare challenges and
    /// internal errors.
    #[must_use]
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::ShapeError(_) => Some("invalid_request"),
            Self::MissingCredential | Self::InternalError(_) => None,
            Self::InvalidToken(_) | Self::UpstreamError(_) => Some("invalid_token"),
            Self::AccessDenied(_) => Some("access_denied"),
            Self::InsufficientScope(_) => Some("insufficient_scope"),
        }
    }

    /// A human-readable `error_description`, when this failure carries one.
    #[must_use]
    pub fn description(&self) -> Option<String> {
        match self {
            Self::ShapeError(d)
            | Self::InvalidToken(d)
            | Self::AccessDenied(d)
            | Self::UpstreamError(d)
            | Self::InternalError(d) => Some(d.clone()),
            Self::MissingCredential => None,
            Self::InsufficientScope(missing) => Some(format!(
                "missing required scope(s): {}",
                missing.join(", ")
            )),
        }
    }
}
