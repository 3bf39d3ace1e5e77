//! Resource-server authentication for OAuth 2.0 / OIDC.
//!
//! Validates bearer JWTs, legacy proof-of-possession (PoP) JWTs, and
//! DPoP-bound access tokens presented to HTTP endpoints, against signing
//! keys discovered from an OpenID Connect provider's `jwks_uri`.
//!
//! The crate is organized leaves-first:
//!
//! - [`provider_cache`] resolves issuer URLs to provider metadata and JWK
//!   Sets, with live key rotation.
//! - [`credential`] is the `Credential` variant over the three token
//!   shapes, exposing per-variant verification.
//! - [`pipeline`] orchestrates one request's validation, end to end.
//! - [`challenge`] encodes the RFC 6750 `WWW-Authenticate` response.
//! - [`axum_adapter`] wires the pipeline into an axum middleware stack.
//!
//! ```no_run
//! use resource_server_auth::{AuthenticateOptions, ResourceServer};
//!
//! # async fn example() {
//! let server = ResourceServer::new();
//! let options = AuthenticateOptions::new("https://api.example.test")
//!     .realm("example")
//!     .scopes(["read"]);
//! # let _ = (server, options);
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod axum_adapter;
pub mod challenge;
pub mod claims;
pub mod credential;
pub mod error;
pub mod jwt;
pub mod options;
pub mod pipeline;
pub mod provider_cache;

pub use challenge::ChallengeEncoder;
pub use claims::Claims;
pub use credential::Credential;
pub use error::{Error, Result};
pub use options::AuthenticateOptions;
pub use pipeline::{IncomingRequest, Outcome, PipelineFailure};
pub use provider_cache::{ProviderCache, SerializedProviders};

use std::sync::Arc;

use pipeline::ValidationPipeline;

/// Entry point for the library: owns a [`ProviderCache`] and produces
/// validation pipelines / middleware for individual routes.
#[derive(Clone)]
pub struct ResourceServer {
    provider_cache: Arc<ProviderCache>,
}

impl ResourceServer {
    /// Create a server with an empty provider cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            provider_cache: Arc::new(ProviderCache::new()),
        }
    }

    /// Create a server primed with previously
    /// [`serialize`](Self::serialize)d provider entries. Restored entries
    /// are used as-is until a miss or rotation triggers a refetch.
    #[must_use]
    pub fn from_serialized(providers: SerializedProviders) -> Self {
        Self {
            provider_cache: Arc::new(ProviderCache::from_serialized(providers)),
        }
    }

    /// Snapshot the server's provider cache for persistence across process
    /// restarts.
    #[must_use]
    pub fn serialize(&self) -> SerializedProviders {
        self.provider_cache.serialize()
    }

    /// The underlying provider cache, shared by every pipeline this server
    /// runs.
    #[must_use]
    pub fn provider_cache(&self) -> &ProviderCache {
        &self.provider_cache
    }

    /// Validate one request's credential against `options`, applied to a
    /// single request rather than producing a standing middleware closure
    /// — [`axum_adapter`] adapts this into axum's middleware shape.
    ///
    /// # Errors
    ///
    /// Returns the [`PipelineFailure`] of whichever validation phase
    /// failed first.
    pub async fn authenticate(
        &self,
        options: &AuthenticateOptions,
        request: &IncomingRequest,
    ) -> std::result::Result<Outcome, PipelineFailure> {
        ValidationPipeline::new(&self.provider_cache, options)
            .run(request)
            .await
    }
}

impl Default for ResourceServer {
    fn default() -> Self {
        Self::new()
    }
}
