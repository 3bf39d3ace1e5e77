//! Provider metadata and JWK Set cache.
//!
//! Lazily discovers OIDC provider metadata, fetches and caches JSON Web Key
//! Sets, and supports forced rotation when a signing key cannot be matched.
//! Concurrent first-time resolutions, and concurrent rotations, for the same
//! issuer coalesce into a single network round trip (single-flight fetch per
//! issuer); reads of an already-cached entry never block on I/O.

mod error;
mod metadata;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use jsonwebtoken::jwk::JwkSet;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::debug;

pub use error::ResolveError;
pub use metadata::ProviderMetadata;
use metadata::{discovery_url, DiscoveryDocument};

/// A provider's metadata paired with its current JWK Set.
///
/// Owned exclusively by [`ProviderCache`]; readers are handed an `Arc` clone
/// for the duration of a single validation, so a concurrent rotation never
/// mutates state a reader is already holding.
#[derive(Debug, Clone)]
pub struct ProviderEntry {
    /// Discovered (or restored) provider metadata.
    pub metadata: ProviderMetadata,
    /// The provider's current JSON Web Key Set.
    pub jwks: JwkSet,
}

/// Opaque, round-trippable snapshot of a [`ProviderCache`]'s contents.
#[derive(Debug, Serialize, Deserialize)]
pub struct SerializedProviders {
    entries: Vec<SerializedProviderEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedProviderEntry {
    issuer: String,
    metadata: ProviderMetadata,
    jwks: JwkSet,
}

/// Per-issuer single-flight ticket: the in-flight fetch (if any) for an
/// issuer, shared by every concurrent caller racing to resolve it.
type FetchTicket = Arc<OnceCell<Arc<ProviderEntry>>>;

/// Resolves issuer URLs to provider metadata and JWK Sets, with live
/// rotation support.
///
/// Issuer URLs are opaque cache keys — equality is byte-exact; the cache
/// performs no normalisation.
pub struct ProviderCache {
    http: reqwest::Client,
    entries: DashMap<String, Arc<ProviderEntry>>,
    resolving: DashMap<String, FetchTicket>,
    rotating: DashMap<String, FetchTicket>,
}

impl ProviderCache {
    /// Create an empty cache with a default HTTPS-only, timeout-bounded
    /// HTTP client — mirroring the gateway's own JWKS client construction.
    #[must_use]
    pub fn new() -> Self {
        Self::with_http(
            reqwest::Client::builder()
                .https_only(true)
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        )
    }

    fn with_http(http: reqwest::Client) -> Self {
        Self {
            http,
            entries: DashMap::new(),
            resolving: DashMap::new(),
            rotating: DashMap::new(),
        }
    }

    /// Build a cache whose HTTP client does not enforce `https_only` — for
    /// unit tests exercising discovery/JWKS fetch behavior (single-flight,
    /// rotation) against a plaintext loopback mock. Never reachable outside
    /// this crate's own `#[cfg(test)]` code, so the production default
    /// above is never weakened for a real caller.
    #[cfg(test)]
    fn new_for_plain_http_test() -> Self {
        Self::with_http(
            reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        )
    }

    /// Restore a cache from a previously [`serialize`](Self::serialize)d
    /// snapshot. Restored entries are used as-is until a miss or an explicit
    /// [`rotate`](Self::rotate) triggers a refetch.
    #[must_use]
    pub fn from_serialized(snapshot: SerializedProviders) -> Self {
        let cache = Self::new();
        for entry in snapshot.entries {
            cache.entries.insert(
                entry.issuer,
                Arc::new(ProviderEntry {
                    metadata: entry.metadata,
                    jwks: entry.jwks,
                }),
            );
        }
        cache
    }

    /// Snapshot the cache's current contents for persistence across process
    /// restarts. The returned value is opaque to the caller but round-trips
    /// through [`from_serialized`](Self::from_serialized).
    #[must_use]
    pub fn serialize(&self) -> SerializedProviders {
        let entries = self
            .entries
            .iter()
            .map(|kv| SerializedProviderEntry {
                issuer: kv.key().clone(),
                metadata: kv.value().metadata.clone(),
                jwks: kv.value().jwks.clone(),
            })
            .collect();
        SerializedProviders { entries }
    }

    /// Resolve an issuer to its provider entry, performing OIDC discovery
    /// and JWKS retrieval on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] on any network, HTTP-status, or parse
    /// failure during discovery or JWKS retrieval.
    pub async fn resolve(&self, iss: &str) -> Result<Arc<ProviderEntry>, ResolveError> {
        if let Some(entry) = self.entries.get(iss) {
            return Ok(entry.clone());
        }
        self.coalesced_fetch(iss, CacheOp::Resolve).await
    }

    /// Force a refetch of the issuer's JWK Set (the discovery document, if
    /// already cached, is reused). Replaces the cached entry atomically —
    /// callers already holding the previous [`ProviderEntry`] keep their
    /// (now-stale) snapshot rather than observing a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] on any network, HTTP-status, or parse
    /// failure while refetching the JWK Set.
    pub async fn rotate(&self, iss: &str) -> Result<Arc<ProviderEntry>, ResolveError> {
        self.coalesced_fetch(iss, CacheOp::Rotate).await
    }

    async fn coalesced_fetch(
        &self,
        iss: &str,
        op: CacheOp,
    ) -> Result<Arc<ProviderEntry>, ResolveError> {
        let tickets = match op {
            CacheOp::Resolve => &self.resolving,
            CacheOp::Rotate => &self.rotating,
        };

        let ticket = tickets
            .entry(iss.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let reused_metadata = match op {
            CacheOp::Rotate => self.entries.get(iss).map(|e| e.metadata.clone()),
            CacheOp::Resolve => None,
        };

        let result = ticket
            .get_or_try_init(|| self.fetch_entry(iss, reused_metadata))
            .await
            .map(Arc::clone);

        // Drop the ticket once settled so a later (non-concurrent) call
        // performs a fresh fetch instead of replaying a stale result; only
        // remove it if nobody has already installed a newer ticket for the
        // same issuer.
        tickets.remove_if(iss, |_, existing| Arc::ptr_eq(existing, &ticket));

        let entry = result?;
        self.entries.insert(iss.to_string(), entry.clone());
        Ok(entry)
    }

    async fn fetch_entry(
        &self,
        iss: &str,
        reused_metadata: Option<ProviderMetadata>,
    ) -> Result<Arc<ProviderEntry>, ResolveError> {
        let metadata = match reused_metadata {
            Some(metadata) => metadata,
            None => self.discover(iss).await?,
        };

        let jwks = self.fetch_jwks(&metadata.jwks_uri).await?;

        Ok(Arc::new(ProviderEntry { metadata, jwks }))
    }

    async fn discover(&self, iss: &str) -> Result<ProviderMetadata, ResolveError> {
        let url = discovery_url(iss);
        debug!(issuer = %iss, url = %url, "discovering OIDC provider metadata");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ResolveError::Network("discovery document", e))?;

        if !response.status().is_success() {
            return Err(ResolveError::HttpStatus(
                "discovery document",
                response.status(),
            ));
        }

        let doc: DiscoveryDocument = response
            .json()
            .await
            .map_err(|e| ResolveError::Network("discovery document", e))?;

        let jwks_uri = doc
            .jwks_uri
            .ok_or_else(|| ResolveError::MissingJwksUri(iss.to_string()))?;

        Ok(ProviderMetadata {
            issuer: doc.issuer,
            jwks_uri,
        })
    }

    async fn fetch_jwks(&self, jwks_uri: &str) -> Result<JwkSet, ResolveError> {
        debug!(jwks_uri = %jwks_uri, "fetching JWK Set");

        let response = self
            .http
            .get(jwks_uri)
            .send()
            .await
            .map_err(|e| ResolveError::Network("JWKS", e))?;

        if !response.status().is_success() {
            return Err(ResolveError::HttpStatus("JWKS", response.status()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ResolveError::Network("JWKS", e))?;

        serde_json::from_slice(&bytes).map_err(|e| ResolveError::MalformedResponse("JWKS", e))
    }
}

impl Default for ProviderCache {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
enum CacheOp {
    Resolve,
    Rotate,
}
