//! OIDC discovery document, projected to the fields this crate needs.

use serde::{Deserialize, Serialize};

/// OIDC provider metadata, projected from the full discovery document down
/// to the fields the credential validation pipeline actually consumes.
///
/// Created on first resolution, replaced atomically on rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// The provider's issuer identifier, as asserted in the discovery
    /// document (and expected to match the `iss` claim of tokens it signs).
    pub issuer: String,
    /// The URL at which the provider publishes its JSON Web Key Set.
    pub jwks_uri: String,
}

/// Minimal shape of the `{iss}/.well-known/openid-configuration` document;
/// every other field in a real discovery document is ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct DiscoveryDocument {
    pub issuer: String,
    #[serde(default)]
    pub jwks_uri: Option<String>,
}

/// Build the OIDC discovery URL for an issuer, per the well-known
/// convention (RFC 8414 / OpenID Connect Discovery 1.0).
pub(crate) fn discovery_url(issuer: &str) -> String {
    format!(
        "{}/.well-known/openid-configuration",
        issuer.trim_end_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_url_appends_well_known_path() {
        assert_eq!(
            discovery_url("https://example.test"),
            "https://example.test/.well-known/openid-configuration"
        );
    }

    #[test]
    fn discovery_url_handles_trailing_slash() {
        assert_eq!(
            discovery_url("https://example.test/"),
            "https://example.test/.well-known/openid-configuration"
        );
    }
}
