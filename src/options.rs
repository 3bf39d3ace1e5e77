//! Per-route options for [`crate::ResourceServer::authenticate`].

use crate::pipeline::policy::PolicyFilters;

/// Options controlling how one route validates a presented credential.
#[derive(Debug, Clone)]
pub struct AuthenticateOptions {
    /// Value of the `realm` parameter in challenges.
    pub realm: Option<String>,
    /// Required scopes; empty skips the SCOPE check.
    pub scopes: Vec<String>,
    /// Allowlist filter, evaluated before `deny`.
    pub allow: Option<PolicyFilters>,
    /// Denylist filter.
    pub deny: Option<PolicyFilters>,
    /// Permit `?access_token=` credential presentation (RFC 6750 §2.3
    /// warns against this; default `false`).
    pub query: bool,
    /// If `true`, an absent credential yields [`crate::pipeline::Outcome::Anonymous`]
    /// instead of [`crate::pipeline::PipelineFailure::MissingCredential`].
    pub optional: bool,
    /// If `true` (the default), the adapter writes an error body directly;
    /// if `false`, the failure is forwarded to a surrounding error
    /// handler instead.
    pub handle_errors: bool,
    /// If set, publish the decoded JWT in the request's extension map
    /// under this logical name, in addition to `claims_property`.
    pub token_property: Option<String>,
    /// Logical name under which to publish claims (default `"claims"`).
    pub claims_property: String,
    /// The resource server's canonical base URI (scheme + host), used to
    /// reconstruct a DPoP proof's expected `htu`.
    ///
    /// DPoP verification cannot proceed without knowing the server's own
    /// origin; see DESIGN.md for the reasoning.
    pub base_uri: String,
}

impl AuthenticateOptions {
    /// Start from a base URI (required for DPoP `htu` reconstruction)
    /// with every other option at its documented default.
    #[must_use]
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            realm: None,
            scopes: Vec::new(),
            allow: None,
            deny: None,
            query: false,
            optional: false,
            handle_errors: true,
            token_property: None,
            claims_property: "claims".to_string(),
            base_uri: base_uri.into(),
        }
    }

    /// Set the challenge `realm`.
    #[must_use]
    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    /// Set the required scopes.
    #[must_use]
    pub fn scopes(mut self, scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the allowlist filter.
    #[must_use]
    pub fn allow(mut self, allow: PolicyFilters) -> Self {
        self.allow = Some(allow);
        self
    }

    /// Set the denylist filter.
    #[must_use]
    pub fn deny(mut self, deny: PolicyFilters) -> Self {
        self.deny = Some(deny);
        self
    }

    /// Permit `?access_token=` credential presentation.
    #[must_use]
    pub fn query(mut self, query: bool) -> Self {
        self.query = query;
        self
    }

    /// Allow unauthenticated pass-through when no credential is presented.
    #[must_use]
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Control whether the adapter writes error responses itself.
    #[must_use]
    pub fn handle_errors(mut self, handle_errors: bool) -> Self {
        self.handle_errors = handle_errors;
        self
    }

    /// Additionally publish the decoded JWT at the given extension name.
    #[must_use]
    pub fn token_property(mut self, name: impl Into<String>) -> Self {
        self.token_property = Some(name.into());
        self
    }

    /// Override the extension name claims are published under.
    #[must_use]
    pub fn claims_property(mut self, name: impl Into<String>) -> Self {
        self.claims_property = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let options = AuthenticateOptions::new("https://example.test");
        assert!(options.scopes.is_empty());
        assert!(!options.query);
        assert!(!options.optional);
        assert!(options.handle_errors);
        assert_eq!(options.claims_property, "claims");
        assert!(options.token_property.is_none());
    }

    #[test]
    fn builder_overrides_apply() {
        let options = AuthenticateOptions::new("https://example.test")
            .realm("api")
            .scopes(["read", "write"])
            .query(true)
            .optional(true)
            .handle_errors(false)
            .token_property("jwt")
            .claims_property("auth");

        assert_eq!(options.realm.as_deref(), Some("api"));
        assert_eq!(options.scopes, vec!["read".to_string(), "write".to_string()]);
        assert!(options.query);
        assert!(options.optional);
        assert!(!options.handle_errors);
        assert_eq!(options.token_property.as_deref(), Some("jwt"));
        assert_eq!(options.claims_property, "auth");
    }
}
