//! RFC 6750 `WWW-Authenticate` challenge encoding.

use crate::pipeline::PipelineFailure;

/// Builds the `WWW-Authenticate` header value for a failed or missing
/// credential.
///
/// Always emits a `Bearer ` prefix, regardless of the credential scheme
/// that was detected — including DPoP, a likely gap preserved here rather
/// than guessed at; see DESIGN.md.
#[derive(Debug, Clone, Default)]
pub struct ChallengeEncoder {
    realm: Option<String>,
}

impl ChallengeEncoder {
    /// Build an encoder for a given `realm` (absent if `None`).
    #[must_use]
    pub fn new(realm: Option<String>) -> Self {
        Self { realm }
    }

    /// Encode the bare challenge for a [`PipelineFailure::MissingCredential`]
    /// — no `error` or `error_description` parameter.
    #[must_use]
    pub fn encode_bare(&self) -> String {
        self.encode_with(None, None)
    }

    /// Encode the challenge for a failure that carries an RFC 6750 `error`
    /// code and, usually, a description.
    #[must_use]
    pub fn encode_failure(&self, failure: &PipelineFailure) -> String {
        self.encode_with(failure.error_code(), failure.description())
    }

    fn encode_with(&self, error: Option<&str>, description: Option<String>) -> String {
        let mut params = Vec::new();
        if let Some(realm) = &self.realm {
            params.push(format!(r#"realm="{realm}""#));
        }
        if let Some(error) = error {
            params.push(format!(r#"error="{error}""#));
        }
        if let Some(description) = description {
            params.push(format!(r#"error_description="{description}""#));
        }

        if params.is_empty() {
            "Bearer".to_string()
        } else {
            format!("Bearer {}", params.join(", "))
        }
    }
}
