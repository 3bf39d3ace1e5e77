//! Orchestrates the ordered validation of one request.
//!
//! ```text
//! EXTRACT → REQUIRE → DECODE → POP_VERIFY → POLICY → KEY+SIG → TEMPORAL → SCOPE → SUCCESS
//! ```
//!
//! Each phase either falls through to the next or short-circuits to a
//! terminal [`PipelineFailure`] — an explicit sum type in place of
//! chained-callback-and-throw control flow.

pub mod policy;
mod request;

mod outcome;

pub use outcome::{Outcome, PipelineFailure, Success};
pub use request::IncomingRequest;

use crate::credential::{Credential, RequestContext, TokenType};
use crate::jwt::DecodedJwt;
use crate::options::AuthenticateOptions;
use crate::pipeline::policy::PolicyCheck;
use crate::provider_cache::ProviderCache;

/// Runs the full credential validation pipeline for one request.
pub struct ValidationPipeline<'a> {
    provider_cache: &'a ProviderCache,
    options: &'a AuthenticateOptions,
}

impl<'a> ValidationPipeline<'a> {
    /// Build a pipeline for one request, against a shared provider cache
    /// and a route's options.
    #[must_use]
    pub fn new(provider_cache: &'a ProviderCache, options: &'a AuthenticateOptions) -> Self {
        Self {
            provider_cache,
            options,
        }
    }

    /// Run every phase in order against `request`, short-circuiting on the
    /// first failure.
    pub async fn run(&self, request: &IncomingRequest) -> Result<Outcome, PipelineFailure> {
        let Extracted { token, token_type } = self.extract(request)?;

        let Some(token) = token else {
            return if self.options.optional {
                Ok(Outcome::Anonymous)
            } else {
                Err(PipelineFailure::MissingCredential)
            };
        };

        let decoded = DecodedJwt::decode(&token)
            .map_err(|e| PipelineFailure::InvalidToken(format!("access token is not a JWT: {e}")))?;

        let ctx = RequestContext {
            method: request.method.clone(),
            host: request.host.clone(),
            path: request.path.clone(),
            dpop_proof: request.dpop.clone(),
        };
        let mut credential = Credential::from_jwt(decoded, token_type, ctx);

        if credential.is_pop_token() || credential.is_dpop_token() {
            credential
                .validate_pop_token(&self.options.base_uri)
                .map_err(|e| PipelineFailure::InvalidToken(e.to_string()))?;
        }

        self.evaluate_policy(&credential, token_type)?;

        self.resolve_and_verify(&mut credential).await?;

        let now = chrono::Utc::now().timestamp();
        credential
            .validate_expiry(now)
            .map_err(|e| PipelineFailure::InvalidToken(e.to_string()))?;
        credential
            .validate_not_before(now)
            .map_err(|e| PipelineFailure::InvalidToken(e.to_string()))?;

        credential
            .validate_scope(&self.options.scopes)
            .map_err(PipelineFailure::InsufficientScope)?;

        Ok(Outcome::Authenticated(Success {
            claims: credential.claims().clone(),
            jwt: credential.jwt().clone(),
        }))
    }

    fn extract(&self, request: &IncomingRequest) -> Result<Extracted, PipelineFailure> {
        let mut found = Extracted {
            token: None,
            token_type: TokenType::Bearer,
        };
        let mut sources = 0u8;

        if let Some(header) = &request.authorization {
            let components: Vec<&str> = header.split_whitespace().collect();
            let (scheme, credentials) = match components.as_slice() {
                [scheme, credentials] => (*scheme, *credentials),
                _ => {
                    return Err(PipelineFailure::ShapeError(
                        "Authorization header must have exactly two components".to_string(),
                    ))
                }
            };
            found.token_type = match scheme.to_ascii_lowercase().as_str() {
                "bearer" => TokenType::Bearer,
                "dpop" => TokenType::DPoP,
                _ => {
                    return Err(PipelineFailure::ShapeError(format!(
                        "unsupported Authorization scheme: {scheme}"
                    )))
                }
            };
            found.token = Some(credentials.to_string());
            sources += 1;
        }

        if let Some(query_token) = &request.query_access_token {
            if !self.options.query {
                return Err(PipelineFailure::ShapeError(
                    "query parameter authentication is disabled".to_string(),
                ));
            }
            found.token = Some(query_token.clone());
            sources += 1;
        }

        let is_form = request
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/x-www-form-urlencoded"));
        if is_form {
            if let Some(form_token) = &request.form_access_token {
                found.token = Some(form_token.clone());
                sources += 1;
            }
        }

        if sources > 1 {
            return Err(PipelineFailure::ShapeError(
                "multiple authentication methods".to_string(),
            ));
        }

        Ok(found)
    }

    fn evaluate_policy(
        &self,
        credential: &Credential,
        token_type: TokenType,
    ) -> Result<(), PipelineFailure> {
        let check = PolicyCheck {
            iss: credential.iss(),
            aud: credential.aud(),
            sub: credential.sub(),
            is_bearer: matches!(token_type, TokenType::Bearer),
        };

        if let Some(allow) = &self.options.allow {
            if let Some(failed) = allow.evaluate_allow(&check) {
                return Err(PipelineFailure::AccessDenied(format!(
                    "claim '{failed}' not permitted by allow list"
                )));
            }
        }

        if let Some(deny) = &self.options.deny {
            if let Some(matched) = deny.evaluate_deny(&check) {
                return Err(PipelineFailure::AccessDenied(format!(
                    "claim '{matched}' matched deny list"
                )));
            }
        }

        Ok(())
    }

    async fn resolve_and_verify(&self, credential: &mut Credential) -> Result<(), PipelineFailure> {
        let iss = credential
            .iss()
            .ok_or_else(|| PipelineFailure::InvalidToken("token has no iss claim".to_string()))?
            .to_string();

        let entry = self
            .provider_cache
            .resolve(&iss)
            .await
            .map_err(|e| PipelineFailure::UpstreamError(e.to_string()))?;

        if !credential.resolve_keys(&entry.jwks) {
            let entry = self
                .provider_cache
                .rotate(&iss)
                .await
                .map_err(|e| PipelineFailure::UpstreamError(e.to_string()))?;
            if !credential.resolve_keys(&entry.jwks) {
                return Err(PipelineFailure::InvalidToken(
                    "cannot find key to verify JWT signature".to_string(),
                ));
            }
        }

        if !credential.verify_signature() {
            return Err(PipelineFailure::InvalidToken(
                "signature verification failed".to_string(),
            ));
        }

        Ok(())
    }
}

struct Extracted {
    token: Option<String>,
    token_type: TokenType,
}
