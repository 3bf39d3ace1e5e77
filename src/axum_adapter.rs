//! axum integration: surrounding glue, deliberately separate from the
//! validation pipeline, needed to make the crate directly mountable. A
//! `State`-carrying function plumbed in via
//! `axum::middleware::from_fn_with_state`, rather than a hand-rolled
//! `tower::Layer`.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::AsHeaderName;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::challenge::ChallengeEncoder;
use crate::claims::Claims;
use crate::jwt::DecodedJwt;
use crate::options::AuthenticateOptions;
use crate::pipeline::{IncomingRequest, Outcome, PipelineFailure};
use crate::ResourceServer;

/// Form bodies are only ever consulted for a single `access_token` field;
/// this bounds how much of a misbehaving request we buffer to find it.
const MAX_FORM_BODY_BYTES: usize = 16 * 1024;

/// Shared middleware state, captured by axum's `State` extractor.
#[derive(Clone)]
pub struct AuthState {
    /// The resource server whose provider cache backs key resolution.
    pub server: ResourceServer,
    /// The route's validation options.
    pub options: Arc<AuthenticateOptions>,
}

impl AuthState {
    /// Bundle a server and its options for use with
    /// [`authenticate_middleware`].
    #[must_use]
    pub fn new(server: ResourceServer, options: AuthenticateOptions) -> Self {
        Self {
            server,
            options: Arc::new(options),
        }
    }
}

/// The verified claim set, published in the request's extensions on
/// success — a fixed extension type in place of an arbitrary named
/// property.
#[derive(Debug, Clone)]
pub struct PublishedClaims(pub Claims);

/// The decoded JWT, published in the request's extensions only when
/// `token_property` is configured.
#[derive(Debug, Clone)]
pub struct PublishedJwt(pub DecodedJwt);

/// `axum::middleware::from_fn_with_state`-compatible middleware: extracts
/// a credential from the request, runs the validation pipeline, and either
/// forwards to `next` (publishing claims in the request's extensions) or
/// short-circuits with the mapped HTTP response.
pub async fn authenticate_middleware(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();

    let content_type = header_str(&parts.headers, axum::http::header::CONTENT_TYPE);
    let is_form = content_type
        .as_deref()
        .is_some_and(|ct| ct.contains("application/x-www-form-urlencoded"));

    let (form_access_token, body) = if is_form {
        match axum::body::to_bytes(body, MAX_FORM_BODY_BYTES).await {
            Ok(bytes) => {
                let token = extract_param(&bytes, "access_token");
                (token, Body::from(bytes))
            }
            Err(_) => (None, Body::empty()),
        }
    } else {
        (None, body)
    };

    let query_access_token = parts
        .uri
        .query()
        .and_then(|q| extract_param(q.as_bytes(), "access_token"));

    let incoming = IncomingRequest {
        authorization: header_str(&parts.headers, axum::http::header::AUTHORIZATION),
        dpop: header_str(&parts.headers, "dpop"),
        host: header_str(&parts.headers, axum::http::header::HOST),
        content_type,
        method: parts.method.as_str().to_string(),
        path: parts.uri.path().to_string(),
        query_access_token,
        form_access_token,
    };

    let outcome = state.server.authenticate(&state.options, &incoming).await;

    let mut request = Request::from_parts(parts, body);

    match outcome {
        Ok(Outcome::Authenticated(success)) => {
            request
                .extensions_mut()
                .insert(PublishedClaims(success.claims));
            if state.options.token_property.is_some() {
                request.extensions_mut().insert(PublishedJwt(success.jwt));
            }
            next.run(request).await
        }
        Ok(Outcome::Anonymous) => next.run(request).await,
        Err(failure) if state.options.handle_errors => error_response(&state.options, &failure),
        Err(failure) => {
            request.extensions_mut().insert(failure);
            next.run(request).await
        }
    }
}

fn error_response(options: &AuthenticateOptions, failure: &PipelineFailure) -> Response {
    let status = failure.status();
    let body = json!({
        "error": failure.error_code(),
        "error_description": failure.description(),
    });

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        return (status, Json(body)).into_response();
    }

    let encoder = ChallengeEncoder::new(options.realm.clone());
    let challenge = match failure {
        PipelineFailure::MissingCredential => encoder.encode_bare(),
        _ => encoder.encode_failure(failure),
    };

    (
        status,
        [(axum::http::header::WWW_AUTHENTICATE, challenge)],
        Json(body),
    )
        .into_response()
}

fn header_str(headers: &HeaderMap, name: impl AsHeaderName) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

fn extract_param(source: &[u8], key: &str) -> Option<String> {
    url::form_urlencoded::parse(source)
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
