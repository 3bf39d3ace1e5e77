//! A framework-agnostic view of the request fields the pipeline needs,
//! decoupling [`super::ValidationPipeline`] from any particular web
//! framework's request type.

/// The slice of an incoming HTTP request [`super::ValidationPipeline::run`]
/// consumes.
#[derive(Debug, Clone, Default)]
pub struct IncomingRequest {
    /// The `Authorization` header value, if present.
    pub authorization: Option<String>,
    /// The `DPoP` header value (the proof JWT), if present.
    pub dpop: Option<String>,
    /// The `Host` header value, if present.
    pub host: Option<String>,
    /// The `Content-Type` header value, if present.
    pub content_type: Option<String>,
    /// The request's HTTP method, uppercase (e.g. `"GET"`).
    pub method: String,
    /// The request path, without a query string.
    pub path: String,
    /// The `access_token` query parameter, if present.
    pub query_access_token: Option<String>,
    /// The `access_token` form-body parameter, if present. Only consulted
    /// when `content_type` includes `application/x-www-form-urlencoded`.
    pub form_access_token: Option<String>,
}
