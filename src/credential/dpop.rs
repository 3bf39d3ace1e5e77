//! DPoP proof verification: a self-contained check binding an access token
//! to a per-request proof signed by a client-held key.

use jsonwebtoken::{DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::credential::thumbprint::jwk_thumbprint;
use crate::jwt::DecodedJwt;

/// Failure verifying a DPoP proof against its bound access token and the
/// current request. Every variant maps uniformly to `invalid_token` at the
/// pipeline boundary, with a descriptive message rather than a distinct
/// status per failure mode.
#[derive(Debug, Error)]
pub enum DpopError {
    /// No `DPoP` proof header was presented alongside a `DPoP`-scheme
    /// credential.
    #[error("no DPoP proof was presented")]
    MissingProof,
    /// The proof did not decode as a well-formed JWT.
    #[error("DPoP proof is not a well-formed JWT: {0}")]
    InvalidJwt(String),
    /// The proof's header did not carry an embedded `jwk`.
    #[error("DPoP proof header is missing an embedded jwk")]
    MissingJwk,
    /// The embedded `jwk` could not be thumbprinted (e.g. a symmetric key).
    #[error("DPoP proof jwk cannot be used for key binding: {0}")]
    UnsupportedJwk(String),
    /// The proof's signature did not verify under its own embedded `jwk`.
    #[error("DPoP proof signature is invalid")]
    InvalidSignature,
    /// The embedded `jwk`'s thumbprint does not match the access token's
    /// `cnf.jkt` claim.
    #[error("DPoP proof key does not match the access token's cnf.jkt")]
    JktMismatch,
    /// `htu` does not match the reconstructed request target.
    #[error("DPoP proof htu does not match the request")]
    UriMismatch,
    /// `htm` does not match the request's HTTP method.
    #[error("DPoP proof htm does not match the request method")]
    MethodMismatch,
}

#[derive(Debug, Deserialize)]
struct DpopClaims {
    #[serde(default)]
    htm: Option<String>,
    #[serde(default)]
    htu: Option<String>,
}

/// Everything [`verify`] needs: the raw proof, the request it accompanied,
/// the server's configured base URI, and the access token's key binding.
#[derive(Debug, Clone, Copy)]
pub struct DPoPContext<'a> {
    /// The raw compact DPoP proof JWT (from the `DPoP` request header).
    pub proof_jwt: &'a str,
    /// The request's HTTP method, uppercase.
    pub method: &'a str,
    /// The request's `Host` header, if present.
    pub host: Option<&'a str>,
    /// The request's path (no query string).
    pub path: &'a str,
    /// The resource server's configured canonical base URI.
    pub base_uri: &'a str,
    /// The access token's `cnf.jkt` claim, if present.
    pub expected_jkt: Option<&'a str>,
}

/// Verify a DPoP proof: decode, verify its own signature, check thumbprint
/// binding, then `htu` and `htm`.
///
/// # Errors
///
/// Returns the specific [`DpopError`] variant for whichever check failed
/// first; checks run in that order (decode, signature, thumbprint binding,
/// `htu`, `htm`).
pub fn verify(ctx: DPoPContext<'_>) -> Result<(), DpopError> {
    let decoded =
        DecodedJwt::decode(ctx.proof_jwt).map_err(|e| DpopError::InvalidJwt(e.to_string()))?;

    let jwk = decoded.header.jwk.clone().ok_or(DpopError::MissingJwk)?;

    let decoding_key = DecodingKey::from_jwk(&jwk).map_err(|_| DpopError::MissingJwk)?;
    let mut validation = Validation::new(decoded.header.alg);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let token_data = jsonwebtoken::decode::<DpopClaims>(ctx.proof_jwt, &decoding_key, &validation)
        .map_err(|_| DpopError::InvalidSignature)?;

    if let Some(expected) = ctx.expected_jkt {
        let actual = jwk_thumbprint(&jwk).map_err(DpopError::UnsupportedJwk)?;
        if actual != expected {
            return Err(DpopError::JktMismatch);
        }
    }

    let expected_htu =
        reconstruct_htu(ctx.base_uri, ctx.host, ctx.path).ok_or(DpopError::UriMismatch)?;
    let presented_htu = token_data
        .claims
        .htu
        .as_deref()
        .ok_or(DpopError::UriMismatch)?;
    if !htu_eq(&expected_htu, presented_htu) {
        return Err(DpopError::UriMismatch);
    }

    let presented_htm = token_data
        .claims
        .htm
        .as_deref()
        .ok_or(DpopError::MethodMismatch)?;
    if presented_htm != ctx.method {
        return Err(DpopError::MethodMismatch);
    }

    Ok(())
}

/// Build the expected `htu` from the server's configured base URI and the
/// request path. If the request's `Host` header is a subdomain of the
/// configured host (dot-aligned suffix match), the request's host is
/// substituted instead — preserved as-is though it widens `htu` acceptance
/// beyond what RFC 9449 describes; see DESIGN.md.
fn reconstruct_htu(base_uri: &str, host_header: Option<&str>, path: &str) -> Option<String> {
    let base = Url::parse(base_uri).ok()?;
    let scheme = base.scheme();
    let configured_host = base.host_str()?;

    let host = match host_header {
        Some(h) if is_subdomain(h, configured_host) => h,
        _ => configured_host,
    };

    Some(format!("{scheme}://{host}{path}"))
}

/// `true` if `host` equals `configured`, or is a dot-aligned subdomain of
/// it (a trailing port on `host` is ignored for the comparison).
fn is_subdomain(host: &str, configured: &str) -> bool {
    let host = host.split(':').next().unwrap_or(host).to_ascii_lowercase();
    let configured = configured.to_ascii_lowercase();
    host == configured || host.ends_with(&format!(".{configured}"))
}

/// Compare two `htu` values for equality, tolerant of scheme/host case and
/// a default-vs-explicit port, as real HTTP stacks are.
fn htu_eq(expected: &str, presented: &str) -> bool {
    match (Url::parse(expected), Url::parse(presented)) {
        (Ok(e), Ok(p)) => {
            e.scheme().eq_ignore_ascii_case(p.scheme())
                && e.host_str().map(str::to_ascii_lowercase)
                    == p.host_str().map(str::to_ascii_lowercase)
                && e.port_or_known_default() == p.port_or_known_default()
                && e.path() == p.path()
        }
        _ => expected == presented,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RSA-2048 DPoP client keypair and RS256-signed proof generated once via
    // `openssl`; thumbprint computed independently to cross-check
    // `jwk_thumbprint`'s canonical form.
    const DPOP_PROOF: &str = "eyJhbGciOiJSUzI1NiIsInR5cCI6ImRwb3Arand0IiwiandrIjp7Imt0eSI6IlJTQSIsIm4iOiJ2elZHa2xmVGFaZGRWdDBVa25LX3Z2ekpVWGtXMEY2V1BsS0tuck1rRjg2MEJUUDROajRTeGtBUmdFR2lZT0E0R3VKMWcwc3RTQktHczlTaFFQWVRQeDA1Yk54X1oxUWxvZnloWmNYWTlQNTN1MC1uSmtBSHlRU2p3MGZWaUtYSzJ2UGFINWFRMTUzdl9DbktLNmI3Qm9lTHBQeEZVUGlUQ2E2ZFJKZFUyaVNEVXVGNzR2M1Z5Ql9PdHBUWFc5SkExWW9HVlVJajNhdHdHNGNScXlJclA5NFRCd216eWcySk1sOXlKRjFGZElSbnA4NVpUR0lDZl9fVlpTWmhzWU03bzJwaTJaWFhVdFJOVTFWRWFwMEtjREViRzdKMk9GTk92RVpmV0FRS21aOG5ramJoZHdIOExZVWxKZ2lveW1NSk5uZ0lsV0JDMGhvcWgxZm12aU9CNXciLCJlIjoiQVFBQiJ9fQ.eyJodG0iOiJHRVQiLCJodHUiOiJodHRwczovL2V4YW1wbGUudGVzdC9yZXNvdXJjZSIsImlhdCI6MTcwMDAwMDAwMCwianRpIjoicHJvb2YtanRpLTEifQ.FkQ37kTwsigH2jtzb6cxvNsZJt97eMGAVV3l7omCtIEVGa9wqhYN3YnqOZ0GoCNoY7S_7SWvYACUwtQZE0B0kaGNCcIt1Zt2TDNm2XIhj4d5ahfkd5wStO3Slm6YJU1nf8Eo-K9lMMU3uEMb3Njrfqv65IZKAn7uTubmIRoOr5w8I9qLqBsatF6jDEXtDcNGvvKjhWeEzMLCfN_279vDPXri4Ux-ae5a3IztlPOV0-CE-8-XHdrS730pqeA_0uLjpPSLWllDO7JJjo_jq5t7-aYiSc4GwamBxi-SZGuLAsIrQSR7PhpUuaYmBt48deRa1zDkvHBFF3T25nVPFamTuA";
    const DPOP_THUMBPRINT: &str = "jXIZ6Xez7DgVbdTxiPSsse8b4d8g7H4u3D61ncRSR6k";

    fn base_ctx(expected_jkt: Option<&'static str>) -> DPoPContext<'static> {
        DPoPContext {
            proof_jwt: DPOP_PROOF,
            method: "GET",
            host: None,
            path: "/resource",
            base_uri: "https://example.test",
            expected_jkt,
        }
    }

    #[test]
    fn verifies_matching_proof() {
        assert!(verify(base_ctx(Some(DPOP_THUMBPRINT))).is_ok());
    }

    #[test]
    fn rejects_jkt_mismatch() {
        let err = verify(base_ctx(Some("not-the-real-thumbprint"))).unwrap_err();
        assert!(matches!(err, DpopError::JktMismatch));
    }

    #[test]
    fn rejects_method_mismatch() {
        let mut ctx = base_ctx(Some(DPOP_THUMBPRINT));
        ctx.method = "POST";
        let err = verify(ctx).unwrap_err();
        assert!(matches!(err, DpopError::MethodMismatch));
    }

    #[test]
    fn rejects_htu_mismatch() {
        let mut ctx = base_ctx(Some(DPOP_THUMBPRINT));
        ctx.path = "/other-resource";
        let err = verify(ctx).unwrap_err();
        assert!(matches!(err, DpopError::UriMismatch));
    }

    #[test]
    fn reconstruct_htu_substitutes_subdomain_host() {
        let htu = reconstruct_htu(
            "https://example.test",
            Some("api.example.test"),
            "/resource",
        )
        .unwrap();
        assert_eq!(htu, "https://api.example.test/resource");
    }

    #[test]
    fn reconstruct_htu_ignores_unrelated_host() {
        let htu = reconstruct_htu("https://example.test", Some("evil.example"), "/resource")
            .unwrap();
        assert_eq!(htu, "https://example.test/resource");
    }

    #[test]
    fn verify_rejects_when_request_host_changes_reconstructed_htu() {
        let mut ctx = base_ctx(Some(DPOP_THUMBPRINT));
        ctx.host = Some("api.example.test");
        // The fixture's proof was signed over htu="https://example.test/resource";
        // substituting the subdomain host changes the expected value, so
        // verification now fails — the substitution is genuinely applied.
        let err = verify(ctx).unwrap_err();
        assert!(matches!(err, DpopError::UriMismatch));
    }

    #[test]
    fn is_subdomain_matches_dot_aligned_suffix_only() {
        assert!(is_subdomain("api.example.test", "example.test"));
        assert!(is_subdomain("example.test", "example.test"));
        assert!(!is_subdomain("notexample.test", "example.test"));
        assert!(!is_subdomain("example.test.evil", "example.test"));
    }

    #[test]
    fn htu_eq_tolerates_default_port_and_case() {
        assert!(htu_eq(
            "https://Example.test/resource",
            "https://example.test:443/resource"
        ));
        assert!(!htu_eq(
            "https://example.test/resource",
            "https://example.test/other"
        ));
    }

    #[test]
    fn rejects_proof_missing_embedded_jwk() {
        use base64::Engine as _;
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let header = engine.encode(serde_json::json!({"alg": "RS256", "typ": "dpop+jwt"}).to_string());
        let payload = engine.encode(
            serde_json::json!({"htm": "GET", "htu": "https://example.test/resource"}).to_string(),
        );
        let proof = format!("{header}.{payload}.sig");
        let ctx = DPoPContext {
            proof_jwt: &proof,
            method: "GET",
            host: None,
            path: "/resource",
            base_uri: "https://example.test",
            expected_jkt: None,
        };
        let err = verify(ctx).unwrap_err();
        assert!(matches!(err, DpopError::MissingJwk));
    }
}
