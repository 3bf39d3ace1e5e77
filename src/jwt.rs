//! Structural JWT decoding — three-segment split, base64url, header/claim
//! parsing. Deliberately does **not** verify a signature; signature
//! verification is delegated to `jsonwebtoken` once a signing key has been
//! resolved (see [`crate::credential`]).

use base64::Engine as _;
use jsonwebtoken::jwk::Jwk;
use serde::Deserialize;
use thiserror::Error;

use crate::claims::Claims;

/// Failure decoding the structural shape of a JWT.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The token did not split into exactly three `.`-separated segments.
    #[error("token does not have three segments")]
    WrongSegmentCount,

    /// A segment was not valid base64url.
    #[error("invalid base64url encoding: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// The header or payload segment was not valid JSON, or declared an
    /// unsupported/unsafe algorithm (e.g. `alg: none`).
    #[error("invalid JWT segment JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// The decoded JWT header (`alg`, `kid`, `typ`, optional embedded `jwk`).
#[derive(Debug, Clone, Deserialize)]
pub struct JwtHeader {
    /// Signing algorithm declared by the token.
    ///
    /// `jsonwebtoken::Algorithm` has no `none` variant, so a header
    /// declaring `"alg":"none"` fails to deserialize and is rejected here —
    /// the first line of defense against algorithm-confusion attacks.
    pub alg: jsonwebtoken::Algorithm,
    /// Key ID, used to select a signing key from a JWK Set.
    #[serde(default)]
    pub kid: Option<String>,
    /// Declared token type (e.g. `"JWT"`, `"dpop+jwt"`).
    #[serde(default)]
    pub typ: Option<String>,
    /// An embedded JWK (used by DPoP proof JWTs, which are self-signed).
    #[serde(default)]
    pub jwk: Option<Jwk>,
}

/// A structurally decoded JWT: header, claims, and the raw compact
/// serialization needed to re-verify the signature once a key is known.
#[derive(Debug, Clone)]
pub struct DecodedJwt {
    /// Parsed header.
    pub header: JwtHeader,
    /// Parsed, unverified claims.
    pub claims: Claims,
    /// The original compact (`header.payload.signature`) string.
    pub raw: String,
}

impl DecodedJwt {
    /// Split, base64url-decode and JSON-parse a compact JWT without
    /// verifying its signature.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the token is not a well-formed three-part
    /// JWT, or if either segment is not valid JSON (including a header that
    /// declares an unsupported algorithm).
    pub fn decode(token: &str) -> Result<Self, DecodeError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(DecodeError::WrongSegmentCount);
        }

        let header_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(parts[0])?;
        let payload_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(parts[1])?;

        let header: JwtHeader = serde_json::from_slice(&header_bytes)?;
        let claims: serde_json::Map<String, serde_json::Value> =
            serde_json::from_slice(&payload_bytes)?;

        Ok(Self {
            header,
            claims: Claims::new(claims),
            raw: token.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_segment(value: &serde_json::Value) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(value.to_string())
    }

    fn make_token(header: &serde_json::Value, claims: &serde_json::Value) -> String {
        format!(
            "{}.{}.{}",
            encode_segment(header),
            encode_segment(claims),
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("sig")
        )
    }

    #[test]
    fn decodes_well_formed_token() {
        let token = make_token(
            &serde_json::json!({"alg": "RS256", "kid": "k1"}),
            &serde_json::json!({"iss": "https://example.test", "sub": "alice"}),
        );
        let decoded = DecodedJwt::decode(&token).unwrap();
        assert_eq!(decoded.header.kid.as_deref(), Some("k1"));
        assert_eq!(decoded.claims.iss(), Some("https://example.test"));
        assert_eq!(decoded.claims.sub(), Some("alice"));
    }

    #[test]
    fn rejects_wrong_segment_count() {
        assert!(matches!(
            DecodedJwt::decode("not-a-jwt"),
            Err(DecodeError::WrongSegmentCount)
        ));
        assert!(matches!(
            DecodedJwt::decode("a.b"),
            Err(DecodeError::WrongSegmentCount)
        ));
    }

    #[test]
    fn rejects_alg_none() {
        let token = make_token(&serde_json::json!({"alg": "none"}), &serde_json::json!({}));
        assert!(matches!(
            DecodedJwt::decode(&token),
            Err(DecodeError::InvalidJson(_))
        ));
    }

    #[test]
    fn rejects_invalid_base64() {
        let token = "not base64!.also not base64!.sig";
        assert!(matches!(
            DecodedJwt::decode(token),
            Err(DecodeError::InvalidBase64(_))
        ));
    }

    #[test]
    fn aud_accessor_normalizes_string_and_list() {
        let token = make_token(
            &serde_json::json!({"alg": "RS256"}),
            &serde_json::json!({"aud": "client-1"}),
        );
        let decoded = DecodedJwt::decode(&token).unwrap();
        assert_eq!(
            decoded.claims.aud(),
            Some(crate::claims::Audience::Single("client-1".to_string()))
        );

        let token = make_token(
            &serde_json::json!({"alg": "RS256"}),
            &serde_json::json!({"aud": ["client-1", "client-2"]}),
        );
        let decoded = DecodedJwt::decode(&token).unwrap();
        assert_eq!(
            decoded.claims.aud(),
            Some(crate::claims::Audience::Many(vec![
                "client-1".to_string(),
                "client-2".to_string()
            ]))
        );
    }
}
