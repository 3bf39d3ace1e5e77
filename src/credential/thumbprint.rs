//! RFC 7638 JWK Thumbprint computation, used to bind a DPoP proof's key to
//! an access token's `cnf.jkt` claim.

use base64::Engine as _;
use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk};
use sha2::{Digest, Sha256};

/// Compute the base64url-encoded SHA-256 thumbprint of a JWK's required
/// members, per RFC 7638. Supports RSA, EC and OKP (e.g. Ed25519) keys —
/// the three shapes a DPoP proof's embedded `jwk` can realistically take.
///
/// # Errors
///
/// Returns an error string for symmetric (`oct`) keys, which have no
/// standard JWK thumbprint member set suitable for this use.
pub fn jwk_thumbprint(jwk: &Jwk) -> Result<String, String> {
    // RFC 7638 §3.2: members in lexicographic order, no insignificant whitespace.
    let canonical = match &jwk.algorithm {
        AlgorithmParameters::RSA(p) => {
            format!(r#"{{"e":"{}","kty":"RSA","n":"{}"}}"#, p.e, p.n)
        }
        AlgorithmParameters::EllipticCurve(p) => format!(
            r#"{{"crv":"{}","kty":"EC","x":"{}","y":"{}"}}"#,
            curve_name(&p.curve),
            p.x,
            p.y
        ),
        AlgorithmParameters::OctetKeyPair(p) => format!(
            r#"{{"crv":"{}","kty":"OKP","x":"{}"}}"#,
            curve_name(&p.curve),
            p.x
        ),
        AlgorithmParameters::OctetKey(_) => {
            return Err("symmetric (oct) keys are not supported for DPoP binding".to_string())
        }
    };

    let digest = Sha256::digest(canonical.as_bytes());
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest))
}

fn curve_name(curve: &EllipticCurve) -> &'static str {
    match curve {
        EllipticCurve::P256 => "P-256",
        EllipticCurve::P384 => "P-384",
        EllipticCurve::P521 => "P-521",
        EllipticCurve::Ed25519 => "Ed25519",
    }
}
