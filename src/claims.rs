//! Typed accessors over decoded JWT claims.
//!
//! Claims are kept as a `serde_json::Map` rather than a fixed struct because
//! the pipeline only ever needs a handful of named claims (`iss`, `aud`,
//! `sub`, `exp`, `nbf`, `iat`, `scope`, `cnf`, `token_type`) while still
//! needing to publish the *whole* claim set to the embedding application —
//! a fixed struct would silently drop custom claims on publish.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The `aud` claim, which per RFC 7519 may be a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// A single audience value.
    Single(String),
    /// A list of audience values.
    Many(Vec<String>),
}

impl Audience {
    /// Returns `true` if `value` is this audience, or is a member of it.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Self::Single(s) => s == value,
            Self::Many(v) => v.iter().any(|s| s == value),
        }
    }
}

/// Decoded, unverified JWT claims (the payload segment).
///
/// Equality of the underlying `iss` claim is always present and non-empty
/// once a [`crate::jwt::DecodedJwt`] has been constructed — callers that rely
/// on `iss` being present should decode first and treat a missing `iss` as a
/// `DECODE`-phase failure, not probe this type defensively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(pub Map<String, Value>);

impl Claims {
    /// Wrap a raw claim map.
    #[must_use]
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Look up an arbitrary claim by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `iss` (issuer) claim.
    #[must_use]
    pub fn iss(&self) -> Option<&str> {
        self.get("iss").and_then(Value::as_str)
    }

    /// The `sub` (subject) claim.
    #[must_use]
    pub fn sub(&self) -> Option<&str> {
        self.get("sub").and_then(Value::as_str)
    }

    /// The `aud` (audience) claim, normalized to [`Audience`].
    #[must_use]
    pub fn aud(&self) -> Option<Audience> {
        match self.get("aud")? {
            Value::String(s) => Some(Audience::Single(s.clone())),
            Value::Array(items) => Some(Audience::Many(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            )),
            _ => None,
        }
    }

    /// The `exp` (expiry, Unix seconds) claim.
    #[must_use]
    pub fn exp(&self) -> Option<i64> {
        self.get("exp").and_then(Value::as_i64)
    }

    /// The `nbf` (not-before, Unix seconds) claim.
    #[must_use]
    pub fn nbf(&self) -> Option<i64> {
        self.get("nbf").and_then(Value::as_i64)
    }

    /// The `iat` (issued-at, Unix seconds) claim.
    #[must_use]
    pub fn iat(&self) -> Option<i64> {
        self.get("iat").and_then(Value::as_i64)
    }

    /// The raw `scope` claim (a space-delimited string).
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.get("scope").and_then(Value::as_str)
    }

    /// The `scope` claim split into a set of individual scope names.
    #[must_use]
    pub fn scopes(&self) -> HashSet<&str> {
        self.scope()
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// The `token_type` claim, used to distinguish legacy PoP tokens.
    #[must_use]
    pub fn token_type(&self) -> Option<&str> {
        self.get("token_type").and_then(Value::as_str)
    }

    /// The `cnf.jkt` (confirmation / JWK thumbprint) claim used by DPoP.
    #[must_use]
    pub fn cnf_jkt(&self) -> Option<&str> {
        self.get("cnf")?.get("jkt")?.as_str()
    }
}
