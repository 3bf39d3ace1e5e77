//! Allow/deny policy filters.

use std::sync::Arc;

use crate::claims::Audience;

/// A list-or-predicate filter over a scalar claim (`iss` or `sub`) — an
/// explicit tagged union in place of a runtime-polymorphic
/// "list-or-function" shape.
#[derive(Clone)]
pub enum ScalarFilter {
    /// Membership test against an explicit list.
    List(Vec<String>),
    /// An arbitrary predicate over the claim value.
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl ScalarFilter {
    fn matches(&self, value: &str) -> bool {
        match self {
            Self::List(items) => items.iter().any(|i| i == value),
            Self::Predicate(p) => p(value),
        }
    }
}

impl std::fmt::Debug for ScalarFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// A list-or-predicate filter over the `aud` claim, which may itself be a
/// single string or a list.
#[derive(Clone)]
pub enum AudienceFilter {
    /// Membership (scalar `aud`) or intersection (list `aud`) test.
    List(Vec<String>),
    /// An arbitrary predicate, invoked with the claim as-is.
    Predicate(Arc<dyn Fn(&Audience) -> bool + Send + Sync>),
}

impl AudienceFilter {
    fn matches(&self, aud: &Audience) -> bool {
        match self {
            Self::List(items) => match aud {
                Audience::Single(s) => items.iter().any(|i| i == s),
                Audience::Many(values) => values.iter().any(|v| items.contains(v)),
            },
            Self::Predicate(p) => p(aud),
        }
    }
}

impl std::fmt::Debug for AudienceFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// An `allow` or `deny` policy. Each sub-filter is independently optional —
/// an absent filter skips that check entirely. The same shape serves both
/// `allow` and `deny`.
#[derive(Debug, Clone, Default)]
pub struct PolicyFilters {
    /// Filter over the `iss` claim.
    pub issuers: Option<ScalarFilter>,
    /// Filter over the `aud` claim.
    pub audience: Option<AudienceFilter>,
    /// Filter over the `sub` claim.
    pub subjects: Option<ScalarFilter>,
}

/// The claims a policy check is evaluated against, plus enough context to
/// apply the bearer-only `aud` gating rule.
pub struct PolicyCheck<'a> {
    /// The `iss` claim.
    pub iss: Option<&'a str>,
    /// The `aud` claim.
    pub aud: Option<Audience>,
    /// The `sub` claim.
    pub sub: Option<&'a str>,
    /// `true` for a plain bearer token. `evaluate_allow`'s `aud` check is
    /// only enforced for bearer tokens — PoP-bound tokens prove audience via
    /// possession. `evaluate_deny` has no such gate: a denylisted `aud`
    /// rejects regardless of scheme.
    pub is_bearer: bool,
}

impl PolicyFilters {
    /// `true` if every configured field is absent — an always-absent
    /// policy carries no filters to evaluate.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issuers.is_none() && self.audience.is_none() && self.subjects.is_none()
    }

    /// Evaluate as an `allow` list: every present sub-filter must pass.
    /// Returns the name of the first claim whose filter failed, if any.
    #[must_use]
    pub fn evaluate_allow(&self, check: &PolicyCheck<'_>) -> Option<&'static str> {
        if let Some(filter) = &self.issuers {
            let passes = check.iss.is_some_and(|iss| filter.matches(iss));
            if !passes {
                return Some("iss");
            }
        }
        if let Some(filter) = &self.audience {
            if check.is_bearer {
                let passes = check.aud.as_ref().is_some_and(|aud| filter.matches(aud));
                if !passes {
                    return Some("aud");
                }
            }
        }
        if let Some(filter) = &self.subjects {
            let passes = check.sub.is_some_and(|sub| filter.matches(sub));
            if !passes {
                return Some("sub");
            }
        }
        None
    }

    /// Evaluate as a `deny` list: any present sub-filter that matches
    /// rejects the request. Returns the name of the matching claim, if
    /// any.
    ///
    /// Each sub-filter is checked only when explicitly configured — an
    /// absent `deny.audience`, for instance, never rejects on `aud`
    /// regardless of its shape. Unlike `evaluate_allow`, `aud` here is not
    /// gated on `is_bearer`: a configured `deny.audience` rejects a matching
    /// token whether it arrived as a bearer or a PoP-bound credential.
    #[must_use]
    pub fn evaluate_deny(&self, check: &PolicyCheck<'_>) -> Option<&'static str> {
        if let Some(filter) = &self.issuers {
            if check.iss.is_some_and(|iss| filter.matches(iss)) {
                return Some("iss");
            }
        }
        if let Some(filter) = &self.audience {
            if let Some(aud) = &check.aud {
                if filter.matches(aud) {
                    return Some("aud");
                }
            }
        }
        if let Some(filter) = &self.subjects {
            if check.sub.is_some_and(|sub| filter.matches(sub)) {
                return Some("sub");
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_passes_when_all_present_filters_match() {
        let filters = PolicyFilters {
            issuers: Some(ScalarFilter::List(vec!["https://example.test".to_string()])),
            audience: None,
            subjects: None,
        };
        let check = PolicyCheck {
            iss: Some("https://example.test"),
            aud: None,
            sub: None,
            is_bearer: true,
        };
        assert_eq!(filters.evaluate_allow(&check), None);
    }

    #[test]
    fn allow_list_fails_on_issuer_mismatch() {
        let filters = PolicyFilters {
            issuers: Some(ScalarFilter::List(vec!["https://trusted.test".to_string()])),
            audience: None,
            subjects: None,
        };
        let check = PolicyCheck {
            iss: Some("https://evil.example"),
            aud: None,
            sub: None,
            is_bearer: true,
        };
        assert_eq!(filters.evaluate_allow(&check), Some("iss"));
    }

    #[test]
    fn deny_list_matches_issuer() {
        let filters = PolicyFilters {
            issuers: Some(ScalarFilter::List(vec!["https://evil.example".to_string()])),
            audience: None,
            subjects: None,
        };
        let check = PolicyCheck {
            iss: Some("https://evil.example"),
            aud: None,
            sub: None,
            is_bearer: true,
        };
        assert_eq!(filters.evaluate_deny(&check), Some("iss"));
    }

    #[test]
    fn deny_audience_is_skipped_when_not_configured_even_for_list_aud() {
        let filters = PolicyFilters {
            issuers: None,
            audience: None,
            subjects: None,
        };
        let check = PolicyCheck {
            iss: Some("https://example.test"),
            aud: Some(Audience::Many(vec!["a".to_string(), "b".to_string()])),
            sub: None,
            is_bearer: true,
        };
        assert_eq!(filters.evaluate_deny(&check), None);
    }

    #[test]
    fn audience_filter_intersects_list_claim() {
        let filters = PolicyFilters {
            issuers: None,
            audience: Some(AudienceFilter::List(vec!["api".to_string()])),
            subjects: None,
        };
        let check = PolicyCheck {
            iss: None,
            aud: Some(Audience::Many(vec!["other".to_string(), "api".to_string()])),
            sub: None,
            is_bearer: true,
        };
        assert_eq!(filters.evaluate_allow(&check), None);
    }

    #[test]
    fn deny_audience_matches_regardless_of_bearer_scheme() {
        let filters = PolicyFilters {
            issuers: None,
            audience: Some(AudienceFilter::List(vec!["blocked".to_string()])),
            subjects: None,
        };
        let check = PolicyCheck {
            iss: None,
            aud: Some(Audience::Single("blocked".to_string())),
            sub: None,
            is_bearer: false,
        };
        assert_eq!(filters.evaluate_deny(&check), Some("aud"));
    }

    #[test]
    fn audience_filter_is_skipped_for_non_bearer_tokens() {
        let filters = PolicyFilters {
            issuers: None,
            audience: Some(AudienceFilter::List(vec!["api".to_string()])),
            subjects: None,
        };
        let check = PolicyCheck {
            iss: None,
            aud: Some(Audience::Single("unrelated".to_string())),
            sub: None,
            is_bearer: false,
        };
        assert_eq!(filters.evaluate_allow(&check), None);
    }
}
