//! Domain normalization and comparison helpers.
//!
//! Every website string that enters the resolver (the target company website,
//! infobox website fields, child article websites) is reduced to a bare,
//! lowercase host before it is compared with anything else.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A lowercase host with no scheme, `www.` label, port, path, query or fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedDomain(String);

impl NormalizedDomain {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The label before the first dot (`acme` for `acme.co.uk`).
    pub fn leading_label(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// True when one domain is a dot-suffix of the other (`ir.acme.com` / `acme.com`).
    /// Identical domains are not a subdomain match.
    pub fn is_subdomain_match(&self, other: &NormalizedDomain) -> bool {
        is_dot_suffix(&self.0, &other.0) || is_dot_suffix(&other.0, &self.0)
    }
}

impl fmt::Display for NormalizedDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// `suffix` is a dot-suffix of `domain` when `domain` ends with `.` + `suffix`.
fn is_dot_suffix(suffix: &str, domain: &str) -> bool {
    domain.len() > suffix.len() + 1
        && domain.ends_with(suffix)
        && domain.as_bytes()[domain.len() - suffix.len() - 1] == b'.'
}

/// Reduce a URL or bare host to its comparable domain.
///
/// Returns `None` when nothing host-like is left (empty input, a bare scheme,
/// a relative path).
pub fn normalize(input: &str) -> Option<NormalizedDomain> {
    let mut rest = input.trim().to_lowercase();

    for scheme in ["https://", "http://"] {
        if let Some(stripped) = rest.strip_prefix(scheme) {
            rest = stripped.to_string();
            break;
        }
    }
    if let Some(stripped) = rest.strip_prefix("//") {
        rest = stripped.to_string();
    }
    rest = rest.trim().to_string();
    while let Some(stripped) = rest.strip_prefix("www.") {
        rest = stripped.trim().to_string();
    }

    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    rest.truncate(end);
    let end = rest.find(':').unwrap_or(rest.len());
    rest.truncate(end);

    let host = rest.trim().trim_end_matches('.');
    if host.is_empty() {
        return None;
    }
    Some(NormalizedDomain(host.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_scheme_www_path_and_port() {
        for input in ["https://www.acme.com/about", "acme.com", "http://acme.com:8080/x"] {
            assert_eq!(normalize(input).unwrap().as_str(), "acme.com", "input: {}", input);
        }
    }

    #[test]
    fn test_normalize_lowercases_and_trims() {
        assert_eq!(normalize("  HTTPS://WWW.Acme.COM/  ").unwrap().as_str(), "acme.com");
        assert_eq!(normalize("acme.com?ref=x").unwrap().as_str(), "acme.com");
        assert_eq!(normalize("acme.com#top").unwrap().as_str(), "acme.com");
        assert_eq!(normalize("//cdn.acme.com/x").unwrap().as_str(), "cdn.acme.com");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in [
            "https://www.acme.com/about",
            "ir.acme.com",
            "http://Acme.co.uk:443",
            "www.www.acme.com",
            "https:// www.acme.com",
            "www. www.acme.com",
        ] {
            let once = normalize(input).unwrap();
            let twice = normalize(once.as_str()).unwrap();
            assert_eq!(once, twice);
        }
        assert_eq!(normalize("www.www.acme.com").unwrap().as_str(), "acme.com");
        assert_eq!(normalize("https:// www.acme.com").unwrap().as_str(), "acme.com");
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert!(normalize("").is_none());
        assert!(normalize("   ").is_none());
        assert!(normalize("https://").is_none());
        assert!(normalize("/wiki/Acme").is_none());
    }

    #[test]
    fn test_subdomain_match_is_symmetric_dot_suffix() {
        let target = normalize("acme.com").unwrap();
        let ir = normalize("https://investor.acme.com").unwrap();
        assert!(target.is_subdomain_match(&ir));
        assert!(ir.is_subdomain_match(&target));

        // Plain suffix without a dot boundary is not a subdomain
        let lookalike = normalize("notacme.com").unwrap();
        assert!(!target.is_subdomain_match(&lookalike));
        assert!(!target.is_subdomain_match(&target));
    }

    #[test]
    fn test_leading_label() {
        assert_eq!(normalize("https://www.nvidia.com").unwrap().leading_label(), "nvidia");
        assert_eq!(normalize("localhost").unwrap().leading_label(), "localhost");
    }

    #[test]
    fn test_formatting_variants_compare_equal() {
        assert_eq!(normalize("https://www.acme.com"), normalize("ACME.com/contact"));
        assert_ne!(normalize("acme.com"), normalize("acme.org"));
    }
}
