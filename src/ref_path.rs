//! Reference-article path handling.
//!
//! Article links show up in many spellings: relative (`/wiki/Acme_Corp`),
//! absolute, percent-encoded, with spaces or underscores, with a lowercase
//! first letter. [`ReferencePaths::normalize_path`] folds all of them onto one
//! canonical path so "is this entity linked to that article" becomes a string
//! comparison.

use url::Url;

use crate::config::ReferenceConfig;

/// MediaWiki namespaces whose pages are never company articles. The
/// matching "<Namespace> talk" pages are excluded too.
pub const DEFAULT_EXCLUDED_NAMESPACES: &[&str] = &[
    "Category",
    "Draft",
    "File",
    "Help",
    "Image",
    "Media",
    "MediaWiki",
    "Module",
    "Portal",
    "Special",
    "Talk",
    "Template",
    "User",
    "Wikipedia",
    "WP",
];

/// Builds and canonicalizes article paths for one reference site.
#[derive(Debug, Clone)]
pub struct ReferencePaths {
    base_url: String,
    prefix: String,
    /// Lower-cased namespace names
    excluded_namespaces: Vec<String>,
}

impl ReferencePaths {
    pub fn new(base_url: &str, prefix: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            prefix: prefix.to_string(),
            excluded_namespaces: DEFAULT_EXCLUDED_NAMESPACES.iter().map(|ns| ns.to_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &ReferenceConfig) -> Self {
        Self::new(&config.base_url, &config.path_prefix).with_excluded_namespaces(&config.excluded_namespaces)
    }

    pub fn with_excluded_namespaces(mut self, namespaces: &[String]) -> Self {
        self.excluded_namespaces = namespaces.iter().map(|ns| ns.trim().to_lowercase()).collect();
        self
    }

    /// True when `title` (spaces, not underscores) lives in an excluded
    /// namespace, e.g. "Wikipedia:Citation needed" or "File talk:Logo.svg".
    fn in_excluded_namespace(&self, title: &str) -> bool {
        let Some((namespace, _)) = title.split_once(':') else {
            return false;
        };
        let namespace = namespace.trim().to_lowercase();
        let namespace = namespace.strip_suffix(" talk").unwrap_or(&namespace);
        self.excluded_namespaces.iter().any(|ns| ns == namespace)
    }

    /// Canonical `<prefix><Title>` for an article link, or `None` when the link
    /// does not point at an article.
    ///
    /// Percent-encoding is decoded, underscores and spaces are treated alike,
    /// and only the first character of the title is case-folded (article titles
    /// are case-sensitive after the first letter). Query and fragment are dropped.
    /// Pages in an excluded namespace (`Wikipedia:`, `File:`, ...) are not articles.
    pub fn normalize_path(&self, ref_or_url: &str) -> Option<String> {
        let path = extract_path(ref_or_url.trim())?;
        let raw_title = path.strip_prefix(self.prefix.as_str())?;
        if raw_title.is_empty() {
            return None;
        }

        let decoded = urlencoding::decode(raw_title).ok()?;
        let spaced = decoded.replace('_', " ");
        let title = spaced.trim();
        if title.is_empty() || self.in_excluded_namespace(title) {
            return None;
        }

        let mut chars = title.chars();
        let first = chars.next()?;
        let canonical: String = first.to_uppercase().chain(chars).collect();

        Some(format!("{}{}", self.prefix, canonical.replace(' ', "_")))
    }

    /// Absolute article URL for an href found in a document, or `None` for
    /// non-article links. Fragments and queries are dropped.
    pub fn absolute_url(&self, href: &str) -> Option<String> {
        let href = href.trim();
        self.normalize_path(href)?;

        if href.starts_with("http://") || href.starts_with("https://") {
            return Some(strip_query_and_fragment(href).to_string());
        }
        if let Some(rest) = href.strip_prefix("//") {
            return Some(format!("https://{}", strip_query_and_fragment(rest)));
        }
        Some(format!("{}{}", self.base_url, strip_query_and_fragment(href)))
    }

    /// Deterministic title to URL mapping: spaces become underscores and each
    /// path segment is percent-encoded.
    pub fn reference_url(&self, title: &str) -> String {
        let underscored = title.trim().replace(' ', "_");
        let encoded: Vec<String> = underscored
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}{}{}", self.base_url, self.prefix, encoded.join("/"))
    }

    /// True when two links resolve to the same article.
    pub fn same_article(&self, a: &str, b: &str) -> bool {
        match (self.normalize_path(a), self.normalize_path(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

fn strip_query_and_fragment(s: &str) -> &str {
    let end = s.find(['?', '#']).unwrap_or(s.len());
    &s[..end]
}

/// Path component of an absolute URL, protocol-relative URL or site-relative href.
fn extract_path(input: &str) -> Option<String> {
    if input.starts_with("http://") || input.starts_with("https://") {
        return Url::parse(input).ok().map(|url| url.path().to_string());
    }
    if input.starts_with("//") {
        return Url::parse(&format!("https:{}", input))
            .ok()
            .map(|url| url.path().to_string());
    }
    if input.starts_with('/') {
        return Some(strip_query_and_fragment(input).to_string());
    }
    None
}
