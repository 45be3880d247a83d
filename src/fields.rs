//! Infobox field extraction
//!
//! Infobox labels are free text ("Website", "Official site", "Subsidiaries",
//! "Key acquisitions"). A [`FieldLabels`] table maps label substrings to a
//! [`FieldKind`]; adding a new kind of field is a table entry, not a new
//! string check somewhere in the extractor.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::config::LabelsConfig;
use crate::document::{InfoboxField, ReferenceDocument};

// Bare or schemed host names in plain field text, e.g. "acme.com" or "https://ir.acme.com/"
static PLAIN_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:https?://)?(?:[a-z0-9](?:[a-z0-9\-]*[a-z0-9])?\.)+[a-z]{2,24}(?::\d+)?(?:/[^\s<>()\[\]]*)?").unwrap()
});

/// Kind of infobox field the resolver cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Website,
    Subsidiaries,
    Acquisitions,
}

/// Ordered label-substring table; the first matching entry decides the kind.
#[derive(Debug, Clone)]
pub struct FieldLabels {
    entries: Vec<(String, FieldKind)>,
}

impl Default for FieldLabels {
    fn default() -> Self {
        Self::new(vec![
            ("website", FieldKind::Website),
            ("url", FieldKind::Website),
            ("homepage", FieldKind::Website),
            ("site", FieldKind::Website),
            ("web", FieldKind::Website),
            ("subsidiar", FieldKind::Subsidiaries),
            ("acquisit", FieldKind::Acquisitions),
        ])
    }
}

impl FieldLabels {
    pub fn new(entries: Vec<(&str, FieldKind)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .filter(|(label, _)| !label.trim().is_empty())
                .map(|(label, kind)| (label.trim().to_lowercase(), kind))
                .collect(),
        }
    }

    pub fn from_config(config: &LabelsConfig) -> Self {
        let mut entries = Vec::new();
        for (labels, kind) in [
            (&config.website, FieldKind::Website),
            (&config.subsidiaries, FieldKind::Subsidiaries),
            (&config.acquisitions, FieldKind::Acquisitions),
        ] {
            entries.extend(labels.iter().map(|l| (l.as_str(), kind)));
        }
        Self::new(entries)
    }

    /// Kind of a raw infobox label, if any entry matches.
    pub fn classify(&self, label: &str) -> Option<FieldKind> {
        let label = label.to_lowercase();
        self.entries
            .iter()
            .find(|(needle, _)| label.contains(needle.as_str()))
            .map(|(_, kind)| *kind)
    }

    /// Infobox rows of the given kind, in document order.
    pub fn fields_of_kind<'a>(
        &'a self,
        doc: &'a ReferenceDocument,
        kind: FieldKind,
    ) -> impl Iterator<Item = &'a InfoboxField> + 'a {
        doc.fields
            .iter()
            .filter(move |field| self.classify(&field.label) == Some(kind))
    }
}

/// Every website the article declares for its subject: hyperlinked `http(s)`
/// targets plus host names found by scanning the field text. Duplicates are
/// removed, order is preserved.
pub fn declared_websites(doc: &ReferenceDocument, labels: &FieldLabels) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut push = |candidate: &str| {
        let candidate = candidate.trim();
        if !candidate.is_empty() && !found.iter().any(|f| f == candidate) {
            found.push(candidate.to_string());
        }
    };

    for field in labels.fields_of_kind(doc, FieldKind::Website) {
        for link in &field.links {
            if is_http_url(&link.href) {
                push(&link.href);
            }
            for m in PLAIN_URL.find_iter(&link.text) {
                push(m.as_str());
            }
        }
        for m in PLAIN_URL.find_iter(&field.text) {
            push(m.as_str());
        }
    }

    found
}

/// The first hyperlinked `http`-prefixed value of a website field.
pub fn official_website(doc: &ReferenceDocument, labels: &FieldLabels) -> Option<String> {
    labels
        .fields_of_kind(doc, FieldKind::Website)
        .flat_map(|field| field.links.iter())
        .find(|link| is_http_url(&link.href))
        .map(|link| link.href.trim().to_string())
}

fn is_http_url(href: &str) -> bool {
    let href = href.trim().to_lowercase();
    href.starts_with("http://") || href.starts_with("https://")
}
