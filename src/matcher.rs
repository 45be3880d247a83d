//! Reference page matching
//!
//! Decides whether a candidate article is about the target company rather than
//! a namesake. Evidence tiers are tried in order and the first one that holds
//! wins:
//!
//! 1. a declared website normalizes to the target domain
//! 2. a declared website is a subdomain of the target domain, or the reverse
//! 3. the title contains the domain's leading label (longer than 3 chars) and
//!    the body mentions the full domain

use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::document::ReferenceDocument;
use crate::domain_utils::{normalize, NormalizedDomain};
use crate::fields::{declared_websites, FieldLabels};

/// Which tier of evidence matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    ExactDomain,
    Subdomain,
    TitleAndBody,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchTier::ExactDomain => write!(f, "exact_domain"),
            MatchTier::Subdomain => write!(f, "subdomain"),
            MatchTier::TitleAndBody => write!(f, "title_and_body"),
        }
    }
}

/// Minimum length of the leading domain label for title evidence
const MIN_TITLE_LABEL_CHARS: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct PageMatcher {
    labels: FieldLabels,
}

impl PageMatcher {
    pub fn new(labels: FieldLabels) -> Self {
        Self { labels }
    }

    /// The tier of evidence tying `doc` to `target`, or `None`.
    pub fn evaluate(&self, doc: &ReferenceDocument, target: &NormalizedDomain) -> Option<MatchTier> {
        let declared: Vec<NormalizedDomain> = declared_websites(doc, &self.labels)
            .iter()
            .filter_map(|site| normalize(site))
            .collect();
        debug!("'{}' declares {:?}", doc.title, declared);

        if declared.iter().any(|d| d == target) {
            return Some(MatchTier::ExactDomain);
        }
        if declared.iter().any(|d| d.is_subdomain_match(target)) {
            return Some(MatchTier::Subdomain);
        }
        if title_and_body_evidence(doc, target) {
            return Some(MatchTier::TitleAndBody);
        }
        None
    }

    pub fn matches(&self, doc: &ReferenceDocument, target: &NormalizedDomain) -> bool {
        self.evaluate(doc, target).is_some()
    }
}

fn title_and_body_evidence(doc: &ReferenceDocument, target: &NormalizedDomain) -> bool {
    let label = target.leading_label().to_lowercase();
    if label.chars().count() < MIN_TITLE_LABEL_CHARS {
        return false;
    }
    doc.title.to_lowercase().contains(&label) && doc.body_text.to_lowercase().contains(target.as_str())
}
