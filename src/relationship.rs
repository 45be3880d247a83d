//! Relationship extraction
//!
//! One routine, parameterized by [`RelationKind`], produces subsidiaries and
//! acquisitions alike:
//!
//! 1. **Structured phase**: the infobox row for the relation. Hyperlinked
//!    article names become entities with a reference URL; a plain-text cell
//!    becomes a single entity without one.
//! 2. **Inference phase**: the leading paragraphs go to the completion
//!    service, which names the owned or acquired companies. Whether this runs
//!    and how it combines with phase 1 is a [`PhasePolicy`].
//! 3. **Reference URL strategies**: entities still lacking a URL run through an
//!    ordered list of [`RefUrlStrategy`]s; the first hit wins.
//!
//! A reference URL found here is only a candidate. The resolver decides
//! whether it is trusted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::completion::{parse_list, CompletionService, KeywordGuesser};
use crate::config::{ExtractionConfig, PhasePolicy};
use crate::document::{collapse_whitespace, ReferenceDocument};
use crate::domain_utils::NormalizedDomain;
use crate::fields::{FieldKind, FieldLabels};
use crate::ref_path::ReferencePaths;
use crate::wiki_client::CandidateSearch;

/// Kind of relationship between the parent company and an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Subsidiary,
    Acquisition,
}

impl RelationKind {
    pub fn field_kind(&self) -> FieldKind {
        match self {
            RelationKind::Subsidiary => FieldKind::Subsidiaries,
            RelationKind::Acquisition => FieldKind::Acquisitions,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Subsidiary => "subsidiary",
            RelationKind::Acquisition => "acquisition",
        }
    }

    fn prompt_instruction(&self) -> &'static str {
        match self {
            RelationKind::Subsidiary => {
                "List the names of companies that are explicitly described as owned by this company, \
                 or as its subsidiaries or divisions."
            }
            RelationKind::Acquisition => {
                "List the names of companies that are explicitly described as having been acquired by this company."
            }
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an entity's name was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitySource {
    /// Infobox row for the relation
    StructuredField,
    /// Completion-service reading of the article text
    TextInference,
}

/// A named subsidiary or acquisition of the resolved company
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEntity {
    pub name: String,
    #[serde(rename = "relation")]
    pub relation_kind: RelationKind,
    /// Candidate article for the entity; not trusted until link-validated
    #[serde(rename = "reference_url")]
    pub candidate_ref_url: Option<String>,
    /// Strategy that supplied `candidate_ref_url` when the entity itself had none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_url_via: Option<String>,
    /// Set only by the link-validated resolver
    pub domain: Option<NormalizedDomain>,
    pub source: EntitySource,
}

impl RelationshipEntity {
    pub fn new(name: &str, relation_kind: RelationKind, candidate_ref_url: Option<String>, source: EntitySource) -> Self {
        Self {
            name: collapse_whitespace(name),
            relation_kind,
            candidate_ref_url,
            ref_url_via: None,
            domain: None,
            source,
        }
    }

    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    /// "subsidiary of nvidia.com"
    pub fn describe(&self, parent: &NormalizedDomain) -> String {
        format!("{} of {}", self.relation_kind, parent)
    }
}

/// Drop names shorter than `min_chars` and case-insensitive duplicates; the
/// first occurrence wins.
pub fn dedup_entities(entities: Vec<RelationshipEntity>, min_chars: usize) -> Vec<RelationshipEntity> {
    let mut seen = HashSet::new();
    entities
        .into_iter()
        .filter(|e| e.name.chars().count() >= min_chars)
        .filter(|e| seen.insert(e.key()))
        .collect()
}

/// Whether the inference phase has to run after the structured phase.
pub fn needs_inference(policy: PhasePolicy, structured: &[RelationshipEntity]) -> bool {
    match policy {
        PhasePolicy::Merge => true,
        PhasePolicy::FirstNonEmpty => structured.is_empty(),
    }
}

/// Combine both phases: structured results first, then inferred names not
/// already present.
pub fn combine_phases(
    policy: PhasePolicy,
    structured: Vec<RelationshipEntity>,
    inferred: Vec<RelationshipEntity>,
) -> Vec<RelationshipEntity> {
    if !needs_inference(policy, &structured) {
        return structured;
    }

    let known: HashSet<String> = structured.iter().map(RelationshipEntity::key).collect();
    let mut combined = structured;
    combined.extend(inferred.into_iter().filter(|e| !known.contains(&e.key())));
    combined
}

/// Structured phase over the infobox rows of `kind`.
pub fn structured_entities(
    doc: &ReferenceDocument,
    kind: RelationKind,
    labels: &FieldLabels,
    paths: &ReferencePaths,
    placeholders: &[String],
) -> Vec<RelationshipEntity> {
    let mut entities = Vec::new();

    for field in labels.fields_of_kind(doc, kind.field_kind()) {
        if !field.links.is_empty() {
            for link in &field.links {
                let name = link.text.trim();
                if name.is_empty() {
                    continue;
                }
                match paths.absolute_url(&link.href) {
                    Some(url) => entities.push(RelationshipEntity::new(
                        name,
                        kind,
                        Some(url),
                        EntitySource::StructuredField,
                    )),
                    None => debug!("Skipping non-article link '{}' -> {}", name, link.href),
                }
            }
            continue;
        }

        let text = field.text.trim();
        if text.is_empty() || placeholders.iter().any(|p| p.eq_ignore_ascii_case(text)) {
            continue;
        }
        entities.push(RelationshipEntity::new(text, kind, None, EntitySource::StructuredField));
    }

    entities
}

/// Prompt for the inference phase.
pub fn inference_prompt(company_name: &str, kind: RelationKind, paragraphs: &[String]) -> String {
    format!(
        "Given the following encyclopedia article text for the company '{}':\n\n{}\n\n{} \
         Only include entities the text explicitly describes that way. \
         Respond with a flat comma-separated list of company names only. If none, respond with an empty string.",
        company_name,
        paragraphs.join("\n"),
        kind.prompt_instruction()
    )
}

/// One way of finding a candidate article URL for an entity name.
#[async_trait]
pub trait RefUrlStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn find(&self, entity_name: &str, parent: &ReferenceDocument) -> Option<String>;
}

/// Run `strategies` in order and return the first URL found, with the name
/// of the strategy that found it.
pub async fn first_ref_url(
    strategies: &[Arc<dyn RefUrlStrategy>],
    entity_name: &str,
    parent: &ReferenceDocument,
) -> Option<(String, &'static str)> {
    for strategy in strategies {
        if let Some(url) = strategy.find(entity_name, parent).await {
            debug!("'{}' -> {} via {}", entity_name, url, strategy.name());
            return Some((url, strategy.name()));
        }
    }
    None
}

/// Looks for a link in the parent article whose anchor text is the entity name.
pub struct DocumentAnchorStrategy {
    paths: ReferencePaths,
}

impl DocumentAnchorStrategy {
    pub fn new(paths: ReferencePaths) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl RefUrlStrategy for DocumentAnchorStrategy {
    fn name(&self) -> &'static str {
        "document_anchor"
    }

    async fn find(&self, entity_name: &str, parent: &ReferenceDocument) -> Option<String> {
        parent
            .links_with_text(entity_name)
            .find_map(|link| self.paths.absolute_url(&link.href))
    }
}

/// Guesses keywords for the entity name and searches the reference site.
///
/// A result is accepted only if it is not the parent's own article and its
/// title shares a word longer than two characters with the entity name.
pub struct SearchLookupStrategy {
    guesser: KeywordGuesser,
    search: Arc<dyn CandidateSearch>,
    paths: ReferencePaths,
    max_titles: usize,
}

impl SearchLookupStrategy {
    pub fn new(guesser: KeywordGuesser, search: Arc<dyn CandidateSearch>, paths: ReferencePaths, max_titles: usize) -> Self {
        Self {
            guesser,
            search,
            paths,
            max_titles,
        }
    }
}

#[async_trait]
impl RefUrlStrategy for SearchLookupStrategy {
    fn name(&self) -> &'static str {
        "search_lookup"
    }

    async fn find(&self, entity_name: &str, parent: &ReferenceDocument) -> Option<String> {
        for keyword in self.guesser.guess(entity_name).await {
            let titles = match self.search.search(&keyword).await {
                Ok(titles) => titles,
                Err(e) => {
                    debug!("Search failed for '{}': {}", keyword, e);
                    continue;
                }
            };

            for title in titles.into_iter().take(self.max_titles) {
                let url = self.paths.reference_url(&title);
                if self.paths.same_article(&url, &parent.url) {
                    debug!("Rejecting '{}' for '{}': parent article", title, entity_name);
                    continue;
                }
                if !shares_token(&title, entity_name) {
                    debug!("Rejecting '{}' for '{}': no shared words", title, entity_name);
                    continue;
                }
                return Some(url);
            }
        }
        None
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 2)
        .map(str::to_lowercase)
        .collect()
}

/// True when the two strings share a word longer than two characters.
pub fn shares_token(a: &str, b: &str) -> bool {
    let a = tokens(a);
    tokens(b).iter().any(|t| a.contains(t))
}

/// Extraction settings, resolved from [`ExtractionConfig`].
#[derive(Debug, Clone)]
pub struct ExtractionSettings {
    pub max_paragraphs: usize,
    pub min_name_chars: usize,
    pub none_placeholders: Vec<String>,
    pub subsidiary_policy: PhasePolicy,
    pub acquisition_policy: PhasePolicy,
}

impl From<&ExtractionConfig> for ExtractionSettings {
    fn from(config: &ExtractionConfig) -> Self {
        Self {
            max_paragraphs: config.max_paragraphs,
            min_name_chars: config.min_name_chars,
            none_placeholders: config.none_placeholders.clone(),
            subsidiary_policy: config.subsidiary_policy,
            acquisition_policy: config.acquisition_policy,
        }
    }
}

impl ExtractionSettings {
    pub fn policy(&self, kind: RelationKind) -> PhasePolicy {
        match kind {
            RelationKind::Subsidiary => self.subsidiary_policy,
            RelationKind::Acquisition => self.acquisition_policy,
        }
    }
}

/// Extracts relationship entities of either kind from a matched article.
pub struct RelationshipExtractor {
    completion: Arc<dyn CompletionService>,
    labels: FieldLabels,
    paths: ReferencePaths,
    settings: ExtractionSettings,
    subsidiary_strategies: Vec<Arc<dyn RefUrlStrategy>>,
    acquisition_strategies: Vec<Arc<dyn RefUrlStrategy>>,
}

impl RelationshipExtractor {
    /// Both kinds look for an anchor in the parent article; acquisitions then
    /// fall back to `search_lookup` when one is given.
    pub fn new(
        completion: Arc<dyn CompletionService>,
        labels: FieldLabels,
        paths: ReferencePaths,
        settings: ExtractionSettings,
        search_lookup: Option<SearchLookupStrategy>,
    ) -> Self {
        let anchor: Arc<dyn RefUrlStrategy> = Arc::new(DocumentAnchorStrategy::new(paths.clone()));
        let mut acquisition_strategies = vec![anchor.clone()];
        if let Some(lookup) = search_lookup {
            acquisition_strategies.push(Arc::new(lookup));
        }

        Self {
            completion,
            labels,
            paths,
            settings,
            subsidiary_strategies: vec![anchor],
            acquisition_strategies,
        }
    }

    fn strategies(&self, kind: RelationKind) -> &[Arc<dyn RefUrlStrategy>] {
        match kind {
            RelationKind::Subsidiary => &self.subsidiary_strategies,
            RelationKind::Acquisition => &self.acquisition_strategies,
        }
    }

    /// All entities of `kind` for the article, deduplicated.
    pub async fn extract(&self, doc: &ReferenceDocument, company_name: &str, kind: RelationKind) -> Vec<RelationshipEntity> {
        let structured = structured_entities(
            doc,
            kind,
            &self.labels,
            &self.paths,
            &self.settings.none_placeholders,
        );
        debug!("{} structured {} entries in '{}'", structured.len(), kind, doc.title);

        let policy = self.settings.policy(kind);
        let inferred = if needs_inference(policy, &structured) {
            self.infer(doc, company_name, kind).await
        } else {
            Vec::new()
        };

        let mut entities = dedup_entities(
            combine_phases(policy, structured, inferred),
            self.settings.min_name_chars,
        );

        for entity in entities.iter_mut().filter(|e| e.candidate_ref_url.is_none()) {
            if let Some((url, via)) = first_ref_url(self.strategies(kind), &entity.name, doc).await {
                entity.candidate_ref_url = Some(url);
                entity.ref_url_via = Some(via.to_string());
            }
        }

        entities
    }

    async fn infer(&self, doc: &ReferenceDocument, company_name: &str, kind: RelationKind) -> Vec<RelationshipEntity> {
        let paragraphs = doc.leading_paragraphs(self.settings.max_paragraphs);
        if paragraphs.is_empty() {
            return Vec::new();
        }

        let prompt = inference_prompt(company_name, kind, paragraphs);
        match self.completion.complete(&prompt).await {
            Ok(answer) => parse_list(&answer, &self.settings.none_placeholders)
                .iter()
                .map(|name| RelationshipEntity::new(name, kind, None, EntitySource::TextInference))
                .collect(),
            Err(e) => {
                warn!("{} inference failed for '{}': {}", kind, company_name, e);
                Vec::new()
            }
        }
    }
}
