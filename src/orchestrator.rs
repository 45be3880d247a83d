//! Resolution orchestrator
//!
//! Drives one company website through keyword guesses, candidate searches and
//! the page matcher. The first matching article is mined for subsidiaries and
//! acquisitions, which are then link-validated and resolved to domains.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::completion::{CompletionService, KeywordGuesser};
use crate::config::AppConfig;
use crate::document::{DocumentParser, ReferenceDocument};
use crate::domain_utils::{normalize, NormalizedDomain};
use crate::fields::FieldLabels;
use crate::matcher::{MatchTier, PageMatcher};
use crate::ref_path::ReferencePaths;
use crate::relationship::{
    ExtractionSettings, RelationKind, RelationshipEntity, RelationshipExtractor, SearchLookupStrategy,
};
use crate::resolver::DomainResolver;
use crate::wiki_client::{fetch_document, CandidateSearch, DocumentSource};

/// Company website as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyTarget {
    pub website: String,
}

impl CompanyTarget {
    pub fn new(website: impl Into<String>) -> Self {
        Self { website: website.into() }
    }
}

/// Outcome of resolving one company
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionResult {
    pub main_domain: NormalizedDomain,
    pub reference_url: String,
    pub reference_title: String,
    pub match_tier: MatchTier,
    pub subsidiaries: Vec<RelationshipEntity>,
    pub acquisitions: Vec<RelationshipEntity>,
}

impl ResolutionResult {
    pub fn entities(&self) -> impl Iterator<Item = &RelationshipEntity> {
        self.subsidiaries.iter().chain(self.acquisitions.iter())
    }

    pub fn resolved_domain_count(&self) -> usize {
        self.entities().filter(|e| e.domain.is_some()).count()
    }
}

/// Counters for one run, for logging and the export summary
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub keywords_tried: usize,
    pub candidates_fetched: usize,
    pub candidates_rejected: usize,
}

/// Search limits used by the orchestrator
#[derive(Debug, Clone)]
pub struct SearchLimits {
    pub max_keywords: usize,
    pub max_titles_per_keyword: usize,
    pub fallback_titles_per_keyword: usize,
}

/// Collaborators the orchestrator is built from
#[derive(Clone)]
pub struct Collaborators {
    pub documents: Arc<dyn DocumentSource>,
    pub search: Arc<dyn CandidateSearch>,
    pub completion: Arc<dyn CompletionService>,
}

pub struct ResolutionOrchestrator {
    documents: Arc<dyn DocumentSource>,
    search: Arc<dyn CandidateSearch>,
    guesser: KeywordGuesser,
    parser: DocumentParser,
    paths: ReferencePaths,
    matcher: PageMatcher,
    extractor: RelationshipExtractor,
    resolver: DomainResolver,
    max_titles_per_keyword: usize,
}

impl ResolutionOrchestrator {
    pub fn from_config(config: &AppConfig, collaborators: Collaborators) -> Result<Self> {
        let parser = DocumentParser::new(&config.reference.infobox_selector)?;
        let limits = SearchLimits {
            max_keywords: config.search.max_keywords,
            max_titles_per_keyword: config.search.max_titles_per_keyword,
            fallback_titles_per_keyword: config.search.fallback_titles_per_keyword,
        };

        Ok(Self::new(
            collaborators,
            parser,
            ReferencePaths::from_config(&config.reference),
            FieldLabels::from_config(&config.labels),
            ExtractionSettings::from(&config.extraction),
            limits,
            config.resolver.child_fetch_concurrency,
        ))
    }

    pub fn new(
        collaborators: Collaborators,
        parser: DocumentParser,
        paths: ReferencePaths,
        labels: FieldLabels,
        settings: ExtractionSettings,
        limits: SearchLimits,
        child_fetch_concurrency: usize,
    ) -> Self {
        let Collaborators {
            documents,
            search,
            completion,
        } = collaborators;

        let guesser = KeywordGuesser::new(completion.clone(), limits.max_keywords);
        let lookup = SearchLookupStrategy::new(
            guesser.clone(),
            search.clone(),
            paths.clone(),
            limits.fallback_titles_per_keyword,
        );

        Self {
            extractor: RelationshipExtractor::new(completion, labels.clone(), paths.clone(), settings, Some(lookup)),
            resolver: DomainResolver::new(
                documents.clone(),
                parser.clone(),
                labels.clone(),
                paths.clone(),
                child_fetch_concurrency,
            ),
            matcher: PageMatcher::new(labels),
            documents,
            search,
            guesser,
            parser,
            paths,
            max_titles_per_keyword: limits.max_titles_per_keyword,
        }
    }

    /// Resolve `target`. `Ok(None)` means every candidate was exhausted
    /// without a match; the only error is a website with no usable domain.
    pub async fn resolve(&self, target: &CompanyTarget) -> Result<Option<ResolutionResult>> {
        self.resolve_with_stats(target).await.map(|(result, _)| result)
    }

    pub async fn resolve_with_stats(&self, target: &CompanyTarget) -> Result<(Option<ResolutionResult>, RunStats)> {
        let main_domain = normalize(&target.website)
            .ok_or_else(|| anyhow!("'{}' does not contain a usable domain", target.website))?;
        let mut stats = RunStats::default();

        let Some((doc, tier)) = self.find_reference(target, &main_domain, &mut stats).await else {
            info!("No reference article matched {}", main_domain);
            return Ok((None, stats));
        };
        info!("Matched {} to '{}' ({}) via {}", main_domain, doc.title, doc.url, tier);

        let result = self.assemble(main_domain, doc, tier).await;
        info!(
            "{}: {} subsidiaries, {} acquisitions, {} domains resolved",
            result.main_domain,
            result.subsidiaries.len(),
            result.acquisitions.len(),
            result.resolved_domain_count()
        );
        Ok((Some(result), stats))
    }

    async fn find_reference(
        &self,
        target: &CompanyTarget,
        main_domain: &NormalizedDomain,
        stats: &mut RunStats,
    ) -> Option<(ReferenceDocument, MatchTier)> {
        let mut tried: HashSet<String> = HashSet::new();

        for keyword in self.guesser.guess(&target.website).await {
            stats.keywords_tried += 1;

            let titles = match self.search.search(&keyword).await {
                Ok(titles) => titles,
                Err(e) => {
                    debug!("Search failed for '{}': {}", keyword, e);
                    continue;
                }
            };

            for title in titles.into_iter().take(self.max_titles_per_keyword) {
                let url = self.paths.reference_url(&title);
                if !tried.insert(url.clone()) {
                    continue;
                }

                let Some(doc) = fetch_document(self.documents.as_ref(), &self.parser, &url).await else {
                    continue;
                };
                stats.candidates_fetched += 1;

                match self.matcher.evaluate(&doc, main_domain) {
                    Some(tier) => return Some((doc, tier)),
                    None => {
                        stats.candidates_rejected += 1;
                        debug!("'{}' does not match {}", title, main_domain);
                    }
                }
            }
        }

        None
    }

    async fn assemble(&self, main_domain: NormalizedDomain, doc: ReferenceDocument, tier: MatchTier) -> ResolutionResult {
        let company_name = if doc.title.is_empty() {
            main_domain.to_string()
        } else {
            doc.title.clone()
        };

        let subsidiaries = self
            .extractor
            .extract(&doc, &company_name, RelationKind::Subsidiary)
            .await;
        let acquisitions = self
            .extractor
            .extract(&doc, &company_name, RelationKind::Acquisition)
            .await;
        let subsidiary_count = subsidiaries.len();

        let mut resolved = self
            .resolver
            .resolve(&doc, subsidiaries.into_iter().chain(acquisitions).collect())
            .await;
        let acquisitions = resolved.split_off(subsidiary_count);

        ResolutionResult {
            main_domain,
            reference_url: doc.url,
            reference_title: doc.title,
            match_tier: tier,
            subsidiaries: resolved,
            acquisitions,
        }
    }
}
