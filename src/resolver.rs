//! Link-validated domain resolution
//!
//! An entity's candidate article URL may come from a loose lookup (an anchor
//! elsewhere in the text, a keyword search). Before that article's website is
//! recorded as the entity's own domain, the parent article must itself link
//! the entity's exact name to exactly that article. Only then is the child
//! article fetched and its declared website normalized into `domain`.

use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::document::{DocumentParser, ReferenceDocument};
use crate::domain_utils::{normalize, NormalizedDomain};
use crate::fields::{official_website, FieldLabels};
use crate::ref_path::ReferencePaths;
use crate::relationship::RelationshipEntity;
use crate::wiki_client::{fetch_document, DocumentSource};

/// Lower-cased anchor text -> normalized article paths linked under it.
#[derive(Debug, Clone, Default)]
pub struct LinkIndex {
    anchors: HashMap<String, HashSet<String>>,
}

impl LinkIndex {
    pub fn build(doc: &ReferenceDocument, paths: &ReferencePaths) -> Self {
        let mut anchors: HashMap<String, HashSet<String>> = HashMap::new();
        for link in &doc.links {
            let text = link.text.trim().to_lowercase();
            if text.is_empty() {
                continue;
            }
            if let Some(path) = paths.normalize_path(&link.href) {
                anchors.entry(text).or_default().insert(path);
            }
        }
        Self { anchors }
    }

    /// True when `name` is anchor text of a link to the same article as `ref_url`.
    pub fn is_linked(&self, name: &str, ref_url: &str, paths: &ReferencePaths) -> bool {
        let Some(linked) = self.anchors.get(&name.trim().to_lowercase()) else {
            return false;
        };
        paths
            .normalize_path(ref_url)
            .map(|wanted| linked.contains(&wanted))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// Resolves trusted entity domains from their child articles.
pub struct DomainResolver {
    source: Arc<dyn DocumentSource>,
    parser: DocumentParser,
    labels: FieldLabels,
    paths: ReferencePaths,
    concurrency: usize,
}

impl DomainResolver {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        parser: DocumentParser,
        labels: FieldLabels,
        paths: ReferencePaths,
        concurrency: usize,
    ) -> Self {
        Self {
            source,
            parser,
            labels,
            paths,
            concurrency: concurrency.max(1),
        }
    }

    /// Return `entities` in the same order, with `domain` filled in where the
    /// link gate passes and the child article declares a website. Failures
    /// leave that one entity's `domain` empty.
    pub async fn resolve(&self, doc: &ReferenceDocument, entities: Vec<RelationshipEntity>) -> Vec<RelationshipEntity> {
        let index = LinkIndex::build(doc, &self.paths);
        debug!("Link index for '{}' has {} anchors", doc.title, index.len());

        stream::iter(entities)
            .map(|mut entity| {
                let index = &index;
                async move {
                    entity.domain = self.resolve_one(index, &entity).await;
                    entity
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn resolve_one(&self, index: &LinkIndex, entity: &RelationshipEntity) -> Option<NormalizedDomain> {
        let ref_url = entity.candidate_ref_url.as_deref()?;

        if !index.is_linked(&entity.name, ref_url, &self.paths) {
            debug!("'{}' is not linked to {} in the parent article; domain left unset", entity.name, ref_url);
            return None;
        }

        let child = fetch_document(self.source.as_ref(), &self.parser, ref_url).await?;
        let website = official_website(&child, &self.labels);
        let domain = website.as_deref().and_then(normalize);
        debug!("'{}' -> {:?} (declared {:?})", entity.name, domain, website);
        domain
    }
}
