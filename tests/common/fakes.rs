use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use corpref::completion::CompletionService;
use corpref::wiki_client::{CandidateSearch, DocumentSource};

/// Articles keyed by absolute URL. Unknown URLs fail. Every request is recorded.
#[derive(Default)]
pub struct InMemoryDocuments {
    pages: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl InMemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), html.into());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    pub fn was_requested(&self, url: &str) -> bool {
        self.requested().iter().any(|u| u == url)
    }
}

#[async_trait]
impl DocumentSource for InMemoryDocuments {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.requested.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("404 for {}", url))
    }
}

/// Search results keyed by exact keyword. Unknown keywords fail.
#[derive(Default)]
pub struct InMemorySearch {
    results: HashMap<String, Vec<String>>,
    queries: Mutex<Vec<String>>,
}

impl InMemorySearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, keyword: &str, titles: &[&str]) -> Self {
        self.results
            .insert(keyword.to_string(), titles.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl CandidateSearch for InMemorySearch {
    async fn search(&self, keyword: &str) -> Result<Vec<String>> {
        self.queries.lock().unwrap().push(keyword.to_string());
        self.results
            .get(keyword)
            .cloned()
            .ok_or_else(|| anyhow!("search backend error for '{}'", keyword))
    }
}

/// Answers the first rule whose needle occurs in the prompt; fails otherwise.
#[derive(Default)]
pub struct ScriptedCompletion {
    rules: Vec<(String, String)>,
    calls: AtomicUsize,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, needle: &str, answer: &str) -> Self {
        self.rules.push((needle.to_string(), answer.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, answer)| answer.clone())
            .ok_or_else(|| anyhow!("no scripted answer"))
    }
}

/// Needle matching the keyword prompt for `seed`.
pub fn keyword_needle(seed: &str) -> String {
    format!("website or name '{}'", seed)
}

pub const SUBSIDIARY_NEEDLE: &str = "owned by this company";
pub const ACQUISITION_NEEDLE: &str = "having been acquired";
