//! Reference-site collaborators
//!
//! [`DocumentSource`] fetches article HTML by URL and [`CandidateSearch`]
//! returns ranked article titles for a keyword. [`WikiClient`] implements both
//! against a MediaWiki-style site; tests substitute in-memory fakes.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::{HttpConfig, ReferenceConfig};
use crate::document::{DocumentParser, ReferenceDocument};
use crate::rate_limit::HostRateLimiter;

/// Fetches raw article HTML. Any error means "unavailable".
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Ranked article titles for a search keyword.
#[async_trait]
pub trait CandidateSearch: Send + Sync {
    async fn search(&self, keyword: &str) -> Result<Vec<String>>;
}

/// Fetch and parse an article, folding every failure into `None`.
pub async fn fetch_document(
    source: &dyn DocumentSource,
    parser: &DocumentParser,
    url: &str,
) -> Option<ReferenceDocument> {
    match source.fetch(url).await {
        Ok(html) => Some(parser.parse(url, &html)),
        Err(e) => {
            debug!("Article unavailable {}: {}", url, e);
            None
        }
    }
}

/// HTTP client for a MediaWiki-style reference site.
#[derive(Clone)]
pub struct WikiClient {
    client: reqwest::Client,
    search_endpoint: String,
    max_results: usize,
    max_body_bytes: usize,
    limiter: HostRateLimiter,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

impl WikiClient {
    pub fn new(http: &HttpConfig, reference: &ReferenceConfig, max_results: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(http.request_timeout_secs))
            .user_agent(http.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("Failed to build reference-site HTTP client")?;

        Ok(Self {
            client,
            search_endpoint: format!(
                "{}{}",
                reference.base_url.trim_end_matches('/'),
                reference.search_api_path
            ),
            max_results,
            max_body_bytes: http.max_body_bytes,
            limiter: HostRateLimiter::new(http.requests_per_second),
        })
    }

    async fn pace(&self, url: &str) {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        self.limiter.acquire(&host).await;
    }
}

#[async_trait]
impl DocumentSource for WikiClient {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.pace(url).await;
        debug!("Fetching article: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to fetch {}: {}", url, e))?;

        if !response.status().is_success() {
            return Err(anyhow!("Non-success status {} for {}", response.status(), url));
        }

        read_response_body_capped(response, self.max_body_bytes).await
    }
}

#[async_trait]
impl CandidateSearch for WikiClient {
    async fn search(&self, keyword: &str) -> Result<Vec<String>> {
        self.pace(&self.search_endpoint).await;
        debug!("Searching reference site for '{}'", keyword);

        let limit = self.max_results.to_string();
        let response = self
            .client
            .get(&self.search_endpoint)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", keyword),
                ("srlimit", limit.as_str()),
                ("format", "json"),
                ("utf8", "1"),
            ])
            .send()
            .await
            .map_err(|e| anyhow!("Search request failed for '{}': {}", keyword, e))?;

        if !response.status().is_success() {
            return Err(anyhow!("Search returned status {} for '{}'", response.status(), keyword));
        }

        let body: SearchResponse = response
            .json()
            .await
            .with_context(|| format!("Malformed search response for '{}'", keyword))?;

        Ok(body
            .query
            .map(|q| q.search.into_iter().map(|hit| hit.title).collect())
            .unwrap_or_default())
    }
}

/// Read a response body, truncating at `max_bytes` while streaming.
async fn read_response_body_capped(response: reqwest::Response, max_bytes: usize) -> Result<String> {
    let mut body = Vec::with_capacity(max_bytes.min(256 * 1024));
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| anyhow!("Stream read error: {}", e))?;
        let remaining = max_bytes.saturating_sub(body.len());
        if remaining == 0 {
            debug!("Response truncated at {} bytes", max_bytes);
            break;
        }
        body.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}
