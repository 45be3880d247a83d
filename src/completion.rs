//! Natural-language completion collaborator
//!
//! The resolver asks a chat-completion model for two things: search keyword
//! guesses for a company, and relationship names mentioned in article text.
//! Both answers are untyped comma-separated strings. Any failure of the
//! service degrades to an empty answer at the call site.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::CompletionConfig;

/// Prompt in, free-form text out.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: String, config: &CompletionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build completion HTTP client")?;

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            client,
        })
    }

    /// Read the API key from the environment variable named in the config.
    pub fn from_env(config: &CompletionConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow!("{} environment variable not set", config.api_key_env))?;
        Self::new(api_key, config)
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": &self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.temperature
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Completion API error {}: {}", status, body));
        }

        #[derive(Deserialize)]
        struct Message {
            content: Option<String>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            choices: Vec<Choice>,
        }

        let api_response: ApiResponse = response.json().await?;
        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| anyhow!("Completion API returned no choices"))
    }
}

/// Stand-in used when no API key is configured; every call fails, which the
/// resolver treats as "no answer".
pub struct UnavailableCompletion {
    reason: String,
}

impl UnavailableCompletion {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl CompletionService for UnavailableCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(anyhow!("Completion service unavailable: {}", self.reason))
    }
}

/// Guesses article search keywords for a company website or name.
#[derive(Clone)]
pub struct KeywordGuesser {
    completion: Arc<dyn CompletionService>,
    max_keywords: usize,
}

impl KeywordGuesser {
    pub fn new(completion: Arc<dyn CompletionService>, max_keywords: usize) -> Self {
        Self { completion, max_keywords }
    }

    /// Up to `max_keywords` guesses, most specific first. Empty when the
    /// completion service fails.
    pub async fn guess(&self, seed: &str) -> Vec<String> {
        let prompt = keyword_prompt(seed);
        match self.completion.complete(&prompt).await {
            Ok(answer) => {
                let mut keywords = parse_list(&answer, &[]);
                keywords.truncate(self.max_keywords);
                debug!("Keyword guesses for '{}': {:?}", seed, keywords);
                keywords
            }
            Err(e) => {
                warn!("Keyword guessing failed for '{}': {}", seed, e);
                Vec::new()
            }
        }
    }
}

pub fn keyword_prompt(seed: &str) -> String {
    format!(
        "Given the official website or name '{}', guess up to 3 different search keywords to find the company's encyclopedia article. \
         Include: (1) the company name, (2) the full form if it's an abbreviation, (3) the company name plus its main line of business. \
         Respond with a comma-separated list of up to 3 keywords or phrases, no explanations.",
        seed
    )
}

/// Split a comma-separated model answer into trimmed items.
///
/// Bullets, surrounding quotes and trailing periods are removed; empty items
/// and items equal (case-insensitively) to one of `placeholders` are dropped.
pub fn parse_list(answer: &str, placeholders: &[String]) -> Vec<String> {
    answer
        .split([',', '\n', ';'])
        .map(clean_item)
        .filter(|item| !item.is_empty())
        .filter(|item| !placeholders.iter().any(|p| p.eq_ignore_ascii_case(item)))
        .collect()
}

fn clean_item(item: &str) -> String {
    let item = item.trim().trim_start_matches(['-', '*', '•']);
    let item = strip_numbering(item.trim());
    let item = item.trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c.is_whitespace());

    // Keep the period of corporate abbreviations ("Roadrunner Inc.")
    let abbreviations = ["Inc.", "Corp.", "Ltd.", "Co.", "Bros.", "S.A.", "N.V.", "Jr."];
    let item = if abbreviations.iter().any(|a| item.ends_with(a)) {
        item
    } else {
        item.strip_suffix('.').unwrap_or(item)
    };
    item.trim().to_string()
}

/// "1. Nvidia" / "2) Nvidia" -> "Nvidia"
fn strip_numbering(item: &str) -> &str {
    let digits = item.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return item;
    }
    let rest = &item[digits..];
    match rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
        Some(stripped) if stripped.starts_with(' ') => stripped.trim_start(),
        _ => item,
    }
}
