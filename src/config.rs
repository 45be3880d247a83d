//! Configuration management for corpref
//!
//! Configuration is loaded from `./config/corpref.toml` (or `--config PATH`).
//! The template in `config/corpref.toml` is the only place defaults live; it is
//! embedded in the binary and written out by `--init`.

use serde::Deserialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/corpref.toml";

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = include_str!("../config/corpref.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid URL in '{field}': {url}")]
    InvalidUrl { field: String, url: String },

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub reference: ReferenceConfig,
    pub search: SearchConfig,
    pub completion: CompletionConfig,
    pub extraction: ExtractionConfig,
    pub labels: LabelsConfig,
    pub resolver: ResolverConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub max_body_bytes: usize,
    /// 0 disables rate limiting
    #[serde(default)]
    pub requests_per_second: u32,
}

/// Reference site (article host) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceConfig {
    pub base_url: String,
    pub path_prefix: String,
    pub search_api_path: String,
    pub infobox_selector: String,
    /// Page namespaces that never hold company articles
    #[serde(default = "default_excluded_namespaces")]
    pub excluded_namespaces: Vec<String>,
}

fn default_excluded_namespaces() -> Vec<String> {
    crate::ref_path::DEFAULT_EXCLUDED_NAMESPACES
        .iter()
        .map(|ns| ns.to_string())
        .collect()
}

/// Candidate search limits
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub max_keywords: usize,
    pub max_titles_per_keyword: usize,
    pub fallback_titles_per_keyword: usize,
}

/// Chat-completion service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    #[serde(default)]
    pub temperature: f32,
    pub timeout_secs: u64,
}

/// How the inference phase combines with structured infobox results
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhasePolicy {
    /// Always run inference; keep structured results and add new inferred names
    Merge,
    /// Run inference only when the structured phase found nothing
    FirstNonEmpty,
}

/// Relationship extraction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    pub max_paragraphs: usize,
    pub min_name_chars: usize,
    pub none_placeholders: Vec<String>,
    pub subsidiary_policy: PhasePolicy,
    pub acquisition_policy: PhasePolicy,
}

/// Infobox label substrings per field kind
#[derive(Debug, Clone, Deserialize)]
pub struct LabelsConfig {
    pub website: Vec<String>,
    pub subsidiaries: Vec<String>,
    pub acquisitions: Vec<String>,
}

/// Link-validated domain resolver configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    pub child_fetch_concurrency: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        // The embedded template is covered by test_default_config_validates
        toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| panic!("embedded default config is invalid: {}", e))
    }
}

impl AppConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(Path::new(CONFIG_PATH))
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.user_agent.trim().is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "http.user_agent".to_string(),
            });
        }
        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "http.request_timeout_secs".to_string(),
            });
        }
        if self.http.max_body_bytes == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "http.max_body_bytes".to_string(),
            });
        }

        check_http_url("reference.base_url", &self.reference.base_url)?;
        check_http_url("completion.base_url", &self.completion.base_url)?;

        let prefix = &self.reference.path_prefix;
        if !prefix.starts_with('/') || !prefix.ends_with('/') || prefix.len() < 2 {
            return Err(ConfigError::InvalidValue {
                field: "reference.path_prefix".to_string(),
                reason: format!("'{}' must start and end with '/'", prefix),
            });
        }
        if !self.reference.search_api_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "reference.search_api_path".to_string(),
                reason: "must start with '/'".to_string(),
            });
        }
        if scraper::Selector::parse(&self.reference.infobox_selector).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "reference.infobox_selector".to_string(),
                reason: format!("'{}' is not a valid CSS selector", self.reference.infobox_selector),
            });
        }

        if self.search.max_keywords == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "search.max_keywords".to_string(),
            });
        }
        if self.search.max_titles_per_keyword == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "search.max_titles_per_keyword".to_string(),
            });
        }

        if self.completion.model.trim().is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "completion.model".to_string(),
            });
        }
        if self.completion.api_key_env.trim().is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "completion.api_key_env".to_string(),
            });
        }
        if self.completion.timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "completion.timeout_secs".to_string(),
            });
        }

        if self.extraction.min_name_chars == 0 {
            return Err(ConfigError::InvalidValue {
                field: "extraction.min_name_chars".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        for (field, labels) in [
            ("labels.website", &self.labels.website),
            ("labels.subsidiaries", &self.labels.subsidiaries),
            ("labels.acquisitions", &self.labels.acquisitions),
        ] {
            if labels.iter().all(|l| l.trim().is_empty()) {
                return Err(ConfigError::EmptyRequired {
                    field: field.to_string(),
                });
            }
        }

        if self.resolver.child_fetch_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "resolver.child_fetch_concurrency".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Create default configuration file at the standard location
    pub fn create_default_config() -> Result<PathBuf, ConfigError> {
        Self::create_default_config_at(Path::new(CONFIG_PATH))
    }

    /// Create default configuration file at a specific location
    pub fn create_default_config_at(path: &Path) -> Result<PathBuf, ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }
}

fn check_http_url(field: &str, url: &str) -> Result<(), ConfigError> {
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(ConfigError::InvalidUrl {
            field: field.to_string(),
            url: url.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config: Result<AppConfig, _> = toml::from_str(DEFAULT_CONFIG);
        assert!(config.is_ok(), "Default config should parse: {:?}", config.err());
    }

    #[test]
    fn test_default_config_validates() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert!(config.validate().is_ok(), "Default config should validate");
        assert_eq!(config.extraction.subsidiary_policy, PhasePolicy::Merge);
        assert_eq!(config.extraction.acquisition_policy, PhasePolicy::FirstNonEmpty);
        assert_eq!(config.reference.path_prefix, "/wiki/");
    }

    #[test]
    fn test_excluded_namespaces_default_when_omitted() {
        let trimmed: String = DEFAULT_CONFIG
            .lines()
            .filter(|line| !line.starts_with("excluded_namespaces"))
            .collect::<Vec<_>>()
            .join("\n");
        let config: AppConfig = toml::from_str(&trimmed).unwrap();
        assert!(config.reference.excluded_namespaces.iter().any(|ns| ns == "Wikipedia"));
        assert_eq!(config.reference.excluded_namespaces, AppConfig::default().reference.excluded_namespaces);
    }

    #[test]
    fn test_rejects_bad_path_prefix() {
        let mut config = AppConfig::default();
        config.reference.path_prefix = "wiki".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let mut config = AppConfig::default();
        config.reference.base_url = "ftp://example.org".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn test_rejects_empty_label_table() {
        let mut config = AppConfig::default();
        config.labels.website = vec!["  ".to_string()];
        match config.validate() {
            Err(ConfigError::EmptyRequired { field }) => assert_eq!(field, "labels.website"),
            other => panic!("expected EmptyRequired, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let mut config = AppConfig::default();
        config.resolver.child_fetch_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_policy_fails_to_parse() {
        let content = DEFAULT_CONFIG.replace("subsidiary_policy = \"merge\"", "subsidiary_policy = \"sometimes\"");
        let config: Result<AppConfig, _> = toml::from_str(&content);
        assert!(config.is_err());
    }

    #[test]
    fn test_load_from_missing_path() {
        let result = AppConfig::load_from_path(Path::new("/nonexistent/corpref.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_create_and_load_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("corpref.toml");
        let written = AppConfig::create_default_config_at(&path).unwrap();
        assert_eq!(written, path);

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.search.max_keywords, 3);
        assert_eq!(config.resolver.child_fetch_concurrency, 4);
    }
}
