//! OpenAI-compatible endpoint configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use ampdesk_core::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

/// Configuration for the OpenAI client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub llm_model: String,
    pub embedding_dimension: usize,
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            Error::Configuration("OPENAI_API_KEY environment variable not found".to_string())
        })?;

        let mut config = Self::new(api_key);

        if let Ok(base_url) = env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = env::var("EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Ok(model) = env::var("LLM_MODEL") {
            config.llm_model = model;
        }
        if let Ok(dimension) = env::var("EMBEDDING_DIMENSION") {
            config.embedding_dimension = dimension.parse().map_err(|_| {
                Error::Configuration(format!("EMBEDDING_DIMENSION is not a number: {}", dimension))
            })?;
        }
        if let Ok(secs) = env::var("OPENAI_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                Error::Configuration(format!("OPENAI_TIMEOUT_SECS is not a number: {}", secs))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Create configuration with explicit key and default endpoints
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Check the values that would otherwise fail on the first request
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Configuration("OpenAI API key is empty".to_string()));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| Error::Configuration(format!("Invalid base URL {}: {}", self.base_url, e)))?;
        if self.embedding_dimension == 0 {
            return Err(Error::Configuration("Embedding dimension must be positive".to_string()));
        }
        Ok(())
    }

    /// Full URL of an API route such as `embeddings`
    pub fn endpoint(&self, route: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = OpenAiConfig::new("sk-test".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(config.embedding_dimension, 1536);
        assert_eq!(config.endpoint("embeddings"), "https://api.openai.com/v1/embeddings");
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let config = OpenAiConfig::new("sk-test".to_string()).with_base_url("http://localhost:1234/v1/");
        assert_eq!(
            config.endpoint("chat/completions"),
            "http://localhost:1234/v1/chat/completions"
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad_url = OpenAiConfig::new("sk-test".to_string()).with_base_url("not a url");
        assert!(matches!(bad_url.validate(), Err(Error::Configuration(_))));

        let empty_key = OpenAiConfig::new("  ".to_string());
        assert!(matches!(empty_key.validate(), Err(Error::Configuration(_))));
    }
}
