//! OpenAI client implementation

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use ampdesk_core::{
    ChatMessage, Embedder, Error, GenerationConfig, LLMProvider, Result, RetryConfig,
};

use crate::config::OpenAiConfig;

/// Client for OpenAI-compatible embedding and chat completion endpoints
pub struct OpenAiClient {
    config: OpenAiConfig,
    retry: RetryConfig,
    client: Client,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a, T: Serialize + ?Sized> {
    model: &'a str,
    input: &'a T,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

impl OpenAiClient {
    /// Create a new client from configuration
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            config,
            retry: RetryConfig::default(),
            client,
        })
    }

    /// Create a new client from environment variables
    pub fn from_env() -> Result<Self> {
        let config = OpenAiConfig::from_env()?;
        Self::new(config)
    }

    /// Override the retry policy
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    /// POST a JSON body, retrying transient failures with exponential backoff
    async fn post_with_retry<B, R>(&self, route: &str, body: &B, limit: Duration) -> Result<R>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de> + Send,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let outcome = match timeout(limit, self.post_once(route, body)).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(format!(
                    "{} did not answer within {:?}",
                    route, limit
                ))),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.backoff_for(attempt);
                    warn!(
                        "{} attempt {}/{} failed: {}. Retrying in {:?}",
                        route, attempt, max_attempts, e, delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post_once<B, R>(&self, route: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de> + Send,
    {
        let response = self
            .client
            .post(self.config.endpoint(route))
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_status(status, &error_text));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Map a failed HTTP status to an error; throttling and server faults are transient
fn classify_status(status: StatusCode, body: &str) -> Error {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Authentication(format!("Request rejected with status {}: {}", status, body))
        }
        StatusCode::TOO_MANY_REQUESTS => Error::Network(format!("Rate limited: {}", body)),
        s if s.is_server_error() => {
            Error::Network(format!("Server error {}: {}", status, body))
        }
        _ => Error::Other(format!("Request failed with status {}: {}", status, body)),
    }
}

/// Order embeddings by their `index` field and check the count
fn collect_embeddings(response: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if response.data.len() != expected {
        return Err(Error::Embedding(format!(
            "Expected {} embeddings, received {}",
            expected,
            response.data.len()
        )));
    }

    let mut data = response.data;
    data.sort_by_key(|item| item.index);
    Ok(data.into_iter().map(|item| item.embedding).collect())
}

fn first_completion(response: CompletionResponse) -> Result<String> {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(Error::Generation("Empty completion from model".to_string()));
    }
    Ok(text)
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: text,
        };

        let response: EmbeddingResponse = self
            .post_with_retry("embeddings", &request, self.config.timeout)
            .await
            .map_err(|e| Error::Embedding(e.to_string()))?;

        let mut vectors = collect_embeddings(response, 1)?;
        Ok(vectors.remove(0))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: texts,
        };

        debug!("Requesting {} embeddings", texts.len());
        let response: EmbeddingResponse = self
            .post_with_retry("embeddings", &request, self.config.timeout)
            .await
            .map_err(|e| Error::Embedding(e.to_string()))?;

        collect_embeddings(response, texts.len())
    }

    fn dimension(&self) -> usize {
        self.config.embedding_dimension
    }

    fn model_name(&self) -> &str {
        &self.config.embedding_model
    }
}

#[async_trait]
impl LLMProvider for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage], config: &GenerationConfig) -> Result<String> {
        let request = CompletionRequest {
            model: &config.model_id,
            messages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };

        let response: CompletionResponse = self
            .post_with_retry("chat/completions", &request, config.timeout)
            .await
            .map_err(|e| Error::Generation(e.to_string()))?;

        first_completion(response)
    }

    fn model_id(&self) -> &str {
        &self.config.llm_model
    }
}
