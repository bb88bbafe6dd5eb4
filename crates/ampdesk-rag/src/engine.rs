//! Response orchestration: retrieval, dialogue policy and generation

use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use ampdesk_core::{
    ChatMessage, ChatReply, Citation, ConversationTurn, DEFAULT_SIMILARITY_THRESHOLD,
    DEFAULT_TOP_K, Error, GenerationConfig, LLMProvider, Result, Role, VectorIndex,
};

use crate::policy::{DialoguePolicy, Mode};
use crate::prompts::{SYSTEM_PROMPT, template_for};
use crate::retriever::ContextRetriever;

/// Reply used whenever the chat model cannot produce an answer
pub const FALLBACK_ANSWER: &str =
    "I apologize, but I encountered an error generating a response. Please try again.";

/// Static decoding and retrieval parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_k: usize,
    pub similarity_threshold: f32,
    /// Number of trailing history turns forwarded to the model
    pub history_window: usize,
    pub system_prompt: String,
    /// Bound on each chat completion attempt
    pub timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 800,
            top_k: DEFAULT_TOP_K,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            history_window: 5,
            system_prompt: SYSTEM_PROMPT.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

fn env_override<T: std::str::FromStr>(name: &str, target: &mut T) -> Result<()> {
    if let Ok(value) = env::var(name) {
        *target = value
            .parse()
            .map_err(|_| Error::Configuration(format!("{} has an invalid value: {}", name, value)))?;
    }
    Ok(())
}

impl EngineConfig {
    /// Defaults overridden by `TOP_K_RESULTS`, `SIMILARITY_THRESHOLD`,
    /// `CHAT_TEMPERATURE`, `MAX_TOKENS` and `OPENAI_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        env_override("TOP_K_RESULTS", &mut config.top_k)?;
        env_override("SIMILARITY_THRESHOLD", &mut config.similarity_threshold)?;
        env_override("CHAT_TEMPERATURE", &mut config.temperature)?;
        env_override("MAX_TOKENS", &mut config.max_tokens)?;

        let mut timeout_secs = config.timeout.as_secs();
        env_override("OPENAI_TIMEOUT_SECS", &mut timeout_secs)?;
        config.timeout = Duration::from_secs(timeout_secs);

        if config.top_k == 0 {
            return Err(Error::Configuration("TOP_K_RESULTS must be positive".to_string()));
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Health summary built from the index counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub index_ready: bool,
    pub documents_count: usize,
}

/// Everything decided for a turn before the model is called
#[derive(Debug, Clone)]
pub struct PreparedTurn {
    pub mode: Mode,
    pub messages: Vec<ChatMessage>,
    pub citations: Vec<Citation>,
}

/// Answers support questions from the knowledge base.
///
/// Holds no per-conversation state: every call receives its own history, so
/// one engine can serve concurrent conversations.
pub struct SupportEngine<V: VectorIndex + ?Sized, L: LLMProvider + ?Sized> {
    retriever: ContextRetriever<V>,
    policy: DialoguePolicy,
    llm: Arc<L>,
    config: EngineConfig,
}

impl<V: VectorIndex + ?Sized, L: LLMProvider + ?Sized> SupportEngine<V, L> {
    pub fn new(index: Arc<V>, llm: Arc<L>, config: EngineConfig) -> Self {
        let retriever = ContextRetriever::new(index, config.similarity_threshold);
        Self {
            retriever,
            policy: DialoguePolicy::new(),
            llm,
            config,
        }
    }

    pub fn index(&self) -> &Arc<V> {
        self.retriever.index()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Retrieve context, classify the turn and render the prompt
    pub async fn prepare(&self, message: &str, history: &[ConversationTurn]) -> PreparedTurn {
        let retrieved = self.retriever.retrieve(message, self.config.top_k).await;
        let mode = self.policy.classify(message, history);
        let user_prompt = template_for(mode).render(&retrieved.context, message);

        // Only user and assistant turns belong in a conversation history
        let turns: Vec<&ConversationTurn> = history
            .iter()
            .filter(|turn| turn.role != Role::System)
            .collect();
        let window = &turns[turns.len().saturating_sub(self.config.history_window)..];
        let mut messages = Vec::with_capacity(window.len() + 2);
        messages.push(ChatMessage::system(self.config.system_prompt.as_str()));
        messages.extend(window.iter().map(|turn| ChatMessage::from(*turn)));
        messages.push(ChatMessage::user(user_prompt));

        PreparedTurn {
            mode,
            messages,
            citations: retrieved.citations,
        }
    }

    /// Answer one message. Only an empty message is an error; a failing
    /// model degrades to [`FALLBACK_ANSWER`] with the citations kept.
    pub async fn chat(&self, message: &str, history: &[ConversationTurn]) -> Result<ChatReply> {
        if message.trim().is_empty() {
            return Err(Error::InvalidInput("Message must not be empty".to_string()));
        }

        let preview: String = message.chars().take(100).collect();
        info!("Processing chat message: {}", preview);

        let turn = self.prepare(message, history).await;
        let generation = GenerationConfig {
            model_id: self.llm.model_id().to_string(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            timeout: self.config.timeout,
            ..Default::default()
        };

        let answer = match self.llm.complete(&turn.messages, &generation).await {
            Ok(answer) => {
                info!("Generated response successfully (mode={})", turn.mode);
                answer
            }
            Err(e) => {
                error!("Error generating response (mode={}): {}", turn.mode, e);
                FALLBACK_ANSWER.to_string()
            }
        };

        let reply = ChatReply {
            answer,
            citations: turn.citations,
        };
        if reply.is_low_confidence() {
            warn!(
                "Low-confidence answer (similarity: {:.3}) for question: {}",
                reply.average_similarity(),
                preview
            );
        }
        Ok(reply)
    }

    pub async fn health(&self) -> HealthReport {
        let version = env!("CARGO_PKG_VERSION").to_string();
        match self.index().stats().await {
            Ok(stats) => HealthReport {
                status: HealthStatus::Healthy,
                version,
                index_ready: true,
                documents_count: stats.total_count,
            },
            Err(e) => {
                error!("Health check failed: {}", e);
                HealthReport {
                    status: HealthStatus::Unhealthy,
                    version,
                    index_ready: false,
                    documents_count: 0,
                }
            }
        }
    }

    /// Release the index's storage
    pub async fn shutdown(&self) {
        self.index().close().await;
        info!("Support engine shut down");
    }
}
