//! LLM provider trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::{ConversationTurn, Role};
use crate::Result;

/// Configuration for text generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub model_id: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model_id: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            max_tokens: 800,
            timeout: Duration::from_secs(60),
        }
    }
}

/// One message of a rendered chat prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

impl From<&ConversationTurn> for ChatMessage {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
        }
    }
}

/// Trait for generative chat models
///
/// Implementations turn an ordered message list into a completion. Failures
/// surface as errors; callers decide how to degrade.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Produce a completion for the given messages
    async fn complete(&self, messages: &[ChatMessage], config: &GenerationConfig) -> Result<String>;

    /// Get the model ID being used
    fn model_id(&self) -> &str;
}
