//! Common types used across the Ampdesk system

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::vector_store::SearchResult;

/// Maximum number of characters kept in a citation excerpt
pub const CITATION_EXCERPT_CHARS: usize = 300;

/// Mean similarity below which a reply is considered weakly grounded
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Author of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One prior message of a conversation, owned by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A retrieved passage returned alongside an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub content_excerpt: String,
    pub source: String,
    pub similarity: f64,
}

impl Citation {
    /// Build a citation from a ranked search result.
    ///
    /// The excerpt is cut at [`CITATION_EXCERPT_CHARS`] characters with a
    /// trailing ellipsis; the similarity is rounded to three decimals.
    pub fn from_result(result: &SearchResult) -> Self {
        Self {
            content_excerpt: excerpt(&result.entry.content, CITATION_EXCERPT_CHARS),
            source: result.entry.source.clone(),
            similarity: round3(result.similarity),
        }
    }
}

fn excerpt(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

fn round3(value: f32) -> f64 {
    (f64::from(value) * 1000.0).round() / 1000.0
}

/// Answer plus the citations that grounded it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub answer: String,
    pub citations: Vec<Citation>,
}

impl ChatReply {
    /// Mean similarity of the cited passages, 0.0 when nothing was cited
    pub fn average_similarity(&self) -> f64 {
        if self.citations.is_empty() {
            return 0.0;
        }
        self.citations.iter().map(|c| c.similarity).sum::<f64>() / self.citations.len() as f64
    }

    /// True when passages were found but matched the question poorly
    pub fn is_low_confidence(&self) -> bool {
        !self.citations.is_empty() && self.average_similarity() < LOW_CONFIDENCE_THRESHOLD
    }
}

/// Configuration for retry behavior on upstream calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryConfig {
    /// Delay to wait after the given failed attempt (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }
}
