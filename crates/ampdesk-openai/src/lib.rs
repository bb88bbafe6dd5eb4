//! OpenAI-compatible provider for Ampdesk
//!
//! This crate implements the `Embedder` and `LLMProvider` traits against the
//! `/embeddings` and `/chat/completions` routes, with per-call timeouts and
//! exponential backoff on transient failures.

mod client;
mod config;

#[cfg(test)]
mod tests;

pub use client::OpenAiClient;
pub use config::{
    DEFAULT_BASE_URL, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL, DEFAULT_LLM_MODEL,
    OpenAiConfig,
};

// Re-export core types for convenience
pub use ampdesk_core::{ChatMessage, Embedder, Error, GenerationConfig, LLMProvider, Result, RetryConfig};
