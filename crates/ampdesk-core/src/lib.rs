//! Core traits and types for Ampdesk
//!
//! This crate defines the contracts shared by the support assistant: the
//! knowledge-entry data model, the vector index, embedding and LLM provider
//! traits, and the error taxonomy. Backends and clients live in sibling
//! crates so the retrieval and dialogue logic can be tested with fakes.

pub mod embedding;
pub mod error;
pub mod llm;
pub mod similarity;
pub mod types;
pub mod vector_store;

#[cfg(test)]
mod tests;

pub use embedding::Embedder;
pub use error::{Error, Result};
pub use llm::{ChatMessage, GenerationConfig, LLMProvider};
pub use similarity::{cosine_similarity, rank};
pub use types::*;
pub use vector_store::{
    BatchOutcome, DEFAULT_EMBEDDING_BATCH_SIZE, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_TOP_K,
    EntryDraft, EntryId, EntryUpdate, IndexStats, KnowledgeEntry, Priority, SearchQuery,
    SearchResult, VectorIndex, check_dimension,
};
