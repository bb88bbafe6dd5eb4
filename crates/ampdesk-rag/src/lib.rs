//! Retrieval, dialogue policy and response orchestration for Ampdesk
//!
//! This crate provides the two vector index backends, the context
//! retriever, the stateless dialogue policy with its prompt templates, and
//! the `SupportEngine` that ties them to a chat model.

mod batching;
mod engine;
mod flat_index;
mod ingest;
mod retriever;
mod sqlite_index;

pub mod policy;
pub mod prompts;

#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests;

pub use engine::{
    EngineConfig, FALLBACK_ANSWER, HealthReport, HealthStatus, PreparedTurn, SupportEngine,
};
pub use flat_index::FlatVectorIndex;
pub use ingest::{load_drafts, migrate_entries, parse_drafts};
pub use policy::{DialoguePolicy, Mode};
pub use retriever::{ContextRetriever, NO_CONTEXT, RetrievedContext, format_context};
pub use sqlite_index::SqliteVectorIndex;

// Re-export core types for convenience
pub use ampdesk_core::{
    BatchOutcome, ChatReply, Citation, ConversationTurn, EntryDraft, EntryId, EntryUpdate, Error,
    IndexStats, KnowledgeEntry, Result, SearchQuery, SearchResult, VectorIndex,
};
