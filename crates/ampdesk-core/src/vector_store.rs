//! Knowledge entry model and the vector index trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{Error, Result};

/// Identifier assigned to an entry by the index that owns it
pub type EntryId = i64;

/// Default number of passages returned by a search
pub const DEFAULT_TOP_K: usize = 10;

/// Default relevance floor for a search
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.2;

/// Default number of texts sent to the embedding model per request
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 100;

/// Editorial priority of a knowledge entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Priority> {
        match s.to_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "critical" => Some(Priority::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored passage together with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: EntryId,
    pub title: Option<String>,
    pub content: String,
    pub category: String,
    pub tags: BTreeSet<String>,
    pub source: String,
    pub priority: Priority,
    pub embedding: Vec<f32>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_source() -> String {
    "unknown".to_string()
}

fn default_category() -> String {
    "general".to_string()
}

/// Everything needed to create an entry except its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub content: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl EntryDraft {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            title: None,
            source: source.into(),
            category: default_category(),
            tags: BTreeSet::new(),
            priority: Priority::default(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Turn the draft into a stored entry once its embedding is known
    pub fn into_entry(self, id: EntryId, embedding: Vec<f32>) -> KnowledgeEntry {
        let now = Utc::now();
        KnowledgeEntry {
            id,
            title: self.title,
            content: self.content,
            category: self.category,
            tags: self.tags,
            source: self.source,
            priority: self.priority,
            embedding,
            metadata: self.metadata,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<KnowledgeEntry> for EntryDraft {
    fn from(entry: KnowledgeEntry) -> Self {
        Self {
            content: entry.content,
            title: entry.title,
            source: entry.source,
            category: entry.category,
            tags: entry.tags,
            priority: entry.priority,
            metadata: entry.metadata,
        }
    }
}

/// Partial update of an entry; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryUpdate {
    pub content: Option<String>,
    pub title: Option<String>,
    pub category: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub priority: Option<Priority>,
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl EntryUpdate {
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.title.is_none()
            && self.category.is_none()
            && self.tags.is_none()
            && self.priority.is_none()
            && self.metadata.is_none()
    }

    /// Apply the non-content fields to an entry.
    ///
    /// Content changes carry a fresh embedding and are applied by the index.
    pub fn apply_fields(&self, entry: &mut KnowledgeEntry) {
        if let Some(title) = &self.title {
            entry.title = Some(title.clone());
        }
        if let Some(category) = &self.category {
            entry.category = category.clone();
        }
        if let Some(tags) = &self.tags {
            entry.tags = tags.clone();
        }
        if let Some(priority) = self.priority {
            entry.priority = priority;
        }
        if let Some(metadata) = &self.metadata {
            entry.metadata = metadata.clone();
        }
        entry.updated_at = Utc::now();
    }
}

/// A scored entry produced by one search call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub entry: KnowledgeEntry,
    pub similarity: f32,
}

/// Parameters of a similarity search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub top_k: usize,
    pub threshold: f32,
    pub category: Option<String>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            top_k: DEFAULT_TOP_K,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            category: None,
        }
    }
}

/// Outcome of a partial-failure tolerant batch insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub attempted: usize,
}

impl BatchOutcome {
    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }
}

/// Aggregate counters used for health reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_count: usize,
    pub active_count: usize,
    pub category_count: usize,
    pub source_count: usize,
    pub dimension: usize,
    pub model_name: String,
}

/// Reject embeddings that do not match the index dimension
pub fn check_dimension(expected: usize, embedding: &[f32]) -> Result<()> {
    if embedding.len() != expected {
        return Err(Error::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    Ok(())
}

/// Trait for knowledge-base vector indexes
///
/// The index owns entry storage and lifecycle. Implementations must be
/// interchangeable: same ranking rule, same failure policy. Retrieval never
/// fails loudly: `search` degrades to an empty result, writes report
/// failure through their return value.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embed and store a single entry
    async fn upsert(&self, draft: EntryDraft) -> Result<EntryId>;

    /// Embed and store many entries, skipping those whose embedding failed
    async fn upsert_batch(&self, drafts: Vec<EntryDraft>) -> BatchOutcome;

    /// Rank active entries against a query
    async fn search(&self, query: &SearchQuery) -> Vec<SearchResult>;

    /// Fetch one entry by id, active or not
    async fn get(&self, id: EntryId) -> Option<KnowledgeEntry>;

    /// Update fields of an entry; new content regenerates the embedding
    async fn update(&self, id: EntryId, update: EntryUpdate) -> bool;

    /// Soft delete deactivates the entry, hard delete removes it
    async fn delete(&self, id: EntryId, soft: bool) -> bool;

    /// Remove every entry; refuses unless `confirm` is set
    async fn clear(&self, confirm: bool) -> bool;

    /// Counters for health reporting
    async fn stats(&self) -> Result<IndexStats>;

    /// Fixed embedding dimension of this index
    fn dimension(&self) -> usize;

    /// Release any held storage resources
    async fn close(&self) {}
}
