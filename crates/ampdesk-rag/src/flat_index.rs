//! In-memory vector index with optional JSON file persistence

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{error, info, warn};

use ampdesk_core::{
    BatchOutcome, DEFAULT_EMBEDDING_BATCH_SIZE, Embedder, EntryDraft, EntryId, EntryUpdate,
    Error, IndexStats, KnowledgeEntry, Result, SearchQuery, SearchResult, VectorIndex,
    check_dimension, rank,
};

use crate::batching::embed_in_batches;

/// On-disk layout of a flat index
#[derive(Debug, Serialize, Deserialize)]
struct FlatIndexData {
    embedding_dimension: usize,
    model_name: String,
    next_id: EntryId,
    entries: Vec<KnowledgeEntry>,
}

/// Flat vector index: every search scores every active entry
///
/// Entries are kept in insertion order, which is also id order, so the
/// stable ranking sort breaks ties by insertion.
pub struct FlatVectorIndex<E: Embedder> {
    embedder: Arc<E>,
    data: RwLock<FlatIndexData>,
    path: Option<PathBuf>,
    batch_size: usize,
}

impl<E: Embedder> FlatVectorIndex<E> {
    /// Create an empty, memory-only index
    pub fn new(embedder: Arc<E>) -> Self {
        let data = FlatIndexData {
            embedding_dimension: embedder.dimension(),
            model_name: embedder.model_name().to_string(),
            next_id: 1,
            entries: Vec::new(),
        };

        Self {
            embedder,
            data: RwLock::new(data),
            path: None,
            batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
        }
    }

    /// Open a file-backed index, loading the file when it exists
    pub fn open(path: impl AsRef<Path>, embedder: Arc<E>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut index = Self::new(embedder);

        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let data: FlatIndexData = serde_json::from_str(&content)?;
            if data.embedding_dimension != index.embedder.dimension() {
                return Err(Error::DimensionMismatch {
                    expected: index.embedder.dimension(),
                    actual: data.embedding_dimension,
                });
            }
            info!("Loaded {} entries from {}", data.entries.len(), path.display());
            index.data = RwLock::new(data);
        } else {
            warn!("Index file {} not found, starting empty", path.display());
        }

        index.path = Some(path);
        Ok(index)
    }

    /// Set the number of texts per embedding request
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Write the index to its backing file, if it has one
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let content = {
            let data = self.read()?;
            serde_json::to_string_pretty(&*data)?
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        info!("Saved index to {}", path.display());
        Ok(())
    }

    /// Snapshot of every entry, active or not, in insertion order
    pub fn entries(&self) -> Result<Vec<KnowledgeEntry>> {
        Ok(self.read()?.entries.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, FlatIndexData>> {
        self.data
            .read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, FlatIndexData>> {
        self.data
            .write()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))
    }

    fn insert(&self, draft: EntryDraft, embedding: Vec<f32>) -> Result<EntryId> {
        let mut data = self.write()?;
        let id = data.next_id;
        data.next_id += 1;
        data.entries.push(draft.into_entry(id, embedding));
        Ok(id)
    }

    fn apply_update(&self, id: EntryId, update: &EntryUpdate, embedding: Option<Vec<f32>>) -> Result<bool> {
        let mut data = self.write()?;
        let Some(entry) = data.entries.iter_mut().find(|e| e.id == id) else {
            return Ok(false);
        };

        if let (Some(content), Some(embedding)) = (&update.content, embedding) {
            entry.content = content.clone();
            entry.embedding = embedding;
        }
        update.apply_fields(entry);
        Ok(true)
    }

    fn remove(&self, id: EntryId, soft: bool) -> Result<bool> {
        let mut data = self.write()?;
        if soft {
            let Some(entry) = data.entries.iter_mut().find(|e| e.id == id) else {
                return Ok(false);
            };
            entry.active = false;
            entry.updated_at = chrono::Utc::now();
            Ok(true)
        } else {
            let before = data.entries.len();
            data.entries.retain(|e| e.id != id);
            Ok(data.entries.len() < before)
        }
    }

    fn score(&self, query_embedding: &[f32], query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let data = self.read()?;
        let candidates = data.entries.iter().filter(|entry| {
            entry.active
                && query
                    .category
                    .as_ref()
                    .is_none_or(|category| &entry.category == category)
        });
        Ok(rank(query_embedding, candidates, query.top_k, query.threshold))
    }
}

#[async_trait]
impl<E: Embedder + 'static> VectorIndex for FlatVectorIndex<E> {
    async fn upsert(&self, draft: EntryDraft) -> Result<EntryId> {
        let embedding = self.embedder.embed(&draft.content).await.map_err(|e| {
            error!("Failed to create embedding: {}", e);
            match e {
                Error::Embedding(_) => e,
                other => Error::Embedding(other.to_string()),
            }
        })?;
        check_dimension(self.dimension(), &embedding)?;

        let id = self.insert(draft, embedding)?;
        info!("Added entry {} to flat index", id);
        Ok(id)
    }

    async fn upsert_batch(&self, drafts: Vec<EntryDraft>) -> BatchOutcome {
        let attempted = drafts.len();
        info!("Adding {} entries to flat index", attempted);

        let texts: Vec<String> = drafts.iter().map(|d| d.content.clone()).collect();
        let embeddings = embed_in_batches(self.embedder.as_ref(), &texts, self.batch_size).await;

        let mut succeeded = 0;
        for (i, (draft, embedding)) in drafts.into_iter().zip(embeddings).enumerate() {
            let Some(embedding) = embedding else {
                warn!("Skipping entry {} due to embedding failure", i + 1);
                continue;
            };
            match self.insert(draft, embedding) {
                Ok(_) => succeeded += 1,
                Err(e) => error!("Error inserting entry {}: {}", i + 1, e),
            }
        }

        info!("Successfully added {}/{} entries", succeeded, attempted);
        BatchOutcome { succeeded, attempted }
    }

    async fn search(&self, query: &SearchQuery) -> Vec<SearchResult> {
        let query_embedding = match self.embedder.embed(&query.query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                error!("Failed to create query embedding: {}", e);
                return Vec::new();
            }
        };
        if let Err(e) = check_dimension(self.dimension(), &query_embedding) {
            error!("Query embedding rejected: {}", e);
            return Vec::new();
        }

        match self.score(&query_embedding, query) {
            Ok(results) => {
                info!("Found {} relevant entries for query", results.len());
                results
            }
            Err(e) => {
                error!("Error searching flat index: {}", e);
                Vec::new()
            }
        }
    }

    async fn get(&self, id: EntryId) -> Option<KnowledgeEntry> {
        let data = self.read().ok()?;
        data.entries.iter().find(|e| e.id == id).cloned()
    }

    async fn update(&self, id: EntryId, update: EntryUpdate) -> bool {
        if update.is_empty() {
            warn!("No fields to update for entry {}", id);
            return false;
        }

        let embedding = match &update.content {
            Some(content) => match self.embedder.embed(content).await {
                Ok(embedding) if embedding.len() == self.dimension() => Some(embedding),
                Ok(embedding) => {
                    error!(
                        "Embedding for updated content has dimension {}, expected {}",
                        embedding.len(),
                        self.dimension()
                    );
                    return false;
                }
                Err(e) => {
                    error!("Failed to create embedding for updated content: {}", e);
                    return false;
                }
            },
            None => None,
        };

        match self.apply_update(id, &update, embedding) {
            Ok(found) => {
                if found {
                    info!("Updated entry {}", id);
                }
                found
            }
            Err(e) => {
                error!("Error updating entry {}: {}", id, e);
                false
            }
        }
    }

    async fn delete(&self, id: EntryId, soft: bool) -> bool {
        match self.remove(id, soft) {
            Ok(found) => {
                if found {
                    info!("{} deleted entry {}", if soft { "Soft" } else { "Hard" }, id);
                }
                found
            }
            Err(e) => {
                error!("Error deleting entry {}: {}", id, e);
                false
            }
        }
    }

    async fn clear(&self, confirm: bool) -> bool {
        if !confirm {
            warn!("Clear requires confirm=true");
            return false;
        }
        match self.write() {
            Ok(mut data) => {
                data.entries.clear();
                warn!("Cleared all entries from flat index");
                true
            }
            Err(e) => {
                error!("Error clearing flat index: {}", e);
                false
            }
        }
    }

    async fn stats(&self) -> Result<IndexStats> {
        let data = self.read()?;
        let categories: HashSet<&str> = data.entries.iter().map(|e| e.category.as_str()).collect();
        let sources: HashSet<&str> = data.entries.iter().map(|e| e.source.as_str()).collect();

        Ok(IndexStats {
            total_count: data.entries.len(),
            active_count: data.entries.iter().filter(|e| e.active).count(),
            category_count: categories.len(),
            source_count: sources.len(),
            dimension: data.embedding_dimension,
            model_name: data.model_name.clone(),
        })
    }

    fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    async fn close(&self) {
        if let Err(e) = self.save() {
            error!("Error saving flat index on close: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEmbedder;
    use tempfile::tempdir;

    fn scenario_embedder() -> FakeEmbedder {
        FakeEmbedder::new(2)
            .with_vector("HDMI ARC connection", vec![1.0, 0.0])
            .with_vector("ARC setup", vec![0.9, 0.435_889_9])
            .with_vector("Speaker wire gauge", vec![0.1, 0.994_987_4])
            .with_vector("Optical input", vec![0.5, 0.866_025_4])
    }

    #[tokio::test]
    async fn test_search_scenario() {
        let index = FlatVectorIndex::new(Arc::new(scenario_embedder()));
        index.upsert(EntryDraft::new("ARC setup", "manual")).await.unwrap();
        index.upsert(EntryDraft::new("Speaker wire gauge", "manual")).await.unwrap();
        index.upsert(EntryDraft::new("Optical input", "manual")).await.unwrap();

        let query = SearchQuery::new("HDMI ARC connection").with_top_k(3).with_threshold(0.2);
        let results = index.search(&query).await;

        assert_eq!(results.len(), 2);
        assert!((results[0].similarity - 0.9).abs() < 1e-4);
        assert!((results[1].similarity - 0.5).abs() < 1e-4);
        assert_eq!(results[0].entry.content, "ARC setup");
    }

    #[tokio::test]
    async fn test_search_respects_top_k_and_category() {
        let index = FlatVectorIndex::new(Arc::new(scenario_embedder()));
        index
            .upsert(EntryDraft::new("ARC setup", "manual").with_category("connectivity"))
            .await
            .unwrap();
        index.upsert(EntryDraft::new("Optical input", "manual")).await.unwrap();

        let capped = index
            .search(&SearchQuery::new("HDMI ARC connection").with_top_k(1).with_threshold(0.0))
            .await;
        assert_eq!(capped.len(), 1);

        let filtered = index
            .search(
                &SearchQuery::new("HDMI ARC connection")
                    .with_threshold(0.0)
                    .with_category("general"),
            )
            .await;
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].entry.content, "Optical input");
    }

    #[tokio::test]
    async fn test_search_degrades_when_embedding_fails() {
        let embedder = Arc::new(scenario_embedder());
        let index = FlatVectorIndex::new(embedder.clone());
        index.upsert(EntryDraft::new("ARC setup", "manual")).await.unwrap();

        embedder.set_fail_all(true);
        let results = index.search(&SearchQuery::new("HDMI ARC connection")).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_fails_without_embedding() {
        let embedder = Arc::new(FakeEmbedder::new(4).failing_on("bad text"));
        let index = FlatVectorIndex::new(embedder);

        let err = index.upsert(EntryDraft::new("bad text", "manual")).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
        assert_eq!(index.stats().await.unwrap().total_count, 0);
    }

    #[tokio::test]
    async fn test_upsert_rejects_wrong_dimension() {
        let embedder = Arc::new(FakeEmbedder::new(4).with_vector("short", vec![1.0]));
        let index = FlatVectorIndex::new(embedder);

        let err = index.upsert(EntryDraft::new("short", "manual")).await.unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 4, actual: 1 }));
    }

    #[tokio::test]
    async fn test_batch_reports_partial_failure() {
        let embedder = Arc::new(FakeEmbedder::new(8).failing_on("corrupt page"));
        let index = FlatVectorIndex::new(embedder).with_batch_size(2);

        let drafts = vec![
            EntryDraft::new("page one", "manual"),
            EntryDraft::new("page two", "manual"),
            EntryDraft::new("corrupt page", "manual"),
            EntryDraft::new("page four", "manual"),
            EntryDraft::new("page five", "manual"),
        ];

        let outcome = index.upsert_batch(drafts).await;
        assert_eq!(outcome, BatchOutcome { succeeded: 3, attempted: 5 });
        assert_eq!(outcome.failed(), 2);
        assert_eq!(index.stats().await.unwrap().total_count, 3);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_entry_from_search() {
        let index = FlatVectorIndex::new(Arc::new(scenario_embedder()));
        let id = index.upsert(EntryDraft::new("ARC setup", "manual")).await.unwrap();

        assert!(index.delete(id, true).await);
        let results = index
            .search(&SearchQuery::new("HDMI ARC connection").with_threshold(0.0))
            .await;
        assert!(results.is_empty());

        let entry = index.get(id).await.unwrap();
        assert!(!entry.active);

        let stats = index.stats().await.unwrap();
        assert_eq!(stats.total_count, 1);
        assert_eq!(stats.active_count, 0);

        assert!(index.delete(id, false).await);
        assert!(index.get(id).await.is_none());
        assert!(!index.delete(id, false).await);
    }

    #[tokio::test]
    async fn test_update_regenerates_embedding() {
        let index = FlatVectorIndex::new(Arc::new(scenario_embedder()));
        let id = index.upsert(EntryDraft::new("Speaker wire gauge", "manual")).await.unwrap();

        let update = EntryUpdate {
            content: Some("ARC setup".to_string()),
            title: Some("ARC".to_string()),
            ..Default::default()
        };
        assert!(index.update(id, update).await);

        let entry = index.get(id).await.unwrap();
        assert_eq!(entry.content, "ARC setup");
        assert_eq!(entry.embedding, vec![0.9, 0.435_889_9]);
        assert_eq!(entry.title.as_deref(), Some("ARC"));

        assert!(!index.update(id, EntryUpdate::default()).await);
        assert!(!index.update(999, EntryUpdate { title: Some("x".to_string()), ..Default::default() }).await);
    }

    #[tokio::test]
    async fn test_clear_requires_confirmation() {
        let index = FlatVectorIndex::new(Arc::new(FakeEmbedder::new(4)));
        index.upsert(EntryDraft::new("some text", "manual")).await.unwrap();

        assert!(!index.clear(false).await);
        assert_eq!(index.stats().await.unwrap().total_count, 1);
        assert!(index.clear(true).await);
        assert_eq!(index.stats().await.unwrap().total_count, 0);
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index").join("embeddings.json");
        let embedder = Arc::new(FakeEmbedder::new(4));

        let index = FlatVectorIndex::open(&path, embedder.clone()).unwrap();
        index
            .upsert(EntryDraft::new("Reset the amplifier", "manual").with_category("troubleshooting"))
            .await
            .unwrap();
        index.close().await;

        let reopened = FlatVectorIndex::open(&path, embedder).unwrap();
        let stats = reopened.stats().await.unwrap();
        assert_eq!(stats.total_count, 1);
        assert_eq!(stats.model_name, "fake-embedding");

        let id = reopened.upsert(EntryDraft::new("Second", "manual")).await.unwrap();
        assert_eq!(id, 2);
    }

    #[tokio::test]
    async fn test_open_rejects_other_dimension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embeddings.json");

        let index = FlatVectorIndex::open(&path, Arc::new(FakeEmbedder::new(4))).unwrap();
        index.upsert(EntryDraft::new("text", "manual")).await.unwrap();
        index.save().unwrap();

        let result = FlatVectorIndex::open(&path, Arc::new(FakeEmbedder::new(8)));
        assert!(matches!(result, Err(Error::DimensionMismatch { expected: 8, actual: 4 })));
    }
}
