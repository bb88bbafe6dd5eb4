//! SQLite-backed vector index.
//!
//! Entries and their embeddings live in one table; search loads the active
//! rows and scores them with the shared ranking rule. The embedding
//! dimension and model are pinned in a metadata table the first time the
//! database is opened.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use tracing::{debug, error, info, warn};

use ampdesk_core::{
    BatchOutcome, DEFAULT_EMBEDDING_BATCH_SIZE, Embedder, EntryDraft, EntryId, EntryUpdate,
    Error, IndexStats, KnowledgeEntry, Priority, Result, SearchQuery, SearchResult, VectorIndex,
    check_dimension, rank,
};

use crate::batching::embed_in_batches;

const ENTRY_COLUMNS: &str = "id, title, content, category, tags, source, priority, embedding, \
     metadata, is_active, created_at, updated_at";

fn store_err(e: sqlx::Error) -> Error {
    Error::VectorStore(e.to_string())
}

pub struct SqliteVectorIndex<E: Embedder> {
    pool: SqlitePool,
    embedder: Arc<E>,
    batch_size: usize,
}

impl<E: Embedder> SqliteVectorIndex<E> {
    /// Open (or create) a database file
    pub async fn connect(path: impl AsRef<Path>, embedder: Arc<E>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(store_err)?;

        info!("Connected to knowledge base at {}", path.display());
        Self::with_pool(pool, embedder).await
    }

    /// Private in-memory database, mostly for tests
    pub async fn in_memory(embedder: Arc<E>) -> Result<Self> {
        let options = SqliteConnectOptions::new().in_memory(true);

        // Every connection to :memory: is its own database, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(store_err)?;

        Self::with_pool(pool, embedder).await
    }

    async fn with_pool(pool: SqlitePool, embedder: Arc<E>) -> Result<Self> {
        let index = Self {
            pool,
            embedder,
            batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
        };
        index.init_schema().await?;
        index.check_meta().await?;
        Ok(index)
    }

    /// Set the number of texts per embedding request
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS knowledge_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT,
                content TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT 'general',
                tags TEXT NOT NULL DEFAULT '[]',
                source TEXT NOT NULL DEFAULT 'unknown',
                priority TEXT NOT NULL DEFAULT 'medium',
                embedding BLOB NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_knowledge_active_category
             ON knowledge_entries(is_active, category)",
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    /// Pin the embedding dimension on first use and refuse a different one later
    async fn check_meta(&self) -> Result<()> {
        let stored: Option<String> =
            sqlx::query_scalar("SELECT value FROM index_meta WHERE key = 'embedding_dimension'")
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;

        let expected = self.embedder.dimension();
        match stored {
            Some(value) => {
                let actual: usize = value.parse().map_err(|_| {
                    Error::VectorStore(format!("Corrupt embedding dimension in index_meta: {}", value))
                })?;
                if actual != expected {
                    return Err(Error::DimensionMismatch { expected, actual });
                }
            }
            None => {
                sqlx::query(
                    "INSERT OR REPLACE INTO index_meta (key, value)
                     VALUES ('embedding_dimension', ?1), ('embedding_model', ?2)",
                )
                .bind(expected.to_string())
                .bind(self.embedder.model_name())
                .execute(&self.pool)
                .await
                .map_err(store_err)?;
            }
        }
        Ok(())
    }

    async fn insert_entry<'c, X>(executor: X, draft: &EntryDraft, embedding: &[f32]) -> Result<EntryId>
    where
        X: sqlx::Executor<'c, Database = sqlx::Sqlite>,
    {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO knowledge_entries
                (title, content, category, tags, source, priority, embedding, metadata,
                 is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?9)",
        )
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(&draft.category)
        .bind(serde_json::to_string(&draft.tags)?)
        .bind(&draft.source)
        .bind(draft.priority.as_str())
        .bind(serialize_embedding(embedding))
        .bind(serde_json::to_string(&draft.metadata)?)
        .bind(&now)
        .execute(executor)
        .await
        .map_err(store_err)?;

        Ok(result.last_insert_rowid())
    }

    async fn fetch_entry(&self, id: EntryId) -> Result<Option<KnowledgeEntry>> {
        let sql = format!("SELECT {} FROM knowledge_entries WHERE id = ?1", ENTRY_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        row.as_ref().map(row_to_entry).transpose()
    }

    async fn write_entry(&self, entry: &KnowledgeEntry) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE knowledge_entries
             SET title = ?1, content = ?2, category = ?3, tags = ?4, priority = ?5,
                 embedding = ?6, metadata = ?7, updated_at = ?8
             WHERE id = ?9",
        )
        .bind(&entry.title)
        .bind(&entry.content)
        .bind(&entry.category)
        .bind(serde_json::to_string(&entry.tags)?)
        .bind(entry.priority.as_str())
        .bind(serialize_embedding(&entry.embedding))
        .bind(serde_json::to_string(&entry.metadata)?)
        .bind(entry.updated_at.to_rfc3339())
        .bind(entry.id)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn active_entries(&self, category: Option<&str>) -> Result<Vec<KnowledgeEntry>> {
        let rows = match category {
            Some(category) => {
                let sql = format!(
                    "SELECT {} FROM knowledge_entries WHERE is_active = 1 AND category = ?1 ORDER BY id",
                    ENTRY_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(category)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(store_err)?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM knowledge_entries WHERE is_active = 1 ORDER BY id",
                    ENTRY_COLUMNS
                );
                sqlx::query(&sql).fetch_all(&self.pool).await.map_err(store_err)?
            }
        };

        let dimension = self.embedder.dimension();
        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let entry = row_to_entry(row)?;
            if entry.embedding.len() != dimension {
                warn!(
                    "Skipping entry {} with embedding dimension {}",
                    entry.id,
                    entry.embedding.len()
                );
                continue;
            }
            entries.push(entry);
        }
        Ok(entries)
    }

    async fn insert_batch(&self, items: Vec<(EntryDraft, Vec<f32>)>) -> Result<usize> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        let mut inserted = 0;
        for (draft, embedding) in &items {
            match Self::insert_entry(&mut *tx, draft, embedding).await {
                Ok(_) => inserted += 1,
                Err(e) => error!("Error inserting entry: {}", e),
            }
        }
        tx.commit().await.map_err(store_err)?;
        Ok(inserted)
    }
}

fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::VectorStore(format!(
            "Embedding blob of {} bytes is not a whole number of f32 values",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::VectorStore(format!("Invalid timestamp {}: {}", value, e)))
}

fn row_to_entry(row: &SqliteRow) -> Result<KnowledgeEntry> {
    let tags: String = row.try_get("tags").map_err(store_err)?;
    let metadata: String = row.try_get("metadata").map_err(store_err)?;
    let priority: String = row.try_get("priority").map_err(store_err)?;
    let embedding: Vec<u8> = row.try_get("embedding").map_err(store_err)?;
    let created_at: String = row.try_get("created_at").map_err(store_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(store_err)?;
    let active: i64 = row.try_get("is_active").map_err(store_err)?;

    Ok(KnowledgeEntry {
        id: row.try_get("id").map_err(store_err)?,
        title: row.try_get("title").map_err(store_err)?,
        content: row.try_get("content").map_err(store_err)?,
        category: row.try_get("category").map_err(store_err)?,
        tags: serde_json::from_str::<BTreeSet<String>>(&tags)?,
        source: row.try_get("source").map_err(store_err)?,
        priority: Priority::from_str(&priority).unwrap_or_default(),
        embedding: deserialize_embedding(&embedding)?,
        metadata: serde_json::from_str(&metadata)?,
        active: active != 0,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

#[async_trait]
impl<E: Embedder + 'static> VectorIndex for SqliteVectorIndex<E> {
    async fn upsert(&self, draft: EntryDraft) -> Result<EntryId> {
        let embedding = self.embedder.embed(&draft.content).await.map_err(|e| {
            error!("Failed to create embedding: {}", e);
            match e {
                Error::Embedding(_) => e,
                other => Error::Embedding(other.to_string()),
            }
        })?;
        check_dimension(self.dimension(), &embedding)?;

        let id = Self::insert_entry(&self.pool, &draft, &embedding).await?;
        info!("Added knowledge entry {}", id);
        Ok(id)
    }

    async fn upsert_batch(&self, drafts: Vec<EntryDraft>) -> BatchOutcome {
        let attempted = drafts.len();
        info!("Adding {} entries to knowledge base", attempted);

        let texts: Vec<String> = drafts.iter().map(|d| d.content.clone()).collect();
        let embeddings = embed_in_batches(self.embedder.as_ref(), &texts, self.batch_size).await;

        let mut pairs = drafts.into_iter().zip(embeddings).enumerate().peekable();
        let mut succeeded = 0;
        let mut batch_number = 0;

        // One transaction per embedding batch
        while pairs.peek().is_some() {
            batch_number += 1;
            let batch: Vec<(EntryDraft, Vec<f32>)> = pairs
                .by_ref()
                .take(self.batch_size)
                .filter_map(|(i, (draft, embedding))| match embedding {
                    Some(embedding) => Some((draft, embedding)),
                    None => {
                        warn!("Skipping entry {} due to embedding failure", i + 1);
                        None
                    }
                })
                .collect();
            if batch.is_empty() {
                continue;
            }

            match self.insert_batch(batch).await {
                Ok(inserted) => succeeded += inserted,
                Err(e) => error!("Error committing batch {}: {}", batch_number, e),
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

        let entries = match self.active_entries(query.category.as_deref()).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Error searching knowledge base: {}", e);
                return Vec::new();
            }
        };
        debug!("Scoring {} active entries", entries.len());

        let results = rank(&query_embedding, &entries, query.top_k, query.threshold);
        info!("Found {} relevant entries for query", results.len());
        results
    }

    async fn get(&self, id: EntryId) -> Option<KnowledgeEntry> {
        match self.fetch_entry(id).await {
            Ok(entry) => entry,
            Err(e) => {
                error!("Error getting entry {}: {}", id, e);
                None
            }
        }
    }

    async fn update(&self, id: EntryId, update: EntryUpdate) -> bool {
        if update.is_empty() {
            warn!("No fields to update for entry {}", id);
            return false;
        }

        let Some(mut entry) = self.get(id).await else {
            return false;
        };

        if let Some(content) = &update.content {
            let embedding = match self.embedder.embed(content).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    error!("Failed to create embedding for updated content: {}", e);
                    return false;
                }
            };
            if let Err(e) = check_dimension(self.dimension(), &embedding) {
                error!("Updated content embedding rejected: {}", e);
                return false;
            }
            entry.content = content.clone();
            entry.embedding = embedding;
        }
        update.apply_fields(&mut entry);

        match self.write_entry(&entry).await {
            Ok(found) => {
                if found {
                    info!("Updated knowledge entry {}", id);
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
        let result = if soft {
            sqlx::query("UPDATE knowledge_entries SET is_active = 0, updated_at = ?1 WHERE id = ?2")
                .bind(Utc::now().to_rfc3339())
                .bind(id)
                .execute(&self.pool)
                .await
        } else {
            sqlx::query("DELETE FROM knowledge_entries WHERE id = ?1")
                .bind(id)
                .execute(&self.pool)
                .await
        };

        match result {
            Ok(result) => {
                let found = result.rows_affected() > 0;
                if found {
                    info!("{} deleted knowledge entry {}", if soft { "Soft" } else { "Hard" }, id);
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

        match sqlx::query("DELETE FROM knowledge_entries").execute(&self.pool).await {
            Ok(_) => {
                warn!("Cleared all entries from knowledge base");
                true
            }
            Err(e) => {
                error!("Error clearing knowledge base: {}", e);
                false
            }
        }
    }

    async fn stats(&self) -> Result<IndexStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total,
                    COALESCE(SUM(is_active), 0) AS active,
                    COUNT(DISTINCT category) AS categories,
                    COUNT(DISTINCT source) AS sources
             FROM knowledge_entries",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;

        let total: i64 = row.try_get("total").map_err(store_err)?;
        let active: i64 = row.try_get("active").map_err(store_err)?;
        let categories: i64 = row.try_get("categories").map_err(store_err)?;
        let sources: i64 = row.try_get("sources").map_err(store_err)?;

        Ok(IndexStats {
            total_count: total as usize,
            active_count: active as usize,
            category_count: categories as usize,
            source_count: sources as usize,
            dimension: self.embedder.dimension(),
            model_name: self.embedder.model_name().to_string(),
        })
    }

    fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed knowledge base connection pool");
    }
}
