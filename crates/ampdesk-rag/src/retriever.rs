//! Context retrieval: search the index and shape the results for a prompt

use std::sync::Arc;
use tracing::info;

use ampdesk_core::{Citation, SearchQuery, SearchResult, VectorIndex};

/// Context handed to the model when the knowledge base has nothing relevant
pub const NO_CONTEXT: &str = "No relevant information found in the knowledge base.";

/// Prompt-ready context block plus one citation per labeled source
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedContext {
    pub context: String,
    pub citations: Vec<Citation>,
}

impl RetrievedContext {
    fn empty() -> Self {
        Self {
            context: NO_CONTEXT.to_string(),
            citations: Vec::new(),
        }
    }

    /// Whether any passage backs the context
    pub fn is_grounded(&self) -> bool {
        !self.citations.is_empty()
    }
}

/// Wraps a vector index and formats what it finds
pub struct ContextRetriever<V: VectorIndex + ?Sized> {
    index: Arc<V>,
    threshold: f32,
}

impl<V: VectorIndex + ?Sized> ContextRetriever<V> {
    pub fn new(index: Arc<V>, threshold: f32) -> Self {
        Self { index, threshold }
    }

    pub fn index(&self) -> &Arc<V> {
        &self.index
    }

    /// Search for `query` and build the context block and citations.
    ///
    /// Citation `i` always matches the `[Source i: ...]` block in the context.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> RetrievedContext {
        let search = SearchQuery::new(query)
            .with_top_k(top_k)
            .with_threshold(self.threshold);
        let results = self.index.search(&search).await;

        if results.is_empty() {
            info!("No relevant sources retrieved");
            return RetrievedContext::empty();
        }

        let citations: Vec<Citation> = results.iter().map(Citation::from_result).collect();
        let context = format_context(&results);
        info!("Retrieved {} relevant sources", citations.len());

        RetrievedContext { context, citations }
    }
}

/// Label each passage with its rank and source, in rank order
pub fn format_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| format!("[Source {}: {}]\n{}\n", i + 1, result.entry.source, result.entry.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlatVectorIndex;
    use crate::testing::FakeEmbedder;
    use ampdesk_core::EntryDraft;

    fn embedder() -> FakeEmbedder {
        FakeEmbedder::new(2)
            .with_vector("How do I bridge the amp", vec![1.0, 0.0])
            .with_vector("Bridge mode needs a 4 ohm load.", vec![0.9, 0.435_889_9])
            .with_vector("Set the zone name in the app.", vec![0.5, 0.866_025_4])
            .with_vector("Unrelated", vec![0.0, 1.0])
    }

    #[tokio::test]
    async fn test_context_blocks_follow_rank() {
        let index = Arc::new(FlatVectorIndex::new(Arc::new(embedder())));
        index
            .upsert(EntryDraft::new("Set the zone name in the app.", "app-guide.pdf"))
            .await
            .unwrap();
        index
            .upsert(EntryDraft::new("Bridge mode needs a 4 ohm load.", "manual.pdf"))
            .await
            .unwrap();

        let retriever = ContextRetriever::new(index, 0.2);
        let retrieved = retriever.retrieve("How do I bridge the amp", 5).await;

        assert_eq!(
            retrieved.context,
            "[Source 1: manual.pdf]\nBridge mode needs a 4 ohm load.\n\n\
             [Source 2: app-guide.pdf]\nSet the zone name in the app.\n"
        );
        let sources: Vec<&str> = retrieved.citations.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["manual.pdf", "app-guide.pdf"]);
        assert_eq!(retrieved.citations[0].similarity, 0.9);
        assert!(retrieved.is_grounded());
    }

    #[tokio::test]
    async fn test_empty_results_use_sentinel() {
        let index = Arc::new(FlatVectorIndex::new(Arc::new(embedder())));
        index.upsert(EntryDraft::new("Unrelated", "manual.pdf")).await.unwrap();

        let retriever = ContextRetriever::new(index, 0.2);
        let retrieved = retriever.retrieve("How do I bridge the amp", 5).await;

        assert_eq!(retrieved.context, NO_CONTEXT);
        assert!(retrieved.citations.is_empty());
        assert!(!retrieved.is_grounded());
    }

    #[tokio::test]
    async fn test_long_content_is_truncated_in_citation() {
        let long = "a".repeat(400);
        let index = Arc::new(FlatVectorIndex::new(Arc::new(FakeEmbedder::new(4))));
        index.upsert(EntryDraft::new(long.clone(), "manual.pdf")).await.unwrap();

        let retriever = ContextRetriever::new(index, 0.0);
        let retrieved = retriever.retrieve(&long, 1).await;

        assert_eq!(retrieved.citations[0].content_excerpt.chars().count(), 303);
        assert!(retrieved.citations[0].content_excerpt.ends_with("..."));
        assert!(retrieved.context.contains(&long));
    }
}
