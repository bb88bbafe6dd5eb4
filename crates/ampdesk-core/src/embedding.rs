//! Embedding provider trait

use async_trait::async_trait;

use crate::Result;

/// Trait for text embedding models
///
/// Every vector returned by one embedder has the same length,
/// [`Embedder::dimension`].
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts in one upstream request, preserving order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Length of every produced vector
    fn dimension(&self) -> usize;

    /// Name of the embedding model
    fn model_name(&self) -> &str;
}
