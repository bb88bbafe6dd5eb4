//! Batched embedding with per-item failure

use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use ampdesk_core::{Embedder, check_dimension};

/// Upper bound on embedding requests in flight for one batch insert
const MAX_CONCURRENT_BATCHES: usize = 4;

/// Embed `texts` in requests of at most `batch_size` items.
///
/// Output order matches input order. A failed request turns every item of
/// that request into `None`, as does a request answered with the wrong
/// number of vectors. A single vector of the wrong dimension becomes `None`.
pub(crate) async fn embed_in_batches<E>(
    embedder: &E,
    texts: &[String],
    batch_size: usize,
) -> Vec<Option<Vec<f32>>>
where
    E: Embedder + ?Sized,
{
    let batch_size = batch_size.max(1);
    let total_batches = texts.len().div_ceil(batch_size);
    let dimension = embedder.dimension();

    // Owned chunks keep the stream future `Send` inside async-trait methods
    let chunks: Vec<(usize, Vec<String>)> = texts
        .chunks(batch_size)
        .map(<[String]>::to_vec)
        .enumerate()
        .collect();

    let batches: Vec<Vec<Option<Vec<f32>>>> = stream::iter(chunks)
        .map(|(i, chunk)| async move {
            info!("Creating embeddings for batch {}/{}", i + 1, total_batches);
            match embedder.embed_batch(&chunk).await {
                Ok(vectors) if vectors.len() != chunk.len() => {
                    error!(
                        "Batch {} returned {} embeddings for {} texts",
                        i + 1,
                        vectors.len(),
                        chunk.len()
                    );
                    vec![None; chunk.len()]
                }
                Ok(vectors) => vectors
                    .into_iter()
                    .map(|vector| match check_dimension(dimension, &vector) {
                        Ok(()) => Some(vector),
                        Err(e) => {
                            warn!("Discarding embedding in batch {}: {}", i + 1, e);
                            None
                        }
                    })
                    .collect(),
                Err(e) => {
                    error!("Error creating batch embeddings for batch {}: {}", i + 1, e);
                    vec![None; chunk.len()]
                }
            }
        })
        .buffered(MAX_CONCURRENT_BATCHES)
        .collect()
        .await;

    batches.into_iter().flatten().collect()
}
