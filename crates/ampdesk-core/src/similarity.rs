//! Cosine similarity and the ranking rule shared by every index backend

use crate::vector_store::{KnowledgeEntry, SearchResult};

/// Cosine similarity between two vectors of equal length.
///
/// Returns 0.0 when either vector has zero magnitude. The result is clamped
/// to [-1, 1] to absorb floating point drift.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "embedding dimensions must match");
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

/// Score candidates and keep the best `top_k` at or above `threshold`.
///
/// Candidates must arrive in insertion order: the sort is stable, so equal
/// scores keep that order. Only the retained entries are cloned.
pub fn rank<'a, I>(query_embedding: &[f32], candidates: I, top_k: usize, threshold: f32) -> Vec<SearchResult>
where
    I: IntoIterator<Item = &'a KnowledgeEntry>,
{
    let mut scored: Vec<(&KnowledgeEntry, f32)> = candidates
        .into_iter()
        .map(|entry| (entry, cosine_similarity(query_embedding, &entry.embedding)))
        .filter(|(_, similarity)| *similarity >= threshold)
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(entry, similarity)| SearchResult {
            entry: entry.clone(),
            similarity,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::EntryDraft;

    fn entry(id: i64, embedding: Vec<f32>) -> KnowledgeEntry {
        EntryDraft::new(format!("entry {}", id), "test").into_entry(id, embedding)
    }

    #[test]
    fn test_cosine_similarity() {
        let vec1 = vec![1.0, 0.0, 0.0];
        let vec2 = vec![1.0, 0.0, 0.0];
        let vec3 = vec![0.0, 1.0, 0.0];
        let vec4 = vec![-1.0, 0.0, 0.0];

        assert!((cosine_similarity(&vec1, &vec2) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&vec1, &vec3).abs() < 1e-6);
        assert!((cosine_similarity(&vec1, &vec4) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_bounds() {
        let vectors = [
            vec![0.3, -2.5, 7.1, 0.0],
            vec![1e-3, 1e-3, 1e-3, 1e-3],
            vec![-9.0, 4.0, -0.5, 2.2],
            vec![1e6, -1e6, 3e5, 0.1],
        ];
        for a in &vectors {
            assert!((cosine_similarity(a, a) - 1.0).abs() < 1e-5);
            for b in &vectors {
                let s = cosine_similarity(a, b);
                assert!((-1.0..=1.0).contains(&s), "{} out of range", s);
            }
        }
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_filters_sorts_and_caps() {
        let query = vec![1.0, 0.0];
        let candidates = vec![
            entry(1, vec![0.1, 0.995]),
            entry(2, vec![0.9, 0.436]),
            entry(3, vec![0.5, 0.866]),
            entry(4, vec![1.0, 0.0]),
        ];

        let results = rank(&query, &candidates, 2, 0.2);
        let ids: Vec<i64> = results.iter().map(|r| r.entry.id).collect();
        assert_eq!(ids, vec![4, 2]);
        assert!(results[0].similarity >= results[1].similarity);
    }

    #[test]
    fn test_rank_ties_keep_insertion_order() {
        let query = vec![1.0, 0.0];
        let candidates = vec![
            entry(10, vec![0.5, 0.5]),
            entry(11, vec![1.0, 0.0]),
            entry(12, vec![0.5, 0.5]),
            entry(13, vec![0.5, 0.5]),
        ];

        let ids: Vec<i64> = rank(&query, &candidates, 10, 0.0)
            .iter()
            .map(|r| r.entry.id)
            .collect();
        assert_eq!(ids, vec![11, 10, 12, 13]);
    }
}
