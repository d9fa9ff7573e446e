//! Cosine similarity scoring and candidate ranking.

/// A candidate with its similarity score.
#[derive(Debug, Clone)]
pub struct Scored<T> {
    pub item: T,
    pub score: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum SimilarityError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Cosine similarity between two vectors, in [-1, 1].
///
/// Returns exactly 0.0 when either vector has zero magnitude instead of
/// dividing by zero. Both slices must have the same length; mismatched
/// lengths are a caller error (`rank` enforces it on the public path).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "mismatched vector dimensions");

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a = l2_norm(a);
    let mag_b = l2_norm(b);

    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Score every candidate against the query and sort descending.
///
/// Ties keep input order (stable sort), so callers that pass candidates
/// in recency order get recency as the implicit tiebreak. Output length
/// equals input length.
pub fn rank<'a, T>(
    query: &[f32],
    candidates: impl IntoIterator<Item = (T, &'a [f32])>,
) -> Result<Vec<Scored<T>>, SimilarityError> {
    let mut scored = Vec::new();

    for (item, embedding) in candidates {
        if embedding.len() != query.len() {
            return Err(SimilarityError::DimensionMismatch {
                expected: query.len(),
                got: embedding.len(),
            });
        }

        scored.push(Scored {
            score: cosine_similarity(query, embedding),
            item,
        });
    }

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(scored)
}

/// Keep entries scoring strictly above `threshold`, capped at `cap`.
pub fn filter_by_threshold<T>(ranked: Vec<Scored<T>>, threshold: f32, cap: usize) -> Vec<Scored<T>> {
    let mut kept: Vec<Scored<T>> = ranked
        .into_iter()
        .filter(|entry| entry.score > threshold)
        .collect();
    kept.truncate(cap);
    kept
}
