//! Cosine similarity between sparse term-frequency vectors.

use super::ScoringError;
use crate::types::SparseVector;

/// Sparse dot product over the union of both term maps.
///
/// Terms missing from either side contribute zero, so it is enough to walk
/// the smaller map and probe the larger one.
pub fn dot_product(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.terms.len() <= b.terms.len() {
        (a, b)
    } else {
        (b, a)
    };
    small
        .terms
        .iter()
        .filter_map(|(term, &freq)| {
            large
                .terms
                .get(term)
                .map(|&other| f64::from(freq) * f64::from(other))
        })
        .sum()
}

/// Cosine similarity of `candidate` against `query` using the store-supplied
/// norms of both full vectors.
pub fn cosine_similarity(query: &SparseVector, candidate: &SparseVector) -> Result<f64, ScoringError> {
    for v in [query, candidate] {
        if !v.has_usable_norm() {
            return Err(ScoringError::DegenerateNorm {
                id: v.id,
                norm: v.norm,
            });
        }
    }
    Ok(dot_product(query, candidate) / (query.norm * candidate.norm))
}
