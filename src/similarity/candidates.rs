//! Candidate generation from a document's rarest terms.
//!
//! The bottom decile of a document's distinct terms, ordered by ascending
//! frequency, seeds a posting lookup. Scoring is then bounded to documents
//! sharing at least one of those terms instead of the whole corpus.

use std::collections::HashSet;
use std::sync::Arc;

use super::{SimilarityError, SimilarityResult};
use crate::storage::PostingRepository;
use crate::types::{DocId, SparseVector, TermId};

/// Seed count is `distinct_terms / SEED_DIVISOR`, rounded down.
pub const SEED_DIVISOR: usize = 10;

/// Pick the seed terms of `query`: ascending by frequency, ties by term,
/// first `floor(n / 10)` of them. Empty when the query has fewer than ten
/// distinct terms.
pub fn select_seed_terms(query: &SparseVector) -> Vec<TermId> {
    let seed_count = query.distinct_terms() / SEED_DIVISOR;
    if seed_count == 0 {
        return Vec::new();
    }

    let mut by_frequency: Vec<(&TermId, u32)> =
        query.terms.iter().map(|(term, &freq)| (term, freq)).collect();
    by_frequency.sort_unstable_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));

    by_frequency
        .into_iter()
        .take(seed_count)
        .map(|(term, _)| term.clone())
        .collect()
}

/// Builds candidate id sets through a posting repository.
#[derive(Clone)]
pub struct CandidateGenerator {
    postings: Arc<dyn PostingRepository>,
}

impl CandidateGenerator {
    pub fn new(postings: Arc<dyn PostingRepository>) -> Self {
        Self { postings }
    }

    /// Ids of documents referencing any seed term of `query`.
    ///
    /// The query's own id is left in; the ranking step excludes it.
    pub async fn generate(&self, query: &SparseVector) -> SimilarityResult<HashSet<DocId>> {
        let seeds = select_seed_terms(query);
        if seeds.is_empty() {
            crate::debug_event!(
                "candidates",
                "no seeds",
                "document {} has {} distinct terms",
                query.id,
                query.distinct_terms()
            );
            return Ok(HashSet::new());
        }

        let candidates = self
            .postings
            .docs_referencing(&seeds)
            .await
            .map_err(SimilarityError::repository("looking up postings for seed terms"))?;

        crate::debug_event!(
            "candidates",
            "generated",
            "{} seeds -> {} documents",
            seeds.len(),
            candidates.len()
        );
        Ok(candidates)
    }
}
