//! Request-scoped similarity search over injected repositories.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::candidates::CandidateGenerator;
use super::ranking::RankingEngine;
use super::{SimilarityError, SimilarityResult};
use crate::config::SimilarityConfig;
use crate::storage::{PostingRepository, VectorRepository};
use crate::types::{DocId, ScoredCandidate, TokenHit};

/// Finds documents similar to a stored document.
///
/// Repositories are supplied by the caller, so the same service runs against
/// the in-memory store, a remote store, or test fakes.
#[derive(Clone)]
pub struct SimilarityService {
    vectors: Arc<dyn VectorRepository>,
    postings: Arc<dyn PostingRepository>,
    generator: CandidateGenerator,
    engine: Arc<RankingEngine>,
}

impl SimilarityService {
    pub fn new(
        vectors: Arc<dyn VectorRepository>,
        postings: Arc<dyn PostingRepository>,
        engine: Arc<RankingEngine>,
    ) -> Self {
        let generator = CandidateGenerator::new(Arc::clone(&postings));
        Self {
            vectors,
            postings,
            generator,
            engine,
        }
    }

    /// Build the service and its scoring pool from configuration.
    pub fn with_config(
        vectors: Arc<dyn VectorRepository>,
        postings: Arc<dyn PostingRepository>,
        config: &SimilarityConfig,
    ) -> SimilarityResult<Self> {
        let engine = RankingEngine::new(config.scoring_threads, config.channel_capacity)?;
        Ok(Self::new(vectors, postings, Arc::new(engine)))
    }

    /// The `limit` most similar documents to `id`, best first.
    ///
    /// Returns `NotFound` when the store has no vector for `id`. A query that
    /// cannot seed any candidates (zero norm, fewer than ten distinct terms)
    /// yields an empty list.
    pub async fn find_similar(
        &self,
        id: DocId,
        limit: usize,
        cancel: CancellationToken,
    ) -> SimilarityResult<Vec<ScoredCandidate>> {
        if cancel.is_cancelled() {
            return Err(SimilarityError::Cancelled);
        }

        let query = self
            .vectors
            .fetch(&[id])
            .await
            .map_err(SimilarityError::repository("fetching query vector"))?
            .into_iter()
            .find(|v| v.id == id)
            .ok_or(SimilarityError::NotFound(id))?;

        if !query.has_usable_norm() {
            crate::debug_event!("similar", "degenerate", "document {id} has norm {}", query.norm);
            return Ok(Vec::new());
        }

        let mut candidate_ids = self.generator.generate(&query).await?;
        candidate_ids.remove(&id);
        if candidate_ids.is_empty() {
            crate::debug_event!("similar", "no candidates", "document {id}");
            return Ok(Vec::new());
        }

        let mut ids: Vec<DocId> = candidate_ids.into_iter().collect();
        ids.sort_unstable();
        let candidates = self
            .vectors
            .fetch(&ids)
            .await
            .map_err(SimilarityError::repository("fetching candidate vectors"))?;

        if cancel.is_cancelled() {
            return Err(SimilarityError::Cancelled);
        }

        let engine = Arc::clone(&self.engine);
        let ranking = tokio::task::spawn_blocking(move || {
            engine.rank(&query, &candidates, limit, &cancel)
        })
        .await
        .map_err(|e| SimilarityError::Worker(e.to_string()))??;

        crate::log_event!(
            "similar",
            "ranked",
            "document {id}: {} candidates, {} failed, {} returned",
            ranking.stats.dispatched,
            ranking.stats.failed,
            ranking.results.len()
        );
        Ok(ranking.results)
    }

    /// Postings for every term starting with `search`, joined with document
    /// titles and urls, highest frequency first.
    ///
    /// Matching ignores case. The prefix is taken verbatim: any space in it,
    /// leading or trailing included, makes it more than one word.
    pub async fn search_tokens(&self, search: &str) -> SimilarityResult<Vec<TokenHit>> {
        let prefix = search.to_lowercase();
        if prefix.is_empty() {
            return Err(SimilarityError::InvalidInput(
                "a nonempty string must be submitted for search".to_string(),
            ));
        }
        if prefix.contains(' ') {
            return Err(SimilarityError::InvalidInput(
                "only a single word may be submitted for search".to_string(),
            ));
        }

        let postings = self
            .postings
            .postings_with_prefix(&prefix)
            .await
            .map_err(SimilarityError::repository("looking up postings by prefix"))?;
        if postings.is_empty() {
            return Ok(Vec::new());
        }

        let mut doc_ids: Vec<DocId> = postings.iter().map(|p| p.doc_id).collect();
        doc_ids.sort_unstable();
        doc_ids.dedup();
        let documents: std::collections::HashMap<DocId, _> = self
            .vectors
            .fetch(&doc_ids)
            .await
            .map_err(SimilarityError::repository("fetching token documents"))?
            .into_iter()
            .map(|v| (v.id, v))
            .collect();

        let mut hits: Vec<TokenHit> = postings
            .into_iter()
            .map(|p| {
                let doc = documents.get(&p.doc_id);
                TokenHit {
                    title: doc.map(|d| d.title.clone()),
                    url: doc.map(|d| d.url.clone()),
                    term: p.term,
                    doc_id: p.doc_id,
                    frequency: p.frequency,
                }
            })
            .collect();
        hits.sort_by(|a, b| {
            b.frequency
                .cmp(&a.frequency)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
                .then_with(|| a.term.cmp(&b.term))
        });

        crate::debug_event!("tokens", "matched", "'{prefix}': {} postings", hits.len());
        Ok(hits)
    }
}
