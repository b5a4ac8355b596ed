//! Concurrent ranking of scored candidates.
//!
//! ```text
//!            ┌─ score(c1) ─┐
//! dispatch ──┼─ score(c2) ─┼──► channel ──► COLLECT (single owner) ──► sort, top-k
//!            └─ score(cN) ─┘
//! ```
//!
//! One rayon task per candidate. Every task sends its outcome into one
//! bounded channel drained by a single collector thread, which is the only
//! writer of the result vector. The caller waits for all dispatched tasks to
//! be collected before the deterministic sort.

use std::cmp::Ordering;
use std::thread;

use crossbeam_channel::bounded;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tokio_util::sync::CancellationToken;

use super::scorer::cosine_similarity;
use super::{ScoringError, SimilarityError, SimilarityResult};
use crate::types::{ScoredCandidate, SparseVector};

/// Counters for one ranking run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankStats {
    /// Scoring tasks spawned.
    pub dispatched: usize,
    /// Tasks that produced a similarity.
    pub scored: usize,
    /// Tasks dropped because the candidate could not be scored.
    pub failed: usize,
}

/// Result of `RankingEngine::rank`.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    pub results: Vec<ScoredCandidate>,
    pub stats: RankStats,
}

/// Descending similarity, ties by ascending id.
pub fn rank_order(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.similarity
        .total_cmp(&a.similarity)
        .then_with(|| a.id.cmp(&b.id))
}

/// Scores candidates on a dedicated thread pool.
pub struct RankingEngine {
    pool: ThreadPool,
    channel_capacity: usize,
}

impl RankingEngine {
    /// Create an engine with `threads` scoring workers (at least one) and a
    /// collector channel holding up to `channel_capacity` pending results.
    pub fn new(threads: usize, channel_capacity: usize) -> SimilarityResult<Self> {
        let threads = threads.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("docsim-score-{i}"))
            .build()
            .map_err(|e| SimilarityError::Worker(format!("failed to build scoring pool: {e}")))?;

        crate::debug_event!("ranking", "pool ready", "{threads} threads");

        Ok(Self {
            pool,
            channel_capacity: channel_capacity.max(1),
        })
    }

    /// Top `k` candidates by cosine similarity to `query`.
    ///
    /// Candidates sharing the query's id are skipped. Candidates that fail to
    /// score are logged and dropped. If `cancel` fires before or during
    /// dispatch, no further tasks are spawned and `Cancelled` is returned
    /// once the in-flight tasks have drained.
    pub fn rank(
        &self,
        query: &SparseVector,
        candidates: &[SparseVector],
        k: usize,
        cancel: &CancellationToken,
    ) -> SimilarityResult<Ranking> {
        if cancel.is_cancelled() {
            return Err(SimilarityError::Cancelled);
        }

        let (tx, rx) = bounded::<Result<ScoredCandidate, ScoringError>>(self.channel_capacity);

        let (mut results, dispatched, failed) = thread::scope(|s| {
            let collector = s.spawn(move || {
                let mut scored = Vec::new();
                let mut failed = 0;
                for outcome in rx {
                    match outcome {
                        Ok(candidate) => scored.push(candidate),
                        Err(e) => {
                            failed += 1;
                            tracing::warn!("[ranking] dropped candidate: {e}");
                        }
                    }
                }
                (scored, failed)
            });

            let mut dispatched = 0;
            self.pool.scope(|scope| {
                for candidate in candidates {
                    if cancel.is_cancelled() {
                        break;
                    }
                    if candidate.id == query.id {
                        continue;
                    }
                    dispatched += 1;
                    let tx = tx.clone();
                    scope.spawn(move |_| {
                        let outcome = cosine_similarity(query, candidate)
                            .map(|similarity| ScoredCandidate::from_vector(candidate, similarity));
                        // Send only fails if the collector is gone
                        let _ = tx.send(outcome);
                    });
                }
            });
            drop(tx);

            let (scored, failed) = collector
                .join()
                .map_err(|_| SimilarityError::Worker("collector thread panicked".to_string()))?;

            Ok::<_, SimilarityError>((scored, dispatched, failed))
        })?;

        if cancel.is_cancelled() {
            crate::debug_event!(
                "ranking",
                "cancelled",
                "discarding {} collected results",
                results.len()
            );
            return Err(SimilarityError::Cancelled);
        }

        let stats = RankStats {
            dispatched,
            scored: results.len(),
            failed,
        };
        results.sort_unstable_by(rank_order);
        results.truncate(k);

        crate::debug_event!(
            "ranking",
            "ranked",
            "dispatched {}, scored {}, failed {}, returning {}",
            stats.dispatched,
            stats.scored,
            stats.failed,
            results.len()
        );

        Ok(Ranking { results, stats })
    }
}
