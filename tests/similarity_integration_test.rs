//! End-to-end similarity search over in-memory fakes.
//!
//! Exercises candidate generation, concurrent ranking and the error surface
//! of `SimilarityService` without any real store.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use docsim::similarity::{RankingEngine, SimilarityError, SimilarityService};
use docsim::storage::{MemoryStore, PostingRepository, StorageError, StorageResult, VectorRepository};
use docsim::types::{DocId, Posting, SparseVector, TermId};

fn doc(id: u64, counts: &[(&str, u32)]) -> SparseVector {
    SparseVector::from_counts(DocId::new(id), counts.iter().copied())
        .with_meta(format!("Book {id}"), format!("http://wikibooks/{id}"))
}

/// Query document with twenty distinct terms; `rare_a` and `rare_b` are the
/// two lowest-frequency terms and therefore the seeds.
fn query_doc() -> SparseVector {
    let mut counts: Vec<(String, u32)> = (0..18).map(|i| (format!("common{i:02}"), 5 + i)).collect();
    counts.push(("rare_a".to_string(), 1));
    counts.push(("rare_b".to_string(), 2));
    SparseVector::from_counts(DocId::new(1), counts).with_meta("Query", "http://wikibooks/1")
}

fn corpus() -> Vec<SparseVector> {
    vec![
        query_doc(),
        // near duplicate of the query
        doc(2, &[("rare_a", 1), ("rare_b", 2), ("common00", 5), ("common01", 6)]),
        // shares one seed only
        doc(3, &[("rare_b", 9), ("other", 9)]),
        // shares a frequent term but no seed: never a candidate
        doc(4, &[("common17", 22)]),
        // candidate with a zero norm, dropped at scoring time
        SparseVector::new(
            DocId::new(5),
            [(TermId::from("rare_a"), 1)].into_iter().collect(),
            0.0,
            "Broken",
            "http://wikibooks/5",
        ),
    ]
}

fn service_over(store: MemoryStore) -> SimilarityService {
    let store = Arc::new(store);
    let engine = Arc::new(RankingEngine::new(4, 16).unwrap());
    SimilarityService::new(store.clone(), store, engine)
}

#[tokio::test]
async fn test_find_similar_ranks_candidates() {
    let service = service_over(MemoryStore::from_vectors(corpus()).unwrap());

    let results = service
        .find_similar(DocId::new(1), 25, CancellationToken::new())
        .await
        .unwrap();

    let ids: Vec<u64> = results.iter().map(|r| r.id.value()).collect();
    assert_eq!(ids, vec![2, 3], "query, non-candidate and zero-norm docs excluded");
    assert!(results[0].similarity > results[1].similarity);
    assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.similarity)));
    assert_eq!(results[0].title, "Book 2");
    assert_eq!(results[0].url, "http://wikibooks/2");
}

#[tokio::test]
async fn test_find_similar_respects_limit_and_is_repeatable() {
    let service = service_over(MemoryStore::from_vectors(corpus()).unwrap());

    let top_one = service
        .find_similar(DocId::new(1), 1, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(top_one.len(), 1);
    assert_eq!(top_one[0].id, DocId::new(2));

    let first = service
        .find_similar(DocId::new(1), 25, CancellationToken::new())
        .await
        .unwrap();
    for _ in 0..5 {
        let again = service
            .find_similar(DocId::new(1), 25, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(again, first);
    }
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let service = service_over(MemoryStore::from_vectors(corpus()).unwrap());
    let err = service
        .find_similar(DocId::new(404), 25, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SimilarityError::NotFound(id) if id == DocId::new(404)));
}

#[tokio::test]
async fn test_degenerate_queries_return_empty() {
    let small = doc(10, &[("t1", 1), ("t2", 5), ("t3", 1)]);
    let neighbour = doc(11, &[("t1", 1), ("t2", 5), ("t3", 1)]);
    let zero = SparseVector::new(
        DocId::new(12),
        Default::default(),
        0.0,
        "Empty",
        "http://wikibooks/12",
    );
    let service = service_over(MemoryStore::from_vectors([small, neighbour, zero]).unwrap());

    // Three distinct terms: no seeds, no candidates, no error
    let results = service
        .find_similar(DocId::new(10), 25, CancellationToken::new())
        .await
        .unwrap();
    assert!(results.is_empty());

    let results = service
        .find_similar(DocId::new(12), 25, CancellationToken::new())
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_cancelled_request_is_rejected() {
    let service = service_over(MemoryStore::from_vectors(corpus()).unwrap());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = service
        .find_similar(DocId::new(1), 25, cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SimilarityError::Cancelled));
}

// ============================================================================
// Fakes
// ============================================================================

/// Posting repository that counts calls and delegates to a store.
struct CountingPostings {
    inner: MemoryStore,
    calls: AtomicUsize,
}

#[async_trait]
impl PostingRepository for CountingPostings {
    async fn docs_referencing(&self, terms: &[TermId]) -> StorageResult<HashSet<DocId>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.docs_referencing(terms).await
    }

    async fn postings_with_prefix(&self, prefix: &str) -> StorageResult<Vec<Posting>> {
        self.inner.postings_with_prefix(prefix).await
    }
}

struct UnavailablePostings;

#[async_trait]
impl PostingRepository for UnavailablePostings {
    async fn docs_referencing(&self, _terms: &[TermId]) -> StorageResult<HashSet<DocId>> {
        Err(StorageError::Unavailable("connection refused".to_string()))
    }

    async fn postings_with_prefix(&self, _prefix: &str) -> StorageResult<Vec<Posting>> {
        Err(StorageError::Unavailable("connection refused".to_string()))
    }
}

struct UnavailableVectors;

#[async_trait]
impl VectorRepository for UnavailableVectors {
    async fn fetch(&self, _ids: &[DocId]) -> StorageResult<Vec<SparseVector>> {
        Err(StorageError::Backend {
            operation: "find".to_string(),
            cause: "timeout".to_string(),
        })
    }
}

/// Vector repository that fires a cancellation token while serving the
/// candidate fetch, as a request timeout would.
struct CancellingVectors {
    inner: MemoryStore,
    cancel: CancellationToken,
    calls: AtomicUsize,
}

#[async_trait]
impl VectorRepository for CancellingVectors {
    async fn fetch(&self, ids: &[DocId]) -> StorageResult<Vec<SparseVector>> {
        // First call is the query itself, the second the candidates
        if self.calls.fetch_add(1, Ordering::SeqCst) == 1 {
            self.cancel.cancel();
        }
        self.inner.fetch(ids).await
    }
}

#[tokio::test]
async fn test_cancel_mid_request_discards_results() {
    let cancel = CancellationToken::new();
    let vectors = Arc::new(CancellingVectors {
        inner: MemoryStore::from_vectors(corpus()).unwrap(),
        cancel: cancel.clone(),
        calls: AtomicUsize::new(0),
    });
    let postings = Arc::new(MemoryStore::from_vectors(corpus()).unwrap());
    let engine = Arc::new(RankingEngine::new(2, 4).unwrap());
    let service = SimilarityService::new(vectors.clone(), postings, engine);

    let err = service
        .find_similar(DocId::new(1), 25, cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SimilarityError::Cancelled));
    assert_eq!(vectors.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_small_query_never_touches_postings() {
    let small = doc(10, &[("t1", 1), ("t2", 5), ("t3", 1)]);
    let vectors = Arc::new(MemoryStore::from_vectors([small.clone()]).unwrap());
    let postings = Arc::new(CountingPostings {
        inner: MemoryStore::from_vectors([small]).unwrap(),
        calls: AtomicUsize::new(0),
    });
    let engine = Arc::new(RankingEngine::new(2, 4).unwrap());
    let service = SimilarityService::new(vectors, postings.clone(), engine);

    let results = service
        .find_similar(DocId::new(10), 25, CancellationToken::new())
        .await
        .unwrap();
    assert!(results.is_empty());
    assert_eq!(postings.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_repository_failures_carry_operation() {
    let store = Arc::new(MemoryStore::from_vectors(corpus()).unwrap());
    let engine = Arc::new(RankingEngine::new(2, 4).unwrap());

    let service = SimilarityService::new(store.clone(), Arc::new(UnavailablePostings), engine.clone());
    let err = service
        .find_similar(DocId::new(1), 25, CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        SimilarityError::Repository { operation, source } => {
            assert_eq!(operation, "looking up postings for seed terms");
            assert!(matches!(source, StorageError::Unavailable(_)));
        }
        other => panic!("expected repository error, got {other:?}"),
    }

    let service = SimilarityService::new(Arc::new(UnavailableVectors), store, engine);
    let err = service
        .find_similar(DocId::new(1), 25, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("fetching query vector"));
}

// ============================================================================
// Token lookup
// ============================================================================

#[tokio::test]
async fn test_search_tokens_orders_by_frequency() {
    let service = service_over(MemoryStore::from_vectors(corpus()).unwrap());

    let hits = service.search_tokens("RARE").await.unwrap();
    let flat: Vec<(&str, u64, u32)> = hits
        .iter()
        .map(|h| (&*h.term, h.doc_id.value(), h.frequency))
        .collect();
    assert_eq!(
        flat,
        vec![
            ("rare_b", 3, 9),
            ("rare_b", 1, 2),
            ("rare_b", 2, 2),
            ("rare_a", 1, 1),
            ("rare_a", 2, 1),
            ("rare_a", 5, 1),
        ]
    );
    assert_eq!(hits[0].title.as_deref(), Some("Book 3"));
}

#[tokio::test]
async fn test_search_tokens_ignores_case_in_corpus() {
    let corpus = serde_json::json!({"documents": [
        {"id": 1, "title": "Pantry", "url": "http://wikibooks/1", "terms": {"Salt": 3, "salt": 2}},
        {"id": 2, "title": "Harbour", "url": "http://wikibooks/2", "terms": {"SALTWATER": 1}}
    ]});
    let store = MemoryStore::from_corpus(serde_json::from_value(corpus).unwrap()).unwrap();
    let service = service_over(store);

    let hits = service.search_tokens("sal").await.unwrap();
    let flat: Vec<(&str, u64, u32)> = hits
        .iter()
        .map(|h| (&*h.term, h.doc_id.value(), h.frequency))
        .collect();
    assert_eq!(flat, vec![("salt", 1, 5), ("saltwater", 2, 1)]);
    assert_eq!(hits[1].title.as_deref(), Some("Harbour"));
}

#[tokio::test]
async fn test_search_tokens_rejects_bad_input() {
    let service = service_over(MemoryStore::from_vectors(corpus()).unwrap());

    for input in ["", "   ", " rare", "rare ", "two words"] {
        let err = service.search_tokens(input).await.unwrap_err();
        assert!(matches!(err, SimilarityError::InvalidInput(_)), "input {input:?}");
    }
    assert!(service.search_tokens("zzz").await.unwrap().is_empty());
}
