//! Store-facing contracts used by the similarity core.
//!
//! Implementations own connection handling and retries; the core only sees
//! these two traits and never reaches for a global handle.

use std::collections::HashSet;

use async_trait::async_trait;

use super::StorageResult;
use crate::types::{DocId, Posting, SparseVector, TermId};

/// Fetches document vectors joined with their display metadata.
#[async_trait]
pub trait VectorRepository: Send + Sync {
    /// Vectors for the requested ids. Unknown ids are absent from the result,
    /// not an error. Order of the result is unspecified.
    async fn fetch(&self, ids: &[DocId]) -> StorageResult<Vec<SparseVector>>;
}

/// Read access to the inverted index.
#[async_trait]
pub trait PostingRepository: Send + Sync {
    /// Distinct ids of documents whose postings reference any of `terms`.
    async fn docs_referencing(&self, terms: &[TermId]) -> StorageResult<HashSet<DocId>>;

    /// Every posting whose term starts with `prefix`.
    async fn postings_with_prefix(&self, prefix: &str) -> StorageResult<Vec<Posting>>;
}
