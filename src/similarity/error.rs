use thiserror::Error;

use crate::storage::StorageError;
use crate::types::{DocId, ParseDocIdError};

/// A single candidate that could not be scored. Never fatal to a ranking.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("document {id} has a non-positive norm ({norm}), cannot normalise")]
    DegenerateNorm { id: DocId, norm: f64 },
}

/// Failures of a similarity request.
#[derive(Error, Debug)]
pub enum SimilarityError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("document {0} not found")]
    NotFound(DocId),

    #[error("{operation}: {source}")]
    Repository {
        operation: &'static str,
        #[source]
        source: StorageError,
    },

    #[error("request cancelled")]
    Cancelled,

    #[error("scoring worker failed: {0}")]
    Worker(String),
}

impl SimilarityError {
    /// Wrap a storage failure with the operation that triggered it.
    pub fn repository(operation: &'static str) -> impl FnOnce(StorageError) -> Self {
        move |source| Self::Repository { operation, source }
    }
}

impl From<ParseDocIdError> for SimilarityError {
    fn from(err: ParseDocIdError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

pub type SimilarityResult<T> = Result<T, SimilarityError>;
