//! Document similarity search over sparse term-frequency vectors.
//!
//! A query document's rarest terms seed a posting lookup, the resulting
//! candidates are scored by cosine similarity on a worker pool, and the top
//! matches are returned best first.

pub mod cli;
pub mod config;
pub mod logging;
#[cfg(feature = "http-server")]
pub mod server;
pub mod similarity;
pub mod storage;
pub mod types;

pub use config::Settings;
pub use similarity::{
    CandidateGenerator, RankingEngine, ScoringError, SimilarityError, SimilarityResult,
    SimilarityService,
};
pub use storage::{MemoryStore, PostingRepository, StorageError, VectorRepository};
pub use types::{DocId, ScoredCandidate, SparseVector, TermId, TokenHit};
