//! Similarity search over sparse term-frequency vectors.
//!
//! ## Flow
//!
//! ```text
//! query id ─► fetch vector ─► CANDIDATES ─► fetch vectors ─► RANK ─► top-k
//!                             (bottom-decile     (rayon fan-out,
//!                              seed postings)     single collector)
//! ```
//!
//! - [`candidates`]: seed-term selection and posting lookup
//! - [`scorer`]: sparse cosine similarity
//! - [`ranking`]: concurrent scoring and deterministic top-k
//! - [`service`]: request orchestration over injected repositories

pub mod candidates;
pub mod error;
pub mod ranking;
pub mod scorer;
pub mod service;

pub use candidates::{CandidateGenerator, SEED_DIVISOR, select_seed_terms};
pub use error::{ScoringError, SimilarityError, SimilarityResult};
pub use ranking::{RankStats, Ranking, RankingEngine, rank_order};
pub use scorer::{cosine_similarity, dot_product};
pub use service::SimilarityService;
