use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Identity of a document in the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(u64);

/// Term identity as stored in the postings (the lowercased token).
pub type TermId = Box<str>;

impl DocId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rejected document id text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseDocIdError {
    #[error("invalid id -- empty")]
    Empty,

    #[error("invalid id '{0}': expected a non-negative integer")]
    Malformed(String),
}

impl FromStr for DocId {
    type Err = ParseDocIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseDocIdError::Empty);
        }
        trimmed
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ParseDocIdError::Malformed(trimmed.to_string()))
    }
}

/// A document as a sparse term-frequency vector.
///
/// `norm` is the Euclidean norm of the document's full vector as reported by
/// the store. Scoring divides by it and never recomputes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub id: DocId,
    pub terms: HashMap<TermId, u32>,
    pub norm: f64,
    pub title: String,
    pub url: String,
}

impl SparseVector {
    pub fn new(
        id: DocId,
        terms: HashMap<TermId, u32>,
        norm: f64,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id,
            terms,
            norm,
            title: title.into(),
            url: url.into(),
        }
    }

    /// Build a vector from `(term, frequency)` pairs, computing the norm from
    /// them. Zero frequencies are dropped.
    pub fn from_counts<I, T>(id: DocId, counts: I) -> Self
    where
        I: IntoIterator<Item = (T, u32)>,
        T: Into<TermId>,
    {
        let terms: HashMap<TermId, u32> = counts
            .into_iter()
            .filter(|(_, freq)| *freq > 0)
            .map(|(term, freq)| (term.into(), freq))
            .collect();
        let norm = euclidean_norm(&terms);
        Self::new(id, terms, norm, String::new(), String::new())
    }

    pub fn with_meta(mut self, title: impl Into<String>, url: impl Into<String>) -> Self {
        self.title = title.into();
        self.url = url.into();
        self
    }

    /// Number of distinct terms with a non-zero frequency.
    pub fn distinct_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn frequency(&self, term: &str) -> u32 {
        self.terms.get(term).copied().unwrap_or(0)
    }

    /// A vector can only be normalised when its norm is strictly positive.
    pub fn has_usable_norm(&self) -> bool {
        self.norm > 0.0
    }
}

/// Euclidean norm of a term-frequency map.
pub fn euclidean_norm(terms: &HashMap<TermId, u32>) -> f64 {
    terms
        .values()
        .map(|&f| {
            let f = f64::from(f);
            f * f
        })
        .sum::<f64>()
        .sqrt()
}

/// A candidate after scoring against one query. The term map is not kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub id: DocId,
    pub title: String,
    pub url: String,
    pub similarity: f64,
}

impl ScoredCandidate {
    pub fn from_vector(vector: &SparseVector, similarity: f64) -> Self {
        Self {
            id: vector.id,
            title: vector.title.clone(),
            url: vector.url.clone(),
            similarity,
        }
    }
}

/// One entry of a term's posting list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub term: TermId,
    pub doc_id: DocId,
    pub frequency: u32,
}

/// A posting joined with the referenced document's display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHit {
    pub term: TermId,
    pub doc_id: DocId,
    pub frequency: u32,
    pub title: Option<String>,
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_id_parsing() {
        assert_eq!("42".parse::<DocId>().unwrap(), DocId::new(42));
        assert_eq!(" 7 ".parse::<DocId>().unwrap().value(), 7);
        assert_eq!("".parse::<DocId>(), Err(ParseDocIdError::Empty));
        assert!(matches!(
            "abc".parse::<DocId>(),
            Err(ParseDocIdError::Malformed(_))
        ));
        assert!("-3".parse::<DocId>().is_err());
    }

    #[test]
    fn test_from_counts_drops_zeroes_and_computes_norm() {
        let v = SparseVector::from_counts(DocId::new(1), [("a", 3), ("b", 0), ("c", 4)]);
        assert_eq!(v.distinct_terms(), 2);
        assert_eq!(v.frequency("b"), 0);
        assert!((v.norm - 5.0).abs() < 1e-12);
        assert!(v.has_usable_norm());
    }

    #[test]
    fn test_scored_candidate_json_shape() {
        let v = SparseVector::from_counts(DocId::new(9), [("x", 1)]).with_meta("T", "http://u");
        let json = serde_json::to_value(ScoredCandidate::from_vector(&v, 0.5)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 9, "title": "T", "url": "http://u", "similarity": 0.5})
        );
    }
}
