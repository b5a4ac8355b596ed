//! In-memory store backed by a JSON corpus file.
//!
//! Holds every document vector plus the posting lists derived from them.
//! Norms come from the file when present, otherwise they are computed once at
//! load time from each document's full term map.
//!
//! Posting keys are lowercased, so term lookups ignore case.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{PostingRepository, StorageError, StorageResult, VectorRepository};
use crate::types::{DocId, Posting, SparseVector, TermId, euclidean_norm};

/// On-disk corpus layout.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CorpusFile {
    #[serde(default)]
    pub documents: Vec<CorpusDocument>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorpusDocument {
    pub id: DocId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub terms: HashMap<String, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub norm: Option<f64>,
}

impl CorpusDocument {
    fn into_vector(self) -> StorageResult<SparseVector> {
        // Terms are stored lowercased; case variants of one token merge
        let mut terms: HashMap<TermId, u32> = HashMap::with_capacity(self.terms.len());
        for (term, freq) in self.terms {
            if freq > 0 {
                *terms.entry(term.to_lowercase().into_boxed_str()).or_default() += freq;
            }
        }

        let norm = match self.norm {
            Some(norm) if norm.is_finite() && norm >= 0.0 => norm,
            Some(norm) => {
                return Err(StorageError::InvalidFieldValue {
                    field: format!("documents[{}].norm", self.id),
                    reason: format!("{norm} is not a finite non-negative number"),
                });
            }
            None => euclidean_norm(&terms),
        };

        Ok(SparseVector::new(self.id, terms, norm, self.title, self.url))
    }
}

/// Vector and posting repository over an in-memory corpus.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: HashMap<DocId, SparseVector>,
    /// term -> (doc, frequency), sorted by doc id
    postings: BTreeMap<TermId, Vec<(DocId, u32)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a corpus file written in the `CorpusFile` layout.
    pub fn load(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let corpus: CorpusFile =
            serde_json::from_str(&content).map_err(|source| StorageError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let store = Self::from_corpus(corpus)?;
        crate::log_event!(
            "store",
            "loaded",
            "{} documents, {} terms from {}",
            store.document_count(),
            store.term_count(),
            path.display()
        );
        Ok(store)
    }

    pub fn from_corpus(corpus: CorpusFile) -> StorageResult<Self> {
        let vectors = corpus
            .documents
            .into_iter()
            .map(CorpusDocument::into_vector)
            .collect::<StorageResult<Vec<_>>>()?;
        Self::from_vectors(vectors)
    }

    /// Build the store from vectors whose norms are already set. Vectors are
    /// kept as given; only their posting keys are case-folded.
    pub fn from_vectors(vectors: impl IntoIterator<Item = SparseVector>) -> StorageResult<Self> {
        let mut store = Self::new();
        for vector in vectors {
            store.insert(vector)?;
        }
        for list in store.postings.values_mut() {
            list.sort_unstable_by_key(|(doc, _)| *doc);
        }
        Ok(store)
    }

    fn insert(&mut self, vector: SparseVector) -> StorageResult<()> {
        if self.documents.contains_key(&vector.id) {
            return Err(StorageError::DuplicateDocument(vector.id));
        }
        for (term, &freq) in &vector.terms {
            let list = self
                .postings
                .entry(term.to_lowercase().into_boxed_str())
                .or_default();
            // Entries for this document are the most recent ones in the list
            match list.last_mut() {
                Some((doc, total)) if *doc == vector.id => *total += freq,
                _ => list.push((vector.id, freq)),
            }
        }
        self.documents.insert(vector.id, vector);
        Ok(())
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn get(&self, id: DocId) -> Option<&SparseVector> {
        self.documents.get(&id)
    }
}

#[async_trait]
impl VectorRepository for MemoryStore {
    async fn fetch(&self, ids: &[DocId]) -> StorageResult<Vec<SparseVector>> {
        let mut seen = HashSet::with_capacity(ids.len());
        Ok(ids
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| self.documents.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl PostingRepository for MemoryStore {
    async fn docs_referencing(&self, terms: &[TermId]) -> StorageResult<HashSet<DocId>> {
        Ok(terms
            .iter()
            .filter_map(|term| self.postings.get(term.to_lowercase().as_str()))
            .flat_map(|list| list.iter().map(|(doc, _)| *doc))
            .collect())
    }

    async fn postings_with_prefix(&self, prefix: &str) -> StorageResult<Vec<Posting>> {
        let prefix = prefix.to_lowercase();
        let prefix = prefix.as_str();
        let range = self
            .postings
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded));
        Ok(range
            .take_while(|(term, _)| term.starts_with(prefix))
            .flat_map(|(term, list)| {
                list.iter().map(move |&(doc_id, frequency)| Posting {
                    term: term.clone(),
                    doc_id,
                    frequency,
                })
            })
            .collect())
    }
}
