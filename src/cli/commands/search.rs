//! Similar and Tokens commands - one-shot queries against the corpus.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::similarity::SimilarityService;
use crate::storage::MemoryStore;
use crate::types::{DocId, ScoredCandidate, TokenHit};

fn open_service(config: &Settings, corpus: Option<PathBuf>) -> anyhow::Result<SimilarityService> {
    let path = corpus.unwrap_or_else(|| config.store.corpus_path.clone());
    let store = Arc::new(
        MemoryStore::load(&path).with_context(|| format!("opening corpus {}", path.display()))?,
    );
    Ok(SimilarityService::with_config(
        store.clone(),
        store,
        &config.similarity,
    )?)
}

/// Render similar documents as aligned text lines.
pub fn format_similar(results: &[ScoredCandidate]) -> String {
    if results.is_empty() {
        return "No similar documents found.\n".to_string();
    }
    let mut out = String::new();
    for (rank, hit) in results.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}. {:.4}  [{}] {}  {}\n",
            rank + 1,
            hit.similarity,
            hit.id,
            hit.title,
            hit.url
        ));
    }
    out
}

/// Render token hits as aligned text lines.
pub fn format_tokens(hits: &[TokenHit]) -> String {
    if hits.is_empty() {
        return "No matching tokens.\n".to_string();
    }
    let mut out = String::new();
    for hit in hits {
        out.push_str(&format!(
            "{:>6}  {:<20} [{}] {}\n",
            hit.frequency,
            hit.term,
            hit.doc_id,
            hit.title.as_deref().unwrap_or("-")
        ));
    }
    out
}

/// Run the similar command.
pub async fn run_similar(
    config: &Settings,
    id: &str,
    limit: Option<usize>,
    corpus: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let id: DocId = id.parse()?;
    let service = open_service(config, corpus)?;
    let limit = config.similarity.effective_limit(limit);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let results = service.find_similar(id, limit, cancel).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print!("{}", format_similar(&results));
    }
    Ok(())
}

/// Run the tokens command.
pub async fn run_tokens(
    config: &Settings,
    prefix: &str,
    corpus: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let service = open_service(config, corpus)?;
    let hits = service.search_tokens(prefix).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else {
        print!("{}", format_tokens(&hits));
    }
    Ok(())
}
