//! HTTP surface for similarity search.
//!
//! Routes:
//! - `GET /similar?id=<doc id>&limit=<k>`: most similar documents, best first
//! - `GET /tokens?search=<prefix>`: postings for terms starting with a prefix
//! - `GET /health`: liveness probe

pub mod error;

pub use error::ApiError;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tokio_util::sync::{CancellationToken, DropGuard};
use tower_http::cors::CorsLayer;

use crate::Settings;
use crate::config::SimilarityConfig;
use crate::similarity::{SimilarityError, SimilarityService};
use crate::storage::MemoryStore;
use crate::types::{DocId, ScoredCandidate, TokenHit};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: SimilarityService,
    pub similarity: SimilarityConfig,
    pub request_timeout: Duration,
    /// Root token; every request runs under a child of it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(service: SimilarityService, settings: &Settings) -> Self {
        Self {
            service,
            similarity: settings.similarity.clone(),
            request_timeout: Duration::from_millis(settings.server.request_timeout_ms),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token for one request. It fires when the request timeout elapses, when
    /// the server shuts down, or when the returned guard is dropped (handler
    /// finished or client went away).
    fn request_token(&self) -> (CancellationToken, DropGuard) {
        let token = self.shutdown.child_token();
        let timer = token.clone();
        let timeout = self.request_timeout;
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    crate::debug_event!("http", "request timed out", "after {timeout:?}");
                    timer.cancel();
                }
                _ = timer.cancelled() => {}
            }
        });
        (token.clone(), token.drop_guard())
    }
}

#[derive(Debug, Deserialize)]
struct SimilarParams {
    id: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenParams {
    search: Option<String>,
}

fn parse_limit(raw: Option<&str>) -> Result<Option<usize>, SimilarityError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text.parse::<usize>().map(Some).map_err(|_| {
            SimilarityError::InvalidInput(format!(
                "invalid limit '{text}': expected a non-negative integer"
            ))
        }),
    }
}

async fn health_check() -> &'static str {
    "OK"
}

async fn find_similar(
    State(state): State<AppState>,
    Query(params): Query<SimilarParams>,
) -> Result<Json<Vec<ScoredCandidate>>, ApiError> {
    let id: DocId = params
        .id
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(SimilarityError::from)?;
    let limit = state
        .similarity
        .effective_limit(parse_limit(params.limit.as_deref())?);

    let (cancel, _guard) = state.request_token();
    let results = state.service.find_similar(id, limit, cancel).await?;
    Ok(Json(results))
}

async fn search_tokens(
    State(state): State<AppState>,
    Query(params): Query<TokenParams>,
) -> Result<Json<Vec<TokenHit>>, ApiError> {
    let search = params.search.unwrap_or_default();
    let hits = state.service.search_tokens(&search).await?;
    Ok(Json(hits))
}

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/similar", get(find_similar))
        .route("/tokens", get(search_tokens))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Build the service over the configured in-memory corpus.
pub fn service_from_settings(settings: &Settings) -> anyhow::Result<SimilarityService> {
    let store = Arc::new(MemoryStore::load(&settings.store.corpus_path)?);
    let service = SimilarityService::with_config(store.clone(), store, &settings.similarity)?;
    Ok(service)
}

/// Run the HTTP server until Ctrl+C.
pub async fn serve_http(settings: Settings, bind: String) -> anyhow::Result<()> {
    crate::log_event!("http", "starting", "similarity server on {bind}");

    let service = service_from_settings(&settings)?;
    let state = AppState::new(service, &settings);
    let ct = state.shutdown.clone();
    let router = create_router(state);

    async fn shutdown_signal() {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("[http] failed to listen for ctrl+c: {e}");
            std::future::pending::<()>().await;
        }
    }

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    eprintln!("HTTP server listening on http://{bind}");
    eprintln!("Similar documents: http://{bind}/similar?id=<id>");
    eprintln!("Health check: http://{bind}/health");
    eprintln!("Press Ctrl+C to stop the server");

    let server = axum::serve(listener, router);

    tokio::select! {
        result = server => {
            result?;
        }
        _ = shutdown_signal() => {
            eprintln!("Shutting down HTTP server...");
            ct.cancel();
        }
    }

    crate::log_event!("http", "stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(None).unwrap(), None);
        assert_eq!(parse_limit(Some("")).unwrap(), None);
        assert_eq!(parse_limit(Some(" 7 ")).unwrap(), Some(7));
        assert!(matches!(
            parse_limit(Some("ten")),
            Err(SimilarityError::InvalidInput(_))
        ));
        assert!(parse_limit(Some("-1")).is_err());
    }
}
