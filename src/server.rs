//! HTTP transport.
//!
//! Non-streaming batches return the aggregate as JSON. Streaming batches
//! return Server-Sent Events with proxy buffering disabled; when the client
//! disconnects the event receiver is dropped and the batch stops.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderName, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::engine::{BatchCoordinator, DedupService};
use crate::error::{Error, Result};
use crate::model::{BatchOperationResult, BatchRequest, DedupSummary, ProgressEvent};
use crate::progress::ChannelSink;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<BatchCoordinator>,
    pub dedup: Arc<DedupService>,
}

#[derive(Debug, Deserialize)]
pub struct DedupRequest {
    pub category: String,
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            e if e.is_upstream_ai() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(%status, error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/batch/classify", post(classify_batch))
        .route("/batch/classify/stream", post(classify_batch_stream))
        .route("/dedup", post(dedup_category))
        .route("/dedup/all", post(dedup_all))
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "triage server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn classify_batch(
    State(state): State<AppState>,
    payload: std::result::Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchOperationResult>> {
    let Json(request) = payload?;
    let result = state.coordinator.run_collected(&request).await?;
    Ok(Json(result))
}

async fn classify_batch_stream(
    State(state): State<AppState>,
    payload: std::result::Result<Json<BatchRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    // Reject before any event is sent.
    let Json(request) = payload?;
    request.validate()?;

    let (mut sink, rx) = ChannelSink::channel();
    let coordinator = Arc::clone(&state.coordinator);
    tokio::spawn(async move {
        if let Err(e) = coordinator.run(&request, &mut sink).await {
            warn!(error = %e, "streaming batch failed");
        }
    });

    Ok((
        [(HeaderName::from_static("x-accel-buffering"), "no")],
        Sse::new(event_stream(rx)).keep_alive(KeepAlive::default()),
    ))
}

fn event_stream(
    rx: mpsc::Receiver<ProgressEvent>,
) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
    futures::stream::unfold(rx, |mut rx| async move {
        let progress = rx.recv().await?;
        let event = Event::default()
            .event("progress")
            .json_data(&progress)
            .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()));
        Some((Ok(event), rx))
    })
}

async fn dedup_category(
    State(state): State<AppState>,
    payload: std::result::Result<Json<DedupRequest>, JsonRejection>,
) -> Result<Json<DedupSummary>> {
    let Json(request) = payload?;
    let summary = state.dedup.deduplicate_category(&request.category).await?;
    Ok(Json(summary))
}

async fn dedup_all(State(state): State<AppState>) -> Result<Json<Vec<DedupSummary>>> {
    let summaries = state.dedup.deduplicate_all().await?;
    Ok(Json(summaries))
}
