//! HTTP handlers.

use crate::sse::{StreamEvent, relay};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL};
use axum::response::IntoResponse;
use axum::response::sse::{Event, Sse};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;

/// Capacity of the per-request SSE channel.
const STREAM_BUFFER: usize = 64;

/// Body of `/invoke` and `/invoke-simple`.
#[derive(Debug, Clone, Deserialize)]
pub struct InvokeRequest {
    pub query: String,
}

/// Body of `/invoke-simple` replies. Failures are reported in-band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvokeResponse {
    Response(String),
    Error(String),
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        message: None,
    })
}

/// Liveness probe. Never touches the agent.
pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "healthy",
        message: Some("ticker-agent is running"),
    })
}

/// Runs the query to completion and returns the final answer.
pub async fn invoke_simple(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InvokeRequest>,
) -> Json<InvokeResponse> {
    let agent = match state.agent.get().await {
        Ok(agent) => agent,
        Err(report) => {
            tracing::warn!(error = %report.current_context(), "agent unavailable");
            return Json(InvokeResponse::Error(report.current_context().to_string()));
        }
    };

    match agent.run(request.query).await {
        Ok(run) => Json(InvokeResponse::Response(run.answer)),
        Err(report) => {
            tracing::warn!(error = %report.current_context(), "agent run failed");
            Json(InvokeResponse::Error(report.current_context().to_string()))
        }
    }
}

/// Streams the run as server-sent events.
pub async fn invoke(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InvokeRequest>,
) -> impl IntoResponse {
    let (tx, rx) = tokio::sync::mpsc::channel(STREAM_BUFFER);
    tokio::spawn(relay(state, request.query, tx));

    (
        [(CACHE_CONTROL, "no-cache"), (ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Sse::new(event_stream(ReceiverStream::new(rx))),
    )
}

fn event_stream(
    events: impl Stream<Item = StreamEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    events.map(|event| Ok(event.to_sse()))
}
