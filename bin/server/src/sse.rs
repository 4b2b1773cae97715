//! Server-sent event payloads for `/invoke`.
//!
//! A streamed run is relayed as a sequence of JSON objects tagged by `type`:
//! `connection` first, then `tool_call`, `content` and `tool_result` events
//! as the run progresses, and finally `complete` or `error`.

use crate::config::StreamConfig;
use crate::state::AppState;
use axum::response::sse::Event;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use ticker_agent_agent::AgentStep;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendError;

/// One event of a streamed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Sent once when the stream opens.
    Connection { message: String },
    /// The model requested a tool call.
    ToolCall {
        id: String,
        name: String,
        arguments: JsonValue,
    },
    /// A slice of assistant text.
    Content { content: String },
    /// A tool produced a result.
    ToolResult {
        id: String,
        name: String,
        content: String,
    },
    /// The run reached its final answer.
    Complete,
    /// The run failed. Nothing follows.
    Error { message: String },
}

impl StreamEvent {
    pub fn connected() -> Self {
        Self::Connection {
            message: "Connected to ticker-agent stream".to_string(),
        }
    }

    pub fn error(message: impl ToString) -> Self {
        Self::Error {
            message: message.to_string(),
        }
    }

    /// Frames the event as a single-line JSON `data:` field.
    #[must_use]
    pub fn to_sse(&self) -> Event {
        let data = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"failed to encode event: {e}"}}"#)
        });
        Event::default().data(data)
    }
}

/// Splits `text` into groups of `words` whitespace-separated words.
///
/// Every chunk but the last ends with a space, so concatenating the chunks
/// restores the text with single spaces between words.
#[must_use]
pub fn chunk_words(text: &str, words: usize) -> Vec<String> {
    let all: Vec<&str> = text.split_whitespace().collect();
    let groups: Vec<String> = all.chunks(words.max(1)).map(|group| group.join(" ")).collect();
    let last = groups.len().saturating_sub(1);
    groups
        .into_iter()
        .enumerate()
        .map(|(i, group)| if i < last { group + " " } else { group })
        .collect()
}

/// Runs `query` and forwards its events to `tx` until the run ends or the
/// receiver is dropped.
pub async fn relay(state: Arc<AppState>, query: String, tx: mpsc::Sender<StreamEvent>) {
    if forward(&state, query, &tx).await.is_err() {
        tracing::debug!("client disconnected, stopping stream");
    }
}

async fn forward(
    state: &AppState,
    query: String,
    tx: &mpsc::Sender<StreamEvent>,
) -> Result<(), SendError<StreamEvent>> {
    tx.send(StreamEvent::connected()).await?;

    let agent = match state.agent.get().await {
        Ok(agent) => agent,
        Err(report) => {
            tracing::warn!(error = %report.current_context(), "agent unavailable");
            return tx.send(StreamEvent::error(report.current_context())).await;
        }
    };

    let mut steps = agent.stream(query);
    while let Some(step) = steps.next().await {
        match step {
            Ok(step) => send_step(&step, &state.stream, tx).await?,
            Err(report) => {
                tracing::warn!(error = %report.current_context(), "streamed run failed");
                return tx.send(StreamEvent::error(report.current_context())).await;
            }
        }
    }

    tx.send(StreamEvent::Complete).await
}

async fn send_step(
    step: &AgentStep,
    config: &StreamConfig,
    tx: &mpsc::Sender<StreamEvent>,
) -> Result<(), SendError<StreamEvent>> {
    match step {
        AgentStep::Model { turn } => {
            for call in &turn.tool_calls {
                tx.send(StreamEvent::ToolCall {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                })
                .await?;
            }
            if turn.has_content() {
                let delay = config.chunk_delay();
                for content in chunk_words(&turn.content, config.chunk_words) {
                    tx.send(StreamEvent::Content { content }).await?;
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        AgentStep::Tools { results } => {
            for turn in results {
                tx.send(StreamEvent::ToolResult {
                    id: turn.tool_call_id.clone().unwrap_or_default(),
                    name: turn.tool_name.clone().unwrap_or_default(),
                    content: turn.content.clone(),
                })
                .await?;
            }
        }
    }
    Ok(())
}
