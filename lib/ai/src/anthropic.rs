//! Anthropic Messages API backend.

use crate::backend::{ChatRequest, ChatResponse, LlmBackend, TokenUsage};
use crate::error::LlmError;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use ticker_agent_conversation::{ToolCallRequest, ToolSpec, Turn, TurnRole};
use tracing::instrument;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Configuration for [`AnthropicBackend`].
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API base URL; requests go to `{endpoint}/messages`.
    pub endpoint: String,
    /// Model identifier.
    pub model: String,
    /// API key sent as `x-api-key`.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.anthropic.com/v1".to_string(),
            model: "claude-3-5-sonnet-latest".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

/// Chat backend for the Anthropic Messages API.
pub struct AnthropicBackend {
    client: reqwest::Client,
    config: AnthropicConfig,
}

impl std::fmt::Debug for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicBackend")
            .field("endpoint", &self.config.endpoint)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a JsonValue,
}

impl<'a> From<&'a ToolSpec> for AnthropicTool<'a> {
    fn from(spec: &'a ToolSpec) -> Self {
        Self {
            name: &spec.name,
            description: &spec.description,
            input_schema: &spec.parameters,
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: JsonValue,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl AnthropicBackend {
    /// Creates a backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client cannot
    /// be built.
    pub fn new(config: AnthropicConfig) -> Result<Self, Report<LlmError>> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::InvalidConfig {
                reason: "Anthropic API key is not configured".to_string(),
            }
            .into());
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, config })
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", self.config.endpoint.trim_end_matches('/'))
    }

    async fn send_once(
        &self,
        body: &MessagesRequest<'_>,
    ) -> Result<MessagesResponse, Report<LlmError>> {
        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::RequestFailed {
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body, retry_after_secs).into());
        }

        let parsed = response
            .json::<MessagesResponse>()
            .await
            .map_err(|e| LlmError::ResponseParseFailed {
                reason: e.to_string(),
            })?;
        Ok(parsed)
    }
}

fn status_error(
    status: reqwest::StatusCode,
    body: String,
    retry_after_secs: Option<u64>,
) -> LlmError {
    match status.as_u16() {
        401 | 403 => LlmError::Authentication { reason: body },
        429 => LlmError::RateLimited { retry_after_secs },
        code @ 500..=599 => LlmError::ServerError {
            status: code,
            reason: body,
        },
        code => LlmError::InvalidRequest {
            status: code,
            reason: body,
        },
    }
}

/// Converts the turn log into Anthropic messages.
///
/// Tool results travel as `tool_result` blocks inside user messages, and
/// consecutive messages of the same role are merged so roles alternate.
fn convert_turns(turns: &[Turn]) -> Vec<AnthropicMessage> {
    let mut messages: Vec<AnthropicMessage> = Vec::new();

    for turn in turns {
        let (role, blocks) = match turn.role {
            TurnRole::User => ("user", vec![ContentBlock::Text {
                text: turn.content.clone(),
            }]),
            TurnRole::Assistant => {
                let mut blocks = Vec::with_capacity(turn.tool_calls.len() + 1);
                if turn.has_content() {
                    blocks.push(ContentBlock::Text {
                        text: turn.content.clone(),
                    });
                }
                blocks.extend(turn.tool_calls.iter().map(|call| ContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: call.arguments.clone(),
                }));
                ("assistant", blocks)
            }
            TurnRole::ToolResult => ("user", vec![ContentBlock::ToolResult {
                tool_use_id: turn.tool_call_id.clone().unwrap_or_default(),
                content: turn.content.clone(),
            }]),
        };

        match messages.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => messages.push(AnthropicMessage {
                role,
                content: blocks,
            }),
        }
    }

    messages
}

fn into_chat_response(response: MessagesResponse) -> ChatResponse {
    let mut text_parts = Vec::new();
    let mut tool_calls = Vec::new();

    for block in response.content {
        match block {
            ContentBlock::Text { text } => text_parts.push(text),
            ContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCallRequest::new(id, name, input));
            }
            ContentBlock::ToolResult { .. } | ContentBlock::Unsupported => {}
        }
    }

    ChatResponse {
        turn: Turn::assistant(text_parts.join("\n"), tool_calls),
        usage: TokenUsage {
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        },
        model: response.model,
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    #[instrument(skip(self, request), fields(model = %self.config.model, turns = request.turns.len()))]
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, Report<LlmError>> {
        let body = MessagesRequest {
            model: &self.config.model,
            messages: convert_turns(request.turns),
            max_tokens: request.max_tokens,
            system: request.system,
            temperature: request.temperature,
            tools: request.tools.iter().map(AnthropicTool::from).collect(),
        };

        let response = self
            .config
            .retry
            .run("anthropic messages", || self.send_once(&body))
            .await?;

        let response = into_chat_response(response);
        tracing::debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            tool_calls = response.turn.tool_calls.len(),
            "model replied"
        );
        Ok(response)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
