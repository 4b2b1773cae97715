//! Agent control loop.
//!
//! A run moves through [`LoopState`]s:
//! 1. `Model`: send the conversation to the model, append its reply
//! 2. `ToolExec`: run every requested tool call in order, append the results
//! 3. Back to `Model`, until a reply carries no tool calls (`Done`)
//!
//! [`Agent::run`] drives a run to completion. [`Agent::stream`] yields each
//! step as it happens, for callers that relay progress to a client.

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::state::{LoopState, should_continue};
use futures::Stream;
use rootcause::Report;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use ticker_agent_ai::{ChatRequest, LlmBackend};
use ticker_agent_conversation::{ConversationState, ToolError, ToolRegistry, ToolSpec, Turn};
use ticker_agent_core::RunId;
use tracing::instrument;

/// One completed step of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentStep {
    /// The model replied with this assistant turn.
    Model { turn: Turn },
    /// The tool calls of the previous turn produced these results, in order.
    Tools { results: Vec<Turn> },
}

/// The outcome of a run that reached `Done`.
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// Run identifier.
    pub run_id: RunId,
    /// Every turn of the run.
    pub conversation: ConversationState,
    /// Content of the final assistant turn.
    pub answer: String,
    /// Number of model calls made.
    pub model_steps: u32,
}

/// Steps of a streamed run. Ends after `Done` or after the first error.
pub type AgentStream = Pin<Box<dyn Stream<Item = Result<AgentStep, Report<AgentError>>> + Send>>;

/// A model backend, a tool registry and the knobs to drive them.
pub struct Agent {
    backend: Arc<dyn LlmBackend>,
    tools: ToolRegistry,
    specs: Vec<ToolSpec>,
    config: AgentConfig,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("model", &self.backend.model())
            .field("tools", &self.tools)
            .field("config", &self.config)
            .finish()
    }
}

/// Mutable state of one run.
struct Run {
    id: RunId,
    conversation: ConversationState,
    state: LoopState,
    model_steps: u32,
}

impl Agent {
    /// Creates an agent.
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>, tools: ToolRegistry, config: AgentConfig) -> Self {
        let specs = tools.specs();
        Self {
            backend,
            tools,
            specs,
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Returns the registered tools.
    #[must_use]
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answers `query`, calling tools as the model requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is blank, the model fails, requests an
    /// unknown tool, passes malformed arguments, or is still calling tools
    /// after `max_iterations` model calls.
    pub async fn run(&self, query: impl Into<String>) -> Result<AgentRun, Report<AgentError>> {
        let query = query.into();
        check_query(&query)?;
        let mut run = Run::new(query);
        let started = Instant::now();
        while run.step(self).await?.is_some() {}

        let answer = run.conversation.final_answer().unwrap_or_default().to_string();
        tracing::info!(
            run_id = %run.id,
            model_steps = run.model_steps,
            turns = run.conversation.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "agent run finished"
        );
        Ok(AgentRun {
            run_id: run.id,
            conversation: run.conversation,
            answer,
            model_steps: run.model_steps,
        })
    }

    /// Answers `query`, yielding each step as it completes.
    #[must_use]
    pub fn stream(self: Arc<Self>, query: impl Into<String>) -> AgentStream {
        let query = query.into();
        if let Err(report) = check_query(&query) {
            return Box::pin(futures::stream::once(async move { Err(report) }));
        }
        let run = Run::new(query);
        Box::pin(futures::stream::unfold(
            Some((self, run)),
            |state| async move {
                let (agent, mut run) = state?;
                match run.step(&agent).await {
                    Ok(Some(step)) => Some((Ok(step), Some((agent, run)))),
                    Ok(None) => None,
                    Err(report) => Some((Err(report), None)),
                }
            },
        ))
    }
}

fn check_query(query: &str) -> Result<(), Report<AgentError>> {
    if query.trim().is_empty() {
        return Err(AgentError::EmptyQuery.into());
    }
    Ok(())
}

fn tool_failure(error: &ToolError) -> AgentError {
    match error {
        ToolError::NotFound { name } => AgentError::UnknownTool { name: name.clone() },
        ToolError::InvalidInput { name, reason } => AgentError::InvalidToolArguments {
            name: name.clone(),
            reason: reason.clone(),
        },
        ToolError::Duplicate { name } => AgentError::Conversation {
            reason: format!("duplicate tool {name}"),
        },
    }
}

impl Run {
    fn new(query: impl Into<String>) -> Self {
        Self {
            id: RunId::new(),
            conversation: ConversationState::new(query),
            state: LoopState::Model,
            model_steps: 0,
        }
    }

    fn append(&mut self, turn: Turn) -> Result<(), Report<AgentError>> {
        self.conversation
            .push(turn)
            .map_err(|report| AgentError::Conversation {
                reason: report.current_context().to_string(),
            })?;
        Ok(())
    }

    /// Advances one state. Returns `None` once the run is done.
    async fn step(&mut self, agent: &Agent) -> Result<Option<AgentStep>, Report<AgentError>> {
        match self.state {
            LoopState::Model => self.call_model(agent).await.map(Some),
            LoopState::ToolExec => self.execute_tools(agent).await.map(Some),
            LoopState::Done => Ok(None),
        }
    }

    #[instrument(skip(self, agent), fields(run_id = %self.id, step = self.model_steps + 1))]
    async fn call_model(&mut self, agent: &Agent) -> Result<AgentStep, Report<AgentError>> {
        if self.model_steps >= agent.config.max_iterations {
            tracing::warn!(max = agent.config.max_iterations, "iteration cap reached");
            return Err(AgentError::MaxIterationsExceeded {
                max: agent.config.max_iterations,
            }
            .into());
        }

        let started = Instant::now();
        let mut request = ChatRequest::new(self.conversation.turns())
            .with_system(&agent.config.system_prompt)
            .with_tools(&agent.specs)
            .with_max_tokens(agent.config.max_tokens);
        if let Some(temperature) = agent.config.temperature {
            request = request.with_temperature(temperature);
        }

        let response = agent
            .backend
            .chat(&request)
            .await
            .map_err(|report| AgentError::Model {
                reason: report.current_context().to_string(),
            })?;
        self.model_steps += 1;

        let turn = response.turn;
        let next = should_continue(&turn);
        tracing::info!(
            tool_calls = turn.tool_calls.len(),
            next = %next,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "model step"
        );

        if next == LoopState::ToolExec && self.model_steps >= agent.config.max_iterations {
            tracing::warn!(max = agent.config.max_iterations, "iteration cap reached");
            return Err(AgentError::MaxIterationsExceeded {
                max: agent.config.max_iterations,
            }
            .into());
        }

        self.append(turn.clone())?;
        self.state = next;
        Ok(AgentStep::Model { turn })
    }

    #[instrument(skip(self, agent), fields(run_id = %self.id, step = self.model_steps))]
    async fn execute_tools(&mut self, agent: &Agent) -> Result<AgentStep, Report<AgentError>> {
        let calls = self.conversation.pending_tool_calls().to_vec();
        let mut results = Vec::with_capacity(calls.len());

        for call in &calls {
            let started = Instant::now();
            let output = agent
                .tools
                .execute(call)
                .await
                .map_err(|report| tool_failure(report.current_context()))?;
            tracing::info!(
                tool = %call.name,
                call_id = %call.id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "tool executed"
            );

            let turn = Turn::tool_result(call, output);
            self.append(turn.clone())?;
            results.push(turn);
        }

        self.state = LoopState::Model;
        Ok(AgentStep::Tools { results })
    }
}
