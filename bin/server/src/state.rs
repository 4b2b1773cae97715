//! Shared application state.

use crate::config::{AppConfig, StreamConfig};
use crate::error::InitError;
use rootcause::Report;
use std::sync::Arc;
use tokio::sync::OnceCell;
use ticker_agent_agent::Agent;
use ticker_agent_ai::AnthropicBackend;
use ticker_agent_conversation::ToolRegistry;
use ticker_agent_core::Result;
use ticker_agent_market::{YahooFinance, register_tools};

type AgentFactory = dyn Fn() -> Result<Agent, InitError> + Send + Sync;

/// Lazily built, shared agent.
///
/// The agent is built on first use and then shared by every request. A
/// failed build is not cached, so the next request tries again. Concurrent
/// first callers wait on a single build.
pub struct AgentHandle {
    cell: OnceCell<Arc<Agent>>,
    factory: Arc<AgentFactory>,
}

impl std::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHandle")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

impl AgentHandle {
    /// Creates a handle that builds its agent with `factory`.
    pub fn new(factory: impl Fn() -> Result<Agent, InitError> + Send + Sync + 'static) -> Self {
        Self {
            cell: OnceCell::new(),
            factory: Arc::new(factory),
        }
    }

    /// Creates a handle that builds the production agent from `config`.
    #[must_use]
    pub fn from_config(config: AppConfig) -> Self {
        Self::new(move || build_agent(&config))
    }

    /// Creates a handle around an already built agent.
    #[must_use]
    pub fn ready(agent: Arc<Agent>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(agent)),
            factory: Arc::new(|| -> Result<Agent, InitError> {
                Err(InitError::Tools {
                    reason: "agent already built".to_string(),
                }
                .into())
            }),
        }
    }

    /// Returns the agent, building it if needed.
    ///
    /// # Errors
    ///
    /// Returns the build error if the agent is not built yet and building fails.
    pub async fn get(&self) -> Result<Arc<Agent>, InitError> {
        self.cell
            .get_or_try_init(|| async {
                let agent = (self.factory)()?;
                tracing::info!(
                    tools = agent.tools().len(),
                    max_iterations = agent.config().max_iterations,
                    "agent initialized"
                );
                Ok::<_, Report<InitError>>(Arc::new(agent))
            })
            .await
            .cloned()
    }

    /// Returns true once the agent has been built.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

/// Builds the production agent: the Anthropic backend plus the Yahoo-backed
/// stock tools.
///
/// # Errors
///
/// Returns an error if the API key is missing or an HTTP client cannot be built.
pub fn build_agent(config: &AppConfig) -> Result<Agent, InitError> {
    let backend = AnthropicBackend::new(config.model.anthropic_config()).map_err(|report| {
        InitError::Model {
            reason: report.current_context().to_string(),
        }
    })?;

    let provider = YahooFinance::new(config.market.yahoo_config()).map_err(|report| {
        InitError::Market {
            reason: report.current_context().to_string(),
        }
    })?;

    let mut tools = ToolRegistry::new();
    register_tools(&mut tools, Arc::new(provider)).map_err(|report| InitError::Tools {
        reason: report.current_context().to_string(),
    })?;

    Ok(Agent::new(Arc::new(backend), tools, config.agent_config()))
}

/// State shared by all handlers.
#[derive(Debug)]
pub struct AppState {
    pub agent: AgentHandle,
    pub stream: StreamConfig,
}

impl AppState {
    #[must_use]
    pub fn new(agent: AgentHandle, stream: StreamConfig) -> Self {
        Self { agent, stream }
    }
}
