//! Centralized server configuration.
//!
//! Loaded via the `config` crate from an optional TOML file
//! (`ticker-agent.toml`, or the path in `TICKER_AGENT_CONFIG`) overridden by
//! environment variables such as `TICKER_AGENT__MODEL__API_KEY`. Every field
//! has a default, so an empty environment yields a complete configuration.

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use ticker_agent_agent::{AgentConfig, DEFAULT_SYSTEM_PROMPT};
use ticker_agent_ai::{AnthropicConfig, RetryPolicy};
use ticker_agent_market::YahooConfig;

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "ticker-agent.toml";
/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_VAR: &str = "TICKER_AGENT_CONFIG";
/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "TICKER_AGENT";
/// Fallback for the model API key.
pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub stream: StreamConfig,
}

/// Listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind, `host:port`.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Hosted model settings.
#[derive(Clone, Deserialize)]
pub struct ModelConfig {
    /// Messages API base URL.
    #[serde(default = "default_model_endpoint")]
    pub endpoint: String,
    /// Model identifier.
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// API key. Falls back to `ANTHROPIC_API_KEY` when empty.
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-request timeout in seconds.
    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each further retry.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

fn default_model_endpoint() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_model_id() -> String {
    "claude-3-5-sonnet-latest".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_model_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_backoff_ms() -> u64 {
    500
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: default_model_endpoint(),
            model_id: default_model_id(),
            api_key: String::new(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            timeout_secs: default_model_timeout_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

// Keeps the API key out of logs.
impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("endpoint", &self.endpoint)
            .field("model_id", &self.model_id)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("initial_backoff_ms", &self.initial_backoff_ms)
            .finish()
    }
}

impl ModelConfig {
    /// Builds the backend configuration.
    #[must_use]
    pub fn anthropic_config(&self) -> AnthropicConfig {
        AnthropicConfig {
            endpoint: self.endpoint.clone(),
            model: self.model_id.clone(),
            api_key: self.api_key.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            retry: RetryPolicy {
                max_retries: self.max_retries,
                initial_backoff: Duration::from_millis(self.initial_backoff_ms),
                ..RetryPolicy::default()
            },
        }
    }
}

/// Market-data provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    #[serde(default = "default_market_base_url")]
    pub base_url: String,
    #[serde(default = "default_market_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_market_base_url() -> String {
    YahooConfig::default().base_url
}

fn default_market_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    YahooConfig::default().user_agent
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: default_market_base_url(),
            timeout_secs: default_market_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl MarketConfig {
    /// Builds the provider configuration.
    #[must_use]
    pub fn yahoo_config(&self) -> YahooConfig {
        YahooConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Control-loop settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    /// Maximum model calls per request.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Build the agent at startup instead of on the first request.
    #[serde(default = "default_eager_init")]
    pub eager_init: bool,
}

fn default_max_iterations() -> u32 {
    10
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_eager_init() -> bool {
    true
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            system_prompt: default_system_prompt(),
            eager_init: default_eager_init(),
        }
    }
}

/// SSE content pacing.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Words per `content` event.
    #[serde(default = "default_chunk_words")]
    pub chunk_words: usize,
    /// Pause after each `content` event, in milliseconds.
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,
}

fn default_chunk_words() -> usize {
    4
}

fn default_chunk_delay_ms() -> u64 {
    50
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_words: default_chunk_words(),
            chunk_delay_ms: default_chunk_delay_ms(),
        }
    }
}

impl StreamConfig {
    #[must_use]
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }
}

impl AppConfig {
    /// Loads configuration from the config file and process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or a value has the wrong type.
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let fallback_key = std::env::var(API_KEY_VAR).ok();
        Self::from_sources(&path, None, fallback_key)
    }

    /// Loads configuration from `path` (optional) and an environment map.
    ///
    /// `env` replaces the process environment when given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or a value has the wrong type.
    pub fn from_sources(
        path: &str,
        env: Option<HashMap<String, String>>,
        fallback_api_key: Option<String>,
    ) -> Result<Self, config::ConfigError> {
        let mut config: Self = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        if config.model.api_key.trim().is_empty()
            && let Some(key) = fallback_api_key
        {
            config.model.api_key = key;
        }
        Ok(config)
    }

    /// Builds the control-loop configuration.
    #[must_use]
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            system_prompt: self.agent.system_prompt.clone(),
            max_iterations: self.agent.max_iterations,
            temperature: Some(self.model.temperature),
            max_tokens: self.model.max_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = AppConfig::from_sources("does-not-exist.toml", env(&[]), None).expect("load");
        assert_eq!(config.server.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.model.max_tokens, 1024);
        assert_eq!(config.model.temperature, 0.0);
        assert_eq!(config.model.max_retries, 2);
        assert_eq!(config.market.timeout_secs, 10);
        assert_eq!(config.agent.max_iterations, 10);
        assert!(config.agent.eager_init);
        assert_eq!(config.stream.chunk_words, 4);
        assert_eq!(config.stream.chunk_delay_ms, 50);
        assert!(config.model.api_key.is_empty());
    }

    #[test]
    fn environment_overrides_nested_values() {
        let config = AppConfig::from_sources(
            "does-not-exist.toml",
            env(&[
                ("TICKER_AGENT__SERVER__BIND_ADDR", "127.0.0.1:9000"),
                ("TICKER_AGENT__AGENT__MAX_ITERATIONS", "4"),
                ("TICKER_AGENT__AGENT__EAGER_INIT", "false"),
                ("TICKER_AGENT__STREAM__CHUNK_DELAY_MS", "0"),
            ]),
            None,
        )
        .expect("load");
        assert_eq!(config.server.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.agent.max_iterations, 4);
        assert!(!config.agent.eager_init);
        assert_eq!(config.stream.chunk_delay_ms, 0);
    }

    #[test]
    fn api_key_falls_back_to_anthropic_variable() {
        let config =
            AppConfig::from_sources("does-not-exist.toml", env(&[]), Some("sk-fallback".to_string()))
                .expect("load");
        assert_eq!(config.model.api_key, "sk-fallback");
        assert_eq!(config.model.anthropic_config().api_key, "sk-fallback");
    }

    #[test]
    fn file_values_are_read() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("tempfile");
        writeln!(
            file,
            "[model]\napi_key = \"sk-file\"\nmodel_id = \"claude-test\"\n\n[stream]\nchunk_words = 6"
        )
        .expect("write");

        let path = file.path().to_str().expect("utf-8 path").to_string();
        let config =
            AppConfig::from_sources(&path, env(&[]), Some("sk-fallback".to_string())).expect("load");
        assert_eq!(config.model.api_key, "sk-file");
        assert_eq!(config.model.model_id, "claude-test");
        assert_eq!(config.stream.chunk_words, 6);
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let model = ModelConfig {
            api_key: "sk-secret".to_string(),
            ..ModelConfig::default()
        };
        let rendered = format!("{model:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn agent_config_mirrors_settings() {
        let config = AppConfig::default();
        let agent = config.agent_config();
        assert_eq!(agent.max_iterations, 10);
        assert_eq!(agent.temperature, Some(0.0));
        assert_eq!(agent.system_prompt, DEFAULT_SYSTEM_PROMPT);
    }
}
