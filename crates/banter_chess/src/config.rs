//! Game and LLM configuration.
//!
//! Precedence, lowest first: built-in defaults, TOML file, environment,
//! command-line overrides (applied by the binary through the setters).

use crate::llm_client::{LlmConfig, LlmProvider, REDACTED};
use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, instrument};

/// Turn-loop settings.
#[derive(Debug, Clone, PartialEq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct GameSettings {
    /// Ceiling on accepted moves (plies) before the game is stopped.
    #[serde(default = "default_max_turns")]
    max_turns: u32,

    /// Solicitation attempts per turn before the side forfeits.
    #[serde(default = "default_max_nested_turns")]
    max_nested_turns: u32,

    /// Wall-clock bound on a single agent solicitation.
    #[serde(default = "default_agent_timeout_secs")]
    agent_timeout_secs: u64,

    /// Relay each side's commentary to its opponent.
    #[serde(default = "default_relay_commentary")]
    relay_commentary: bool,

    /// Custom starting position.
    #[serde(default)]
    start_fen: Option<String>,
}

fn default_max_turns() -> u32 {
    50
}

fn default_max_nested_turns() -> u32 {
    5
}

fn default_agent_timeout_secs() -> u64 {
    120
}

fn default_relay_commentary() -> bool {
    true
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            max_nested_turns: default_max_nested_turns(),
            agent_timeout_secs: default_agent_timeout_secs(),
            relay_commentary: default_relay_commentary(),
            start_fen: None,
        }
    }
}

/// LLM provider settings shared by both LLM-backed seats.
///
/// `Debug` redacts the API key.
#[derive(Clone, PartialEq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct LlmSettings {
    /// Provider (openai or anthropic).
    #[serde(default = "default_provider")]
    provider: LlmProvider,

    /// Model name (e.g., "gpt-4-turbo", "claude-3-5-sonnet-latest").
    #[serde(default = "default_model")]
    model: String,

    /// API key. Usually supplied through the environment.
    #[serde(default)]
    api_key: Option<String>,

    /// Alternative API root for OpenAI-compatible servers.
    #[serde(default)]
    base_url: Option<String>,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    temperature: f32,

    /// Maximum tokens per reply.
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
}

fn default_provider() -> LlmProvider {
    LlmProvider::OpenAI
}

fn default_model() -> String {
    "gpt-4-turbo".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| REDACTED))
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl LlmSettings {
    /// Builds the client configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when no API key is configured.
    #[instrument(skip(self), fields(provider = %self.provider, model = %self.model))]
    pub fn create_llm_config(&self) -> Result<LlmConfig, ConfigError> {
        let api_key = self.api_key.clone().ok_or_else(|| {
            ConfigError::new(
                "LLM API key is required. Set LLM_API_KEY (or the provider's key variable) or use --api-key",
            )
        })?;

        Ok(LlmConfig::new(
            self.provider,
            api_key,
            self.model.clone(),
            self.max_tokens,
            self.temperature,
        )
        .with_base_url(self.base_url.clone()))
    }
}

/// Complete configuration file.
#[derive(Debug, Clone, Default, PartialEq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct ChessConfig {
    /// Turn-loop settings.
    #[serde(default)]
    game: GameSettings,

    /// LLM settings.
    #[serde(default)]
    llm: LlmSettings,
}

impl ChessConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(model = %config.llm.model, "Config loaded successfully");
        Ok(config)
    }

    /// Defaults, then `path` if it exists, then the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file or an environment value is invalid.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            Some(path) => {
                info!(
                    "Config file not found at {}, using defaults",
                    path.display()
                );
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable holds an unparseable value.
    #[instrument(skip(self, lookup))]
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = parse_var(&lookup, "LLM_PROVIDER")? {
            self.llm.provider = provider;
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(key) = lookup("LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if self.llm.api_key.is_none() {
            let provider_key = match self.llm.provider {
                LlmProvider::OpenAI => "OPENAI_API_KEY",
                LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
            };
            if let Some(key) = lookup(provider_key) {
                debug!(variable = provider_key, "Using provider API key variable");
                self.llm.api_key = Some(key);
            }
        }
        if let Some(url) = lookup("LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Some(temperature) = parse_var(&lookup, "LLM_TEMPERATURE")? {
            self.llm.temperature = temperature;
        }
        if let Some(max_tokens) = parse_var(&lookup, "LLM_MAX_TOKENS")? {
            self.llm.max_tokens = max_tokens;
        }
        if let Some(max_turns) = parse_var(&lookup, "GAME_MAX_TURNS")? {
            self.game.max_turns = max_turns;
        }
        if let Some(max_nested) = parse_var(&lookup, "GAME_MAX_NESTED_TURNS")? {
            self.game.max_nested_turns = max_nested;
        }
        if let Some(timeout) = parse_var(&lookup, "GAME_AGENT_TIMEOUT_SECS")? {
            self.game.agent_timeout_secs = timeout;
        }
        Ok(())
    }

    /// Checks bounds that would otherwise make a game unplayable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first offending setting.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.game.max_turns == 0 {
            return Err(ConfigError::new("game.max_turns must be at least 1"));
        }
        if self.game.max_nested_turns == 0 {
            return Err(ConfigError::new("game.max_nested_turns must be at least 1"));
        }
        if self.game.agent_timeout_secs == 0 {
            return Err(ConfigError::new("game.agent_timeout_secs must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::new("llm.temperature must be between 0 and 2"));
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::new(format!("Invalid value for {}: '{}' ({})", key, raw, e))),
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
