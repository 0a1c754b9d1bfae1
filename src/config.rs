//! Configuration management for slide_agent.
//!
//! Configuration can be set via environment variables:
//! - `OPENAI_API_KEY` - Required. API key for the chat-completions endpoint.
//! - `OPENAI_BASE_URL` - Optional. Endpoint base URL. Defaults to `https://api.openai.com/v1`.
//! - `DEFAULT_MODEL` - Optional. The model to drive the agent with. Defaults to `gpt-4o`.
//! - `TEMPERATURE` - Optional. Sampling temperature. Defaults to `0.3`.
//! - `MAX_TOKENS` - Optional. Completion token cap per step. Defaults to `2048`.
//! - `MAX_STEPS` - Optional. Maximum agent inference steps per run. Defaults to `10`.
//! - `WORKSPACE_PATH` - Optional. Directory presentations are written to.
//!   Defaults to the current directory.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `PEXELS_API_KEY` - Optional. Enables the `search_image` tool.
//! - `REQUEST_TIMEOUT_SECS` - Optional. HTTP timeout for model and image requests.
//!   Defaults to `120`.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_STEPS: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Sampling parameters sent with every inference step.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 2048,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat-completions API key
    pub api_key: String,

    /// Chat-completions endpoint base URL
    pub base_url: String,

    /// Model identifier
    pub default_model: String,

    pub model_params: ModelParams,

    /// Directory the presentation tools write into and discovery scans
    pub workspace_path: PathBuf,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Step budget for the agent loop
    pub max_steps: usize,

    /// Pexels key for image search (tool degrades gracefully without it)
    pub pexels_api_key: Option<String>,

    /// Timeout applied to outbound HTTP requests
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENAI_API_KEY` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;

        let base_url = std::env::var("OPENAI_BASE_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let default_model =
            std::env::var("DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let defaults = ModelParams::default();
        let model_params = ModelParams {
            temperature: parse_env("TEMPERATURE", defaults.temperature)?,
            max_tokens: parse_env("MAX_TOKENS", defaults.max_tokens)?,
        };

        let workspace_path = std::env::var("WORKSPACE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_env("PORT", 3000u16)?;

        let max_steps = parse_env("MAX_STEPS", DEFAULT_MAX_STEPS)?;
        if max_steps == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_STEPS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let pexels_api_key = std::env::var("PEXELS_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let request_timeout = Duration::from_secs(parse_env("REQUEST_TIMEOUT_SECS", 120u64)?);

        Ok(Self {
            api_key,
            base_url,
            default_model,
            model_params,
            workspace_path,
            host,
            port,
            max_steps,
            pexels_api_key,
            request_timeout,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, default_model: String, workspace_path: PathBuf) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model,
            model_params: ModelParams::default(),
            workspace_path,
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_steps: DEFAULT_MAX_STEPS,
            pexels_api_key: None,
            request_timeout: Duration::from_secs(120),
        }
    }

    /// Override the step budget.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_source_defaults() {
        let config = Config::new("k".into(), "gpt-4o".into(), PathBuf::from("/tmp"));
        assert_eq!(config.max_steps, 10);
        assert_eq!(config.model_params.temperature, 0.3);
        assert_eq!(config.model_params.max_tokens, 2048);
        assert!(config.pexels_api_key.is_none());
    }

    #[test]
    fn parse_env_falls_back_to_default_when_unset() {
        let value: usize = parse_env("SLIDE_AGENT_TEST_SURELY_UNSET_VAR", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn with_max_steps_overrides_budget() {
        let config = Config::new("k".into(), "m".into(), PathBuf::from(".")).with_max_steps(3);
        assert_eq!(config.max_steps, 3);
    }
}
