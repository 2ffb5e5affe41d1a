// src/config/env.rs
// Environment-based backend configuration - resolved once at startup

use crate::error::{LingshuError, Result};
use std::time::Duration;
use tracing::{debug, info};

/// Default request timeout for backend calls
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Names of the environment variables that configure one backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendEnv {
    pub label: &'static str,
    pub url: &'static str,
    pub api_key: &'static str,
    pub model: &'static str,
    pub timeout: &'static str,
}

impl BackendEnv {
    /// Backend serving the medical model behind the tool server
    pub const TOOL_SERVER: BackendEnv = BackendEnv {
        label: "lingshu",
        url: "LINGSHU_SERVER_URL",
        api_key: "LINGSHU_SERVER_API",
        model: "LINGSHU_MODEL",
        timeout: "LINGSHU_TIMEOUT_SECS",
    };

    /// Independent backend the client chains tool output through
    pub const CHAIN: BackendEnv = BackendEnv {
        label: "chain",
        url: "LLM_SERVER_URL",
        api_key: "LLM_SERVER_API",
        model: "LLM_MODEL",
        timeout: "LLM_TIMEOUT_SECS",
    };
}

/// Connection settings for one OpenAI-compatible chat-completion backend.
///
/// Built once, then shared read-only (`Arc<BackendConfig>`) by every request.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: String,
    pub model_name: String,
    pub timeout: Duration,
}

// Keep the API key out of logs
impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model_name", &self.model_name)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl BackendConfig {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model_name: model_name.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load from process environment; fails fast if a required variable is absent
    pub fn from_env(vars: &BackendEnv) -> Result<Self> {
        Self::from_lookup(vars, |name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(vars: &BackendEnv, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let base_url = read(vars.url);
        let api_key = read(vars.api_key);
        let model_name = read(vars.model);

        let missing: Vec<&str> = [
            (vars.url, base_url.is_none()),
            (vars.api_key, api_key.is_none()),
            (vars.model, model_name.is_none()),
        ]
        .into_iter()
        .filter(|(_, absent)| *absent)
        .map(|(name, _)| name)
        .collect();

        let (Some(base_url), Some(api_key), Some(model_name)) = (base_url, api_key, model_name)
        else {
            return Err(LingshuError::Config(format!(
                "{} backend is missing required settings: {}",
                vars.label,
                missing.join(", ")
            )));
        };

        let timeout = match read(vars.timeout) {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    LingshuError::Config(format!(
                        "{} must be a whole number of seconds, got '{}'",
                        vars.timeout, raw
                    ))
                })?;
                if secs == 0 {
                    return Err(LingshuError::Config(format!("{} must be greater than zero", vars.timeout)));
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(LingshuError::Config(format!(
                "{} must be an http(s) URL, got '{}'",
                vars.url, base_url
            )));
        }

        let config = Self {
            base_url,
            api_key,
            model_name,
            timeout,
        };
        info!(
            backend = vars.label,
            base_url = %config.base_url,
            model = %config.model_name,
            timeout_secs = config.timeout.as_secs(),
            "Loaded backend configuration"
        );
        Ok(config)
    }

    /// Full URL of the chat-completions endpoint
    pub fn completions_url(&self) -> String {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!(url = %url, "Resolved completions endpoint");
        url
    }
}

/// Load `.env` files: global `~/.lingshu/.env` first, then the working directory
pub fn load_dotenv() {
    if let Some(home) = dirs::home_dir() {
        let _ = dotenvy::from_path(home.join(".lingshu/.env"));
    }
    let _ = dotenvy::dotenv();
}
