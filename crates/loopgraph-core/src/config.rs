use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LoopgraphError, Result};

/// Top-level loopgraph configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum node executions per run before the run fails.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_max_steps() -> usize { 100 }
fn default_bind() -> String { "127.0.0.1:8000".to_string() }
fn default_log_filter() -> String { "loopgraph=info,warn".to_string() }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| LoopgraphError::ConfigNotFound(path.display().to_string()))?;

        Self::parse(&content)
    }

    /// Parse config from TOML text, with env var expansion.
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        let config: Self =
            toml::from_str(&expanded).map_err(|e| LoopgraphError::Config(e.to_string()))?;

        if config.engine.max_steps == 0 {
            return Err(LoopgraphError::Config(
                "engine.max_steps must be at least 1".into(),
            ));
        }
        Ok(config)
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                // Keep original if env var not set
                Err(_) => result.push_str(&format!("${{{}}}", var_name)),
            }
        } else {
            result.push(c);
        }
    }
    result
}
