//! Session settings (YAML file or in-code defaults)
//!
//! Loaded from ~/.config/askdb/config.yaml when present; every field has a
//! default so a missing file or a partial file is fine.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Parse(String),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Runtime settings for a session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Model identifier, optionally provider-prefixed
    pub model: String,
    /// Maximum output size bound per engine submission
    pub max_tokens: u32,
    /// Temperature for response generation
    pub temperature: Option<f32>,
    /// Maximum reasoning/tool rounds per query; exhaustion fails the query
    pub max_rounds: u32,
    /// Time bound on one engine submission; None = unbounded
    pub engine_timeout_secs: Option<u64>,
    /// Time bound on one tool invocation; None = unbounded
    pub tool_timeout_secs: Option<u64>,
    /// Command used to spawn the tool-execution process
    pub server_command: String,
    /// Arguments for the tool-execution process
    pub server_args: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: "anthropic/claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 4096,
            temperature: None,
            max_rounds: 16,
            engine_timeout_secs: Some(120),
            tool_timeout_secs: Some(60),
            server_command: "python".to_string(),
            server_args: vec!["server.py".to_string()],
        }
    }
}

impl Settings {
    /// Default config file path (~/.config/askdb/config.yaml)
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
        });
        config_dir.join("askdb").join("config.yaml")
    }

    /// Load settings from the default path; a missing file yields defaults
    pub fn load() -> SettingsResult<Self> {
        Self::from_file(Self::default_path())
    }

    /// Load settings from a specific file; a missing file yields defaults
    pub fn from_file(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Engine submission time bound
    pub fn engine_timeout(&self) -> Option<Duration> {
        self.engine_timeout_secs.map(Duration::from_secs)
    }

    /// Tool invocation time bound
    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }
}
