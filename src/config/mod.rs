// Workflow Bridge — HTTP gateway to an external multi-agent workflow runner
// License: Apache-2.0

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("home directory not found")]
    NoHomeDir,
}

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory that relative workflow references are resolved against.
    #[serde(default = "default_workflows_dir")]
    pub workflows_dir: String,
    /// Directory the runner writes its artifacts into. Created at start-up.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            workflows_dir: default_workflows_dir(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_workflows_dir() -> String {
    "workflows".to_string()
}
fn default_output_dir() -> String {
    "WareHouse".to_string()
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub deepseek_api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            gemini_api_key: None,
            deepseek_api_key: None,
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunnerKind {
    #[default]
    Disabled,
    Http,
    Command,
}

impl std::fmt::Display for RunnerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunnerKind::Disabled => write!(f, "disabled"),
            RunnerKind::Http => write!(f, "http"),
            RunnerKind::Command => write!(f, "command"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunnerConfig {
    #[serde(default)]
    pub kind: RunnerKind,
    /// Base URL of the orchestration runtime (http runner).
    #[serde(default)]
    pub url: String,
    /// Program to spawn (command runner).
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a JSON file, falling back to defaults.
    /// Environment overrides are applied in both cases.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_json::from_str(&contents)?
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Config::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides. `lookup` returns the value of a variable,
    /// if set.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Provider credentials use the conventional unprefixed names
        if let Some(v) = lookup("OPENAI_API_KEY") {
            self.credentials.openai_api_key = Some(v);
        }
        if let Some(v) = lookup("GEMINI_API_KEY") {
            self.credentials.gemini_api_key = Some(v);
        }
        if let Some(v) = lookup("DEEPSEEK_API_KEY") {
            self.credentials.deepseek_api_key = Some(v);
        }
        if let Some(v) = lookup("OPENAI_BASE_URL") {
            self.credentials.base_url = v;
        }

        if let Some(v) = lookup("WORKFLOW_BRIDGE_SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("WORKFLOW_BRIDGE_SERVER_PORT") {
            if let Ok(n) = v.parse() {
                self.server.port = n;
            }
        }
        if let Some(v) = lookup("WORKFLOW_BRIDGE_WORKFLOWS_DIR") {
            self.paths.workflows_dir = v;
        }
        if let Some(v) = lookup("WORKFLOW_BRIDGE_OUTPUT_DIR") {
            self.paths.output_dir = v;
        }

        // Setting a runner endpoint implies the matching runner kind
        if let Some(v) = lookup("WORKFLOW_BRIDGE_RUNNER_URL") {
            self.runner.kind = RunnerKind::Http;
            self.runner.url = v;
        }
        if let Some(v) = lookup("WORKFLOW_BRIDGE_RUNNER_COMMAND") {
            self.runner.kind = RunnerKind::Command;
            self.runner.command = v;
        }
    }

    /// Get the default config file path: ~/.workflow-bridge/config.json
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".workflow-bridge").join("config.json"))
    }

    /// Workflows directory as an absolute path (relative to the current
    /// directory when configured relative).
    pub fn workflows_path(&self) -> PathBuf {
        absolutize(&expand_home(&self.paths.workflows_dir))
    }

    pub fn output_path(&self) -> PathBuf {
        absolutize(&expand_home(&self.paths.output_dir))
    }

    /// Create the output directory (and parents) if missing. The runner
    /// writes its artifacts here, so this must succeed before serving.
    pub fn ensure_output_dir(&self) -> Result<PathBuf, std::io::Error> {
        let output = self.output_path();
        std::fs::create_dir_all(&output)?;
        Ok(output)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
