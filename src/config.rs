//! TOML configuration.
//!
//! Every section is optional: a missing file or a missing table falls back
//! to the defaults the backend ships with (`http://localhost:8000`, project
//! 1 for enterprise mode, project 2 for personal mode).
//!
//! ```toml
//! [backend]
//! base_url = "http://localhost:8000"
//! # timeout_secs = 60
//!
//! [projects]
//! enterprise = 1
//! personal = 2
//!
//! [ingest]
//! chunk_size = 800
//! overlap_size = 100
//!
//! [chat]
//! answer_limit = 4
//!
//! [state]
//! path = "./data/qwanza.sqlite"
//! ```
//!
//! The `RAG_API_BASE_URL` environment variable overrides `backend.base_url`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `[backend].base_url`.
pub const BASE_URL_ENV: &str = "RAG_API_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub projects: ProjectsConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub state: StateConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout. Unset means requests may wait forever.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProjectsConfig {
    #[serde(default = "default_enterprise_project")]
    pub enterprise: u64,
    #[serde(default = "default_personal_project")]
    pub personal: u64,
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            enterprise: default_enterprise_project(),
            personal: default_personal_project(),
        }
    }
}

fn default_enterprise_project() -> u64 {
    1
}
fn default_personal_project() -> u64 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
    #[serde(default = "default_overlap_size")]
    pub overlap_size: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap_size: default_overlap_size(),
        }
    }
}

fn default_chunk_size() -> u32 {
    800
}
fn default_overlap_size() -> u32 {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_answer_limit")]
    pub answer_limit: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            answer_limit: default_answer_limit(),
        }
    }
}

fn default_answer_limit() -> u32 {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct StateConfig {
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from("./data/qwanza.sqlite")
}

impl Config {
    /// Defaults for every section, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Apply `RAG_API_BASE_URL` if it is set and non-empty.
    pub fn apply_env(mut self) -> Self {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.backend.base_url = url.trim().to_string();
            }
        }
        self
    }

    fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            anyhow::bail!("backend.base_url must not be empty");
        }
        if !self.backend.base_url.starts_with("http://")
            && !self.backend.base_url.starts_with("https://")
        {
            anyhow::bail!(
                "backend.base_url must start with http:// or https:// (got '{}')",
                self.backend.base_url
            );
        }
        if self.backend.timeout_secs == Some(0) {
            anyhow::bail!("backend.timeout_secs must be > 0 when set");
        }
        if self.ingest.chunk_size == 0 {
            anyhow::bail!("ingest.chunk_size must be > 0");
        }
        if self.ingest.overlap_size >= self.ingest.chunk_size {
            anyhow::bail!("ingest.overlap_size must be smaller than ingest.chunk_size");
        }
        if self.chat.answer_limit == 0 {
            anyhow::bail!("chat.answer_limit must be >= 1");
        }
        if self.projects.enterprise == self.projects.personal {
            anyhow::bail!("projects.enterprise and projects.personal must differ");
        }
        Ok(())
    }
}

/// Parse configuration from TOML text and validate it.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    let config = config.apply_env();
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path`. A missing file yields [`Config::minimal`].
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        let config = Config::minimal().apply_env();
        config.validate()?;
        return Ok(config);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}
