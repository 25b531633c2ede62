//! Core data models shared by the workflows.
//!
//! Documents, sessions and messages live only in process memory. The RAG
//! configuration is the one record that is persisted (see [`crate::settings`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which backend project the chat and ingestion workflows talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// Shared document index, managed through the asset panel.
    #[default]
    Enterprise,
    /// Per-user documents uploaded from the chat session.
    Personal,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Enterprise => "enterprise",
            ChatMode::Personal => "personal",
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enterprise" | "e" => Ok(ChatMode::Enterprise),
            "personal" | "p" => Ok(ChatMode::Personal),
            other => Err(format!(
                "unknown mode '{}': expected enterprise or personal",
                other
            )),
        }
    }
}

/// Lifecycle of a locally tracked document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploading,
    Processed,
    Error,
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentStatus::Uploading => "uploading",
            DocumentStatus::Processed => "processed",
            DocumentStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// A document the user handed to the ingestion workflow.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub status: DocumentStatus,
}

/// An asset as listed by the backend for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub asset_id: i64,
    pub asset_name: String,
    pub asset_size: u64,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Asset {
    /// Size in kilobytes, rounded to the nearest integer.
    pub fn size_kb(&self) -> u64 {
        (self.asset_size + 512) / 1024
    }
}

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Bot,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub author: Author,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(author: Author, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            author,
            timestamp: Utc::now(),
        }
    }
}

/// Summary row for a chat session. The transcript itself is kept by
/// [`crate::chat::ChatState`].
#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub last_message: String,
    pub timestamp: DateTime<Utc>,
    pub message_count: u32,
}

/// Provider and model names shown in the settings panel.
///
/// Stored as-is; nothing checks them against what the backend supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagConfig {
    pub embedding_provider: String,
    pub embedding_model: String,
    pub text_provider: String,
    pub text_model: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            embedding_provider: "openai".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            text_provider: "openai".to_string(),
            text_model: "gpt-4o-mini".to_string(),
        }
    }
}

impl RagConfig {
    /// Set one field by its settings key. Accepts both `snake_case` and
    /// `camelCase` spellings.
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let slot = match key {
            "embedding_provider" | "embeddingProvider" => &mut self.embedding_provider,
            "embedding_model" | "embeddingModel" => &mut self.embedding_model,
            "text_provider" | "textProvider" => &mut self.text_provider,
            "text_model" | "textModel" => &mut self.text_model,
            other => anyhow::bail!(
                "unknown setting '{}'. Expected one of: embedding_provider, embedding_model, text_provider, text_model",
                other
            ),
        };
        *slot = value.to_string();
        Ok(())
    }
}
