//! Persisted RAG settings.
//!
//! The provider/model names survive restarts by living in the state
//! database under the `ragConfig` key. A missing or unreadable entry falls
//! back to [`RagConfig::default`].

use anyhow::{Context, Result};
use std::path::Path;

use crate::db;
use crate::models::RagConfig;

/// Key the RAG configuration is stored under.
pub const RAG_CONFIG_KEY: &str = "ragConfig";

pub async fn load_rag_config(state_path: &Path) -> Result<RagConfig> {
    let pool = db::connect(state_path).await?;
    let raw = db::get(&pool, RAG_CONFIG_KEY).await?;
    pool.close().await;

    Ok(match raw {
        Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "stored ragConfig is unreadable, using defaults");
            RagConfig::default()
        }),
        None => RagConfig::default(),
    })
}

pub async fn save_rag_config(state_path: &Path, config: &RagConfig) -> Result<()> {
    let json = serde_json::to_string(config).context("Failed to serialize ragConfig")?;
    let pool = db::connect(state_path).await?;
    db::set(&pool, RAG_CONFIG_KEY, &json).await?;
    pool.close().await;
    Ok(())
}

/// CLI entry point for `settings show`.
pub async fn run_show(state_path: &Path) -> Result<()> {
    let cfg = load_rag_config(state_path).await?;
    print_rag_config(&cfg);
    Ok(())
}

/// CLI entry point for `settings set KEY VALUE`.
pub async fn run_set(state_path: &Path, key: &str, value: &str) -> Result<()> {
    let mut cfg = load_rag_config(state_path).await?;
    cfg.set(key, value)?;
    save_rag_config(state_path, &cfg).await?;
    print_rag_config(&cfg);
    Ok(())
}

pub fn print_rag_config(cfg: &RagConfig) {
    println!("{:<20} {}", "embedding_provider", cfg.embedding_provider);
    println!("{:<20} {}", "embedding_model", cfg.embedding_model);
    println!("{:<20} {}", "text_provider", cfg.text_provider);
    println!("{:<20} {}", "text_model", cfg.text_model);
}
