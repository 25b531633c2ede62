//! CLI entry points.
//!
//! Each `run_*` function backs one `qwanza` subcommand: it builds the
//! clients from config, runs the workflow and prints a plain-text summary
//! on stdout. Failures come back as `anyhow` errors so the process exits
//! non-zero.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app::{App, ModeClients};
use crate::chat::SendOutcome;
use crate::client::{ProcessRequest, RagBackend, RagClient};
use crate::config::Config;
use crate::models::ChatMode;
use crate::notify::{NoNotify, Notifier};
use crate::repl;

fn client_for(config: &Config, mode: ChatMode) -> Result<RagClient> {
    let project = match mode {
        ChatMode::Enterprise => config.projects.enterprise,
        ChatMode::Personal => config.projects.personal,
    };
    RagClient::from_config(&config.backend, project)
}

fn build_app(config: Config, mode: ChatMode, notifier: Arc<dyn Notifier>) -> Result<App> {
    let clients = ModeClients::from_config(&config)?;
    Ok(App::new(config, clients, notifier).with_mode(mode))
}

/// `qwanza chat`
pub async fn run_chat(config: Config, mode: ChatMode, notifier: Arc<dyn Notifier>) -> Result<()> {
    let mut app = build_app(config, mode, notifier)?;
    if let Err(e) = app.load_rag_config().await {
        tracing::warn!(error = %e, "could not load RAG settings, using defaults");
    }

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    repl::run_loop(&mut app, stdin.lock(), stdout.lock()).await
}

/// `qwanza ask`
pub async fn run_ask(config: &Config, mode: ChatMode, text: &str, limit: Option<u32>) -> Result<()> {
    let mut config = config.clone();
    if let Some(limit) = limit {
        if limit == 0 {
            bail!("--limit must be >= 1");
        }
        config.chat.answer_limit = limit;
    }

    let mut app = build_app(config, mode, Arc::new(NoNotify))?;
    app.new_session();
    match app.send_message(text).await {
        SendOutcome::Answered(reply) => {
            println!("{}", reply.content);
            Ok(())
        }
        SendOutcome::Failed(e) => bail!("answer failed: {}", e),
        SendOutcome::Ignored => bail!("question must not be empty"),
        SendOutcome::SessionCreated(_) => bail!("no active session"),
    }
}

/// `qwanza upload`
pub async fn run_upload(
    config: Config,
    mode: ChatMode,
    files: &[PathBuf],
    notifier: Arc<dyn Notifier>,
) -> Result<()> {
    let mut app = build_app(config, mode, notifier)?;
    let report = app.upload_documents(files).await;

    println!("upload ({} mode, project {})", app.mode(), app.project_id());
    for file in &report.files {
        match &file.result {
            Ok(summary) => println!(
                "  {:<10} {}  ({} chunks, {} indexed)",
                file.status(),
                file.name,
                summary.inserted_chunks,
                summary.inserted_items
            ),
            Err(e) => println!("  {:<10} {}  ({})", file.status(), file.name, e),
        }
    }
    println!("  processed: {}", report.processed());
    println!("  failed: {}", report.failed());

    if report.failed() > 0 {
        bail!(
            "{} of {} file(s) failed",
            report.failed(),
            report.files.len()
        );
    }
    println!("ok");
    Ok(())
}

/// `qwanza process`
pub async fn run_process(
    config: &Config,
    mode: ChatMode,
    file_id: Option<String>,
    reset: bool,
) -> Result<()> {
    let client = client_for(config, mode)?;
    let request = ProcessRequest {
        chunk_size: config.ingest.chunk_size,
        overlap_size: config.ingest.overlap_size,
        do_reset: u8::from(reset),
        file_id,
    };
    let res = client.process_files(&request).await?;
    println!("process (project {})", client.project_id());
    println!("  signal: {}", res.signal);
    println!("  processed files: {}", res.processed_files);
    println!("  inserted chunks: {}", res.inserted_chunks);
    Ok(())
}

/// `qwanza push`
pub async fn run_push(config: &Config, mode: ChatMode, reset: bool) -> Result<()> {
    let client = client_for(config, mode)?;
    let res = client.push_to_index(reset).await?;
    println!("push (project {})", client.project_id());
    println!("  signal: {}", res.signal);
    println!("  inserted items: {}", res.inserted_items_count);
    Ok(())
}

/// `qwanza assets list`
pub async fn run_assets_list(config: Config, notifier: Arc<dyn Notifier>) -> Result<()> {
    let mut app = build_app(config, ChatMode::Enterprise, notifier)?;
    if !app.open_assets().await {
        bail!("could not load documents");
    }
    repl::print_assets(&app, &mut std::io::stdout().lock())
}

/// `qwanza assets upload`
pub async fn run_assets_upload(
    config: Config,
    file: &Path,
    notifier: Arc<dyn Notifier>,
) -> Result<()> {
    let mut app = build_app(config, ChatMode::Enterprise, notifier)?;
    if let Err(e) = app.upload_asset(file).await {
        bail!("{}", e);
    }
    repl::print_assets(&app, &mut std::io::stdout().lock())
}

/// `qwanza assets delete`
pub async fn run_assets_delete(
    config: Config,
    name: &str,
    notifier: Arc<dyn Notifier>,
) -> Result<()> {
    let mut app = build_app(config, ChatMode::Enterprise, notifier)?;
    if !app.delete_asset(name).await {
        bail!("could not delete {}", name);
    }
    repl::print_assets(&app, &mut std::io::stdout().lock())
}
