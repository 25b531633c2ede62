//! # Qwanza CLI (`qwanza`)
//!
//! Terminal client for a retrieval-augmented generation backend: upload
//! documents, have them chunked and indexed, and chat with the answer
//! endpoint in either enterprise or personal mode.
//!
//! ## Usage
//!
//! ```bash
//! qwanza --config ./config/qwanza.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `qwanza chat` | Interactive chat with sessions and slash commands |
//! | `qwanza ask "<question>"` | One-shot question, prints the answer |
//! | `qwanza upload <files>...` | Upload, process and index documents |
//! | `qwanza process` | Ask the backend to (re)chunk uploaded files |
//! | `qwanza push` | Push processed chunks into the vector index |
//! | `qwanza assets list` | List enterprise project documents |
//! | `qwanza assets upload <file>` | Add a document to the enterprise project |
//! | `qwanza assets delete <name>` | Delete a document from the enterprise project |
//! | `qwanza settings show` | Show persisted RAG settings |
//! | `qwanza settings set <key> <value>` | Change a RAG setting |
//!
//! ## Examples
//!
//! ```bash
//! # Chat against the shared enterprise index
//! qwanza chat
//!
//! # Index two personal documents, then ask about them
//! qwanza upload --mode personal ./contract.pdf ./notes.txt
//! qwanza ask --mode personal "When does the contract end?"
//!
//! # Point at another backend for one run
//! RAG_API_BASE_URL=http://rag.internal:8000 qwanza assets list
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use qwanza::models::ChatMode;
use qwanza::notify::{Notifier, NotifyMode};
use qwanza::{commands, config, settings};

/// Qwanza: chat with your documents through a RAG backend.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means defaults (`http://localhost:8000`, project 1
/// for enterprise mode, project 2 for personal mode).
#[derive(Parser)]
#[command(
    name = "qwanza",
    about = "Qwanza: chat with your documents through a RAG backend",
    version,
    long_about = "Qwanza uploads documents to a retrieval-augmented generation backend, \
    has them chunked and indexed, and lets you chat with the answer endpoint in \
    enterprise (shared index) or personal (your own documents) mode."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/qwanza.toml")]
    config: PathBuf,

    /// More diagnostics on stderr (-v debug, -vv trace). `RUST_LOG` wins when set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Notification output: `human`, `json` or `off`.
    /// Defaults to human on a terminal, JSON lines otherwise.
    #[arg(long, global = true, value_parser = NotifyMode::parse)]
    notify: Option<NotifyMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat.
    ///
    /// Type a message to ask a question in the active conversation, or a
    /// slash command (`/help`) to manage conversations, documents and
    /// settings.
    Chat {
        /// Chat mode to start in.
        #[arg(long, default_value = "enterprise")]
        mode: ChatMode,
    },

    /// Ask one question and print the answer.
    Ask {
        /// The question.
        text: String,

        #[arg(long, default_value = "enterprise")]
        mode: ChatMode,

        /// Number of retrieved chunks the backend may use.
        /// Defaults to `[chat].answer_limit`.
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Upload, process and index documents, one file at a time.
    ///
    /// A file that fails at any step is reported and skipped; the
    /// remaining files still run.
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(long, default_value = "personal")]
        mode: ChatMode,
    },

    /// Ask the backend to chunk uploaded files.
    Process {
        #[arg(long, default_value = "enterprise")]
        mode: ChatMode,

        /// Only process this file id (as returned by upload).
        #[arg(long)]
        file_id: Option<String>,

        /// Drop existing chunks of the project first.
        #[arg(long)]
        reset: bool,
    },

    /// Push processed chunks into the project's vector index.
    Push {
        #[arg(long, default_value = "enterprise")]
        mode: ChatMode,

        /// Recreate the index collection first.
        #[arg(long)]
        reset: bool,
    },

    /// Manage the enterprise project's documents.
    Assets {
        #[command(subcommand)]
        action: AssetsAction,
    },

    /// Show or change persisted RAG settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum AssetsAction {
    /// List documents of the enterprise project.
    List,
    /// Upload, process and index one document, then list again.
    Upload { file: PathBuf },
    /// Delete a document by asset name, then list again.
    Delete { name: String },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    /// Keys: embedding_provider, embedding_model, text_provider, text_model.
    Set { key: String, value: String },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "qwanza=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;
    let notifier: Arc<dyn Notifier> = Arc::from(
        cli.notify
            .unwrap_or_else(NotifyMode::default_for_tty)
            .notifier(),
    );

    match cli.command {
        Commands::Chat { mode } => {
            commands::run_chat(cfg, mode, notifier).await?;
        }
        Commands::Ask { text, mode, limit } => {
            commands::run_ask(&cfg, mode, &text, limit).await?;
        }
        Commands::Upload { files, mode } => {
            commands::run_upload(cfg, mode, &files, notifier).await?;
        }
        Commands::Process {
            mode,
            file_id,
            reset,
        } => {
            commands::run_process(&cfg, mode, file_id, reset).await?;
        }
        Commands::Push { mode, reset } => {
            commands::run_push(&cfg, mode, reset).await?;
        }
        Commands::Assets { action } => match action {
            AssetsAction::List => {
                commands::run_assets_list(cfg, notifier).await?;
            }
            AssetsAction::Upload { file } => {
                commands::run_assets_upload(cfg, &file, notifier).await?;
            }
            AssetsAction::Delete { name } => {
                commands::run_assets_delete(cfg, &name, notifier).await?;
            }
        },
        Commands::Settings { action } => match action {
            SettingsAction::Show => {
                settings::run_show(&cfg.state.path).await?;
            }
            SettingsAction::Set { key, value } => {
                settings::run_set(&cfg.state.path, &key, &value).await?;
            }
        },
    }

    Ok(())
}
