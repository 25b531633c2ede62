//! Interactive chat loop.
//!
//! Lines starting with `/` are commands; anything else is sent to the
//! backend as a chat message in the active session.

use anyhow::Result;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::app::App;
use crate::chat::SendOutcome;
use crate::models::{Author, ChatMode};

pub const HELP: &str = "\
Commands:
  /help                    show this help
  /new                     start a new conversation
  /sessions                list conversations
  /open ID                 switch to a conversation (id prefix is enough)
  /rename ID TITLE         rename a conversation
  /delete ID               delete a conversation and its messages
  /mode enterprise|personal
                           switch chat mode
  /upload PATH...          upload, process and index documents
  /docs                    list uploaded documents
  /rmdoc ID                forget a document locally
  /assets                  list enterprise project documents
  /asset-upload PATH       add a document to the enterprise project
  /asset-delete NAME       delete a document from the enterprise project
  /settings                show RAG settings
  /set KEY VALUE           change a RAG setting
  /quit                    leave
Anything else is sent as a message.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    New,
    Sessions,
    Open(String),
    Rename { id: String, title: String },
    Delete(String),
    Mode(ChatMode),
    Upload(Vec<PathBuf>),
    Docs,
    RemoveDoc(String),
    Assets,
    AssetUpload(PathBuf),
    AssetDelete(String),
    Settings,
    Set { key: String, value: String },
    Quit,
    Say(String),
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Say(line.to_string())));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let need = |what: &str| -> Result<String, String> {
        if args.is_empty() {
            Err(format!("/{} needs {}", name, what))
        } else {
            Ok(args.to_string())
        }
    };

    let cmd = match name {
        "help" | "h" | "?" => Command::Help,
        "new" => Command::New,
        "sessions" | "ls" => Command::Sessions,
        "open" => Command::Open(need("a session id")?),
        "rename" => {
            let args = need("a session id and a title")?;
            match args.split_once(char::is_whitespace) {
                Some((id, title)) if !title.trim().is_empty() => Command::Rename {
                    id: id.to_string(),
                    title: title.trim().to_string(),
                },
                _ => return Err("/rename needs a session id and a title".to_string()),
            }
        }
        "delete" | "rm" => Command::Delete(need("a session id")?),
        "mode" => Command::Mode(need("a mode")?.parse()?),
        "upload" => {
            let args = need("at least one path")?;
            Command::Upload(args.split_whitespace().map(PathBuf::from).collect())
        }
        "docs" => Command::Docs,
        "rmdoc" => Command::RemoveDoc(need("a document id")?),
        "assets" => Command::Assets,
        "asset-upload" => Command::AssetUpload(PathBuf::from(need("a path")?)),
        "asset-delete" => Command::AssetDelete(need("an asset name")?),
        "settings" => Command::Settings,
        "set" => {
            let args = need("a key and a value")?;
            match args.split_once(char::is_whitespace) {
                Some((key, value)) if !value.trim().is_empty() => Command::Set {
                    key: key.to_string(),
                    value: value.trim().to_string(),
                },
                _ => return Err("/set needs a key and a value".to_string()),
            }
        }
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command '/{}', try /help", other)),
    };
    Ok(Some(cmd))
}

/// Resolve a full id or a unique prefix against `ids`.
pub fn resolve_id<'a, I>(ids: I, wanted: &str) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let matches: Vec<&str> = ids.into_iter().filter(|id| id.starts_with(wanted)).collect();
    if matches.iter().any(|m| *m == wanted) {
        return Some(wanted.to_string());
    }
    match matches.as_slice() {
        [only] => Some(only.to_string()),
        _ => None,
    }
}

fn short(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Run the loop until `/quit` or end of input.
pub async fn run_loop<R: BufRead, W: Write>(app: &mut App, input: R, mut out: W) -> Result<()> {
    writeln!(
        out,
        "qwanza: {} mode (project {}). Type /help for commands.",
        app.mode(),
        app.project_id()
    )?;

    for line in input.lines() {
        let line = line?;
        let command = match parse_line(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                writeln!(out, "{}", e)?;
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        handle(app, command, &mut out).await?;
        out.flush()?;
    }
    Ok(())
}

async fn handle<W: Write>(app: &mut App, command: Command, out: &mut W) -> Result<()> {
    match command {
        Command::Help => writeln!(out, "{}", HELP)?,
        Command::New => {
            let id = app.new_session();
            writeln!(out, "new conversation {}", short(&id))?;
        }
        Command::Sessions => {
            if app.chat.sessions().is_empty() {
                writeln!(out, "no conversations yet, use /new")?;
            }
            let current = app.chat.current_session_id().map(str::to_string);
            for s in app.chat.sessions() {
                let marker = if current.as_deref() == Some(s.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                writeln!(
                    out,
                    "{} {}  {:<34} {:>3} msg  {}",
                    marker,
                    short(&s.id),
                    s.title,
                    s.message_count,
                    s.last_message
                )?;
            }
        }
        Command::Open(wanted) => {
            let ids = app.chat.sessions().iter().map(|s| s.id.as_str());
            match resolve_id(ids, &wanted) {
                Some(id) => {
                    if app.select_session(&id) {
                        for m in app.chat.messages() {
                            print_message(out, m.author, &m.content)?;
                        }
                    }
                }
                None => writeln!(out, "no single conversation matches '{}'", wanted)?,
            }
        }
        Command::Rename { id, title } => {
            let ids = app.chat.sessions().iter().map(|s| s.id.as_str());
            match resolve_id(ids, &id) {
                Some(id) => {
                    app.rename_session(&id, &title);
                }
                None => writeln!(out, "no single conversation matches '{}'", id)?,
            }
        }
        Command::Delete(id) => {
            let ids = app.chat.sessions().iter().map(|s| s.id.as_str());
            match resolve_id(ids, &id) {
                Some(id) => {
                    app.delete_session(&id);
                }
                None => writeln!(out, "no single conversation matches '{}'", id)?,
            }
        }
        Command::Mode(mode) => {
            app.switch_mode(mode);
            writeln!(out, "{} mode (project {})", app.mode(), app.project_id())?;
        }
        Command::Upload(paths) => {
            let report = app.upload_documents(&paths).await;
            for file in &report.files {
                writeln!(out, "{:<10} {}", file.status(), file.name)?;
            }
        }
        Command::Docs => {
            if app.documents.is_empty() {
                writeln!(out, "no documents uploaded in this run")?;
            }
            for d in app.documents.list() {
                writeln!(
                    out,
                    "{}  {:<10} {:>8} B  {}",
                    short(&d.id),
                    d.status,
                    d.size,
                    d.name
                )?;
            }
        }
        Command::RemoveDoc(wanted) => {
            let ids = app.documents.list().iter().map(|d| d.id.as_str());
            match resolve_id(ids, &wanted) {
                Some(id) => {
                    app.delete_document(&id);
                }
                None => writeln!(out, "no single document matches '{}'", wanted)?,
            }
        }
        Command::Assets => {
            if app.open_assets().await {
                print_assets(app, out)?;
            }
        }
        Command::AssetUpload(path) => {
            if app.upload_asset(&path).await.is_ok() {
                print_assets(app, out)?;
            }
        }
        Command::AssetDelete(name) => {
            if app.delete_asset(&name).await {
                print_assets(app, out)?;
            }
        }
        Command::Settings => {
            let cfg = app.rag_config();
            writeln!(out, "embedding_provider  {}", cfg.embedding_provider)?;
            writeln!(out, "embedding_model     {}", cfg.embedding_model)?;
            writeln!(out, "text_provider       {}", cfg.text_provider)?;
            writeln!(out, "text_model          {}", cfg.text_model)?;
        }
        Command::Set { key, value } => {
            if let Err(e) = app.set_rag_setting(&key, &value).await {
                writeln!(out, "{}", e)?;
            }
        }
        Command::Say(text) => match app.send_message(&text).await {
            SendOutcome::Answered(reply) => print_message(out, Author::Bot, &reply.content)?,
            SendOutcome::SessionCreated(id) => writeln!(
                out,
                "started conversation {}; send your message again",
                short(&id)
            )?,
            SendOutcome::Failed(_) | SendOutcome::Ignored => {}
        },
        Command::Quit => {}
    }
    Ok(())
}

fn print_message<W: Write>(out: &mut W, author: Author, content: &str) -> Result<()> {
    let who = match author {
        Author::User => "you",
        Author::Bot => "bot",
    };
    writeln!(out, "{}> {}", who, content)?;
    Ok(())
}

pub fn print_assets<W: Write>(app: &App, out: &mut W) -> Result<()> {
    let assets = app.assets.assets();
    writeln!(out, "{} document(s)", assets.len())?;
    for a in assets {
        writeln!(out, "  {:<40} {:>6} KB", a.asset_name, a.size_kb())?;
    }
    Ok(())
}
