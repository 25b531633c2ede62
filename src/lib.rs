//! # Qwanza
//!
//! A terminal chat client for a retrieval-augmented generation backend.
//!
//! Qwanza does not chunk, embed or generate anything itself. It drives a
//! backend service over a handful of REST calls (upload, process, push to
//! index, answer, list and delete assets) and keeps the client-side state
//! around them: chat sessions, their transcripts, and the documents uploaded
//! in the current run.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────────┐
//! │  CLI / REPL  │──▶│       App        │──▶│  RagClient   │──▶ backend
//! │ (qwanza chat)│   │ chat · ingest ·  │   │ enterprise=1 │
//! └──────────────┘   │ assets · settings│   │ personal=2   │
//!                    └────────┬─────────┘   └──────────────┘
//!                             ▼
//!                      ┌────────────┐
//!                      │  SQLite kv │  (ragConfig)
//!                      └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! qwanza chat                                 # interactive, enterprise mode
//! qwanza upload --mode personal ./report.pdf  # upload → process → push
//! qwanza ask --mode personal "Summarize the report"
//! qwanza assets list                          # enterprise project documents
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`client`] | HTTP client, result envelope, backend trait |
//! | [`ingest`] | Upload → process → push workflow |
//! | [`chat`] | Sessions, transcripts and the answer workflow |
//! | [`assets`] | Enterprise asset panel |
//! | [`app`] | Mode-aware application state |
//! | [`notify`] | User-facing notifications |
//! | [`settings`] | Persisted RAG settings |
//! | [`db`] | Client-side state database |
//! | [`repl`] | Interactive chat loop |
//! | [`commands`] | CLI entry points |

pub mod app;
pub mod assets;
pub mod chat;
pub mod client;
pub mod commands;
pub mod config;
pub mod db;
pub mod ingest;
pub mod models;
pub mod notify;
pub mod repl;
pub mod settings;
