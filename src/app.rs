//! Application state for one interactive run.
//!
//! [`App`] wires the workflows to the backend clients. The two clients are
//! explicit values handed in at construction time: one bound to the
//! enterprise project, one to the personal project. The active
//! [`ChatMode`] decides which one the chat and upload workflows use; the
//! asset panel always talks to the enterprise project.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assets::AssetPanel;
use crate::chat::{ChatState, SendOutcome};
use crate::client::{RagBackend, RagClient};
use crate::config::Config;
use crate::ingest::{
    ingest_files, DocumentList, FileSource, IngestReport, PipelineSummary, StepError,
};
use crate::models::{ChatMode, DocumentRecord, RagConfig};
use crate::notify::{Notification, Notifier};
use crate::settings;

/// One backend client per chat mode.
pub struct ModeClients {
    enterprise: Box<dyn RagBackend>,
    personal: Box<dyn RagBackend>,
}

impl ModeClients {
    pub fn new(enterprise: Box<dyn RagBackend>, personal: Box<dyn RagBackend>) -> Self {
        Self {
            enterprise,
            personal,
        }
    }

    /// HTTP clients for both projects named in `[projects]`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Box::new(RagClient::from_config(
                &config.backend,
                config.projects.enterprise,
            )?),
            Box::new(RagClient::from_config(
                &config.backend,
                config.projects.personal,
            )?),
        ))
    }

    pub fn for_mode(&self, mode: ChatMode) -> &dyn RagBackend {
        match mode {
            ChatMode::Enterprise => self.enterprise.as_ref(),
            ChatMode::Personal => self.personal.as_ref(),
        }
    }

    pub fn enterprise(&self) -> &dyn RagBackend {
        self.enterprise.as_ref()
    }
}

pub struct App {
    config: Config,
    clients: ModeClients,
    notifier: Arc<dyn Notifier>,
    mode: ChatMode,
    rag_config: RagConfig,
    pub chat: ChatState,
    pub documents: DocumentList,
    pub assets: AssetPanel,
}

impl App {
    pub fn new(config: Config, clients: ModeClients, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config,
            clients,
            notifier,
            mode: ChatMode::default(),
            rag_config: RagConfig::default(),
            chat: ChatState::new(),
            documents: DocumentList::new(),
            assets: AssetPanel::new(),
        }
    }

    pub fn with_mode(mut self, mode: ChatMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    pub fn project_id(&self) -> u64 {
        self.clients.for_mode(self.mode).project_id()
    }

    pub fn notify(&self, notification: Notification) {
        self.notifier.notify(notification);
    }

    /// Switch mode. The active session is cleared; sessions, documents and
    /// assets are kept.
    pub fn switch_mode(&mut self, mode: ChatMode) {
        self.mode = mode;
        self.chat.clear_active();
        let description = match mode {
            ChatMode::Enterprise => "You are now in enterprise mode with shared history.",
            ChatMode::Personal => "You are now in personal mode with your own documents.",
        };
        self.notify(Notification::info(
            match mode {
                ChatMode::Enterprise => "Enterprise mode",
                ChatMode::Personal => "Personal mode",
            },
            description,
        ));
    }

    // ============ Chat ============

    pub fn new_session(&mut self) -> String {
        self.chat.new_session()
    }

    pub fn select_session(&mut self, id: &str) -> bool {
        let found = self.chat.select_session(id);
        if !found {
            self.notify(Notification::error("Unknown session", id));
        }
        found
    }

    pub fn rename_session(&mut self, id: &str, title: &str) -> bool {
        let renamed = self.chat.rename_session(id, title);
        if renamed {
            self.notify(Notification::info(
                "Session renamed",
                "The conversation name was updated.",
            ));
        } else {
            self.notify(Notification::error("Unknown session", id));
        }
        renamed
    }

    pub fn delete_session(&mut self, id: &str) -> bool {
        let deleted = self.chat.delete_session(id);
        if deleted {
            self.notify(Notification::info(
                "Session deleted",
                "The conversation was deleted.",
            ));
        } else {
            self.notify(Notification::error("Unknown session", id));
        }
        deleted
    }

    /// Send a message with the active mode's client.
    pub async fn send_message(&mut self, content: &str) -> SendOutcome {
        let backend = self.clients.for_mode(self.mode);
        let outcome = self
            .chat
            .send_message(backend, content, self.config.chat.answer_limit)
            .await;
        if let SendOutcome::Failed(e) = &outcome {
            self.notifier
                .notify(Notification::error("Error", e.message().to_string()));
        }
        outcome
    }

    // ============ Documents (personal list) ============

    /// Upload, process and index files with the active mode's client.
    pub async fn upload_documents(&mut self, paths: &[PathBuf]) -> IngestReport {
        let backend = self.clients.for_mode(self.mode);
        let sources = paths.iter().cloned().map(FileSource::Path).collect();
        ingest_files(
            backend,
            &mut self.documents,
            sources,
            &self.config.ingest,
            self.notifier.as_ref(),
        )
        .await
    }

    /// Forget a document locally. The backend copy is left untouched.
    pub fn delete_document(&mut self, id: &str) -> Option<DocumentRecord> {
        let removed = self.documents.remove(id);
        match &removed {
            Some(doc) => self.notify(Notification::info(
                "Document removed",
                format!("{} was removed from your list.", doc.name),
            )),
            None => self.notify(Notification::error("Unknown document", id)),
        }
        removed
    }

    // ============ Enterprise assets ============

    pub async fn open_assets(&mut self) -> bool {
        self.assets
            .open(self.clients.enterprise(), self.notifier.as_ref())
            .await
    }

    pub async fn upload_asset(&mut self, path: &Path) -> Result<PipelineSummary, StepError> {
        self.assets
            .upload(
                self.clients.enterprise(),
                path,
                &self.config.ingest,
                self.notifier.as_ref(),
            )
            .await
    }

    pub async fn delete_asset(&mut self, asset_name: &str) -> bool {
        self.assets
            .delete(self.clients.enterprise(), asset_name, self.notifier.as_ref())
            .await
    }

    // ============ Settings ============

    pub fn rag_config(&self) -> &RagConfig {
        &self.rag_config
    }

    pub async fn load_rag_config(&mut self) -> Result<()> {
        self.rag_config = settings::load_rag_config(&self.config.state.path).await?;
        Ok(())
    }

    /// Change one setting and persist the whole configuration.
    pub async fn set_rag_setting(&mut self, key: &str, value: &str) -> Result<()> {
        let mut updated = self.rag_config.clone();
        updated.set(key, value)?;
        settings::save_rag_config(&self.config.state.path, &updated).await?;
        self.rag_config = updated;
        Ok(())
    }
}
