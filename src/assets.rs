//! Enterprise asset panel.
//!
//! Lists, adds and deletes the documents of the shared enterprise project.
//! There is no optimistic update: every mutation is followed by a full
//! re-fetch of the asset list.

use std::path::Path;

use crate::client::{RagBackend, UploadFile};
use crate::config::IngestConfig;
use crate::ingest::{run_pipeline, IngestStep, PipelineSummary, StepError};
use crate::models::Asset;
use crate::notify::{Notification, Notifier};

#[derive(Debug, Default)]
pub struct AssetPanel {
    assets: Vec<Asset>,
    loading: bool,
    uploading: bool,
}

impl AssetPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    /// Opening the panel fetches the list.
    pub async fn open(&mut self, backend: &dyn RagBackend, notifier: &dyn Notifier) -> bool {
        self.refresh(backend, notifier).await
    }

    /// Re-fetch the asset list. On failure the previous list is kept.
    pub async fn refresh(&mut self, backend: &dyn RagBackend, notifier: &dyn Notifier) -> bool {
        self.loading = true;
        let result = backend.list_assets().await;
        self.loading = false;

        match result {
            Ok(listing) => {
                tracing::debug!(project = backend.project_id(), count = listing.assets.len(), "assets loaded");
                self.assets = listing.assets;
                true
            }
            Err(e) => {
                notifier.notify(Notification::error("Could not load documents", e.message()));
                false
            }
        }
    }

    /// Run the ingestion pipeline for one file, then refresh the list.
    pub async fn upload(
        &mut self,
        backend: &dyn RagBackend,
        path: &Path,
        params: &IngestConfig,
        notifier: &dyn Notifier,
    ) -> Result<PipelineSummary, StepError> {
        self.uploading = true;
        let result = match UploadFile::from_path(path).await {
            Ok(file) => run_pipeline(backend, &file, params).await,
            Err(e) => Err(StepError {
                step: IngestStep::Read,
                message: format!("{}: {}", path.display(), e),
            }),
        };
        self.uploading = false;

        match &result {
            Ok(summary) => {
                notifier.notify(Notification::info(
                    "Document added",
                    format!("{} was indexed successfully.", summary.file_ref),
                ));
                self.refresh(backend, notifier).await;
            }
            Err(e) => {
                notifier.notify(Notification::error("Upload failed", e.to_string()));
            }
        }
        result
    }

    /// Delete an asset by name on the backend, then refresh the list.
    pub async fn delete(
        &mut self,
        backend: &dyn RagBackend,
        asset_name: &str,
        notifier: &dyn Notifier,
    ) -> bool {
        match backend.delete_asset(asset_name).await {
            Ok(_) => {
                notifier.notify(Notification::info(
                    "Document deleted",
                    format!("{} deleted.", asset_name),
                ));
                self.refresh(backend, notifier).await;
                true
            }
            Err(e) => {
                notifier.notify(Notification::error("Delete failed", e.message()));
                false
            }
        }
    }
}
