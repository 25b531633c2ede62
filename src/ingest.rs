//! Document ingestion workflow.
//!
//! Each file goes through the same three backend steps:
//!
//! ```text
//! upload ──▶ process(chunk_size, overlap_size, file_id) ──▶ push to index
//! ```
//!
//! Files in a batch run strictly one after another. A failing step stops
//! that file's pipeline, marks its record as [`DocumentStatus::Error`] and
//! raises a notification; the next file still runs. Nothing is retried.

use chrono::Utc;
use std::path::PathBuf;

use crate::client::{ApiError, ProcessRequest, RagBackend, UploadFile};
use crate::config::IngestConfig;
use crate::models::{DocumentRecord, DocumentStatus};
use crate::notify::{Notification, Notifier};

/// Which step of the pipeline a file stopped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStep {
    /// Reading the file from local disk.
    Read,
    Upload,
    Process,
    Push,
}

impl std::fmt::Display for IngestStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IngestStep::Read => "read",
            IngestStep::Upload => "upload",
            IngestStep::Process => "process",
            IngestStep::Push => "push",
        };
        f.write_str(s)
    }
}

/// A step failure: where the pipeline stopped and why.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{step} failed: {message}")]
pub struct StepError {
    pub step: IngestStep,
    pub message: String,
}

impl StepError {
    fn api(step: IngestStep, err: ApiError) -> Self {
        Self {
            step,
            message: err.message().to_string(),
        }
    }
}

/// What the backend reported for a file that went all the way through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    pub file_ref: String,
    pub inserted_chunks: u64,
    pub inserted_items: u64,
}

/// Upload, process and index one file against `backend`.
pub async fn run_pipeline(
    backend: &dyn RagBackend,
    file: &UploadFile,
    params: &IngestConfig,
) -> Result<PipelineSummary, StepError> {
    let uploaded = backend
        .upload_file(file)
        .await
        .map_err(|e| StepError::api(IngestStep::Upload, e))?;
    let file_ref = uploaded
        .file_ref()
        .map(str::to_string)
        .ok_or_else(|| StepError {
            step: IngestStep::Upload,
            message: "upload response did not include a file id".to_string(),
        })?;

    let processed = backend
        .process_files(&ProcessRequest {
            chunk_size: params.chunk_size,
            overlap_size: params.overlap_size,
            do_reset: 0,
            file_id: Some(file_ref.clone()),
        })
        .await
        .map_err(|e| StepError::api(IngestStep::Process, e))?;

    let pushed = backend
        .push_to_index(false)
        .await
        .map_err(|e| StepError::api(IngestStep::Push, e))?;

    Ok(PipelineSummary {
        file_ref,
        inserted_chunks: processed.inserted_chunks,
        inserted_items: pushed.inserted_items_count,
    })
}

/// Where a file's bytes come from.
#[derive(Debug, Clone)]
pub enum FileSource {
    Path(PathBuf),
    Loaded(UploadFile),
}

impl FileSource {
    async fn describe(&self) -> (String, u64, String) {
        match self {
            FileSource::Path(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                let size = tokio::fs::metadata(path)
                    .await
                    .map(|m| m.len())
                    .unwrap_or(0);
                let content_type = mime_guess::from_path(path)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string();
                (name, size, content_type)
            }
            FileSource::Loaded(file) => (file.name.clone(), file.size(), file.content_type.clone()),
        }
    }

    async fn load(self) -> Result<UploadFile, StepError> {
        match self {
            FileSource::Path(path) => {
                UploadFile::from_path(&path)
                    .await
                    .map_err(|e| StepError {
                        step: IngestStep::Read,
                        message: format!("{}: {}", path.display(), e),
                    })
            }
            FileSource::Loaded(file) => Ok(file),
        }
    }
}

/// Locally tracked documents for personal mode.
///
/// Removing a record is local only: the backend keeps the asset.
#[derive(Debug, Clone, Default)]
pub struct DocumentList {
    docs: Vec<DocumentRecord>,
}

impl DocumentList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record in the `uploading` state and return its id.
    pub fn add_uploading(&mut self, name: &str, size: u64, content_type: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.docs.push(DocumentRecord {
            id: id.clone(),
            name: name.to_string(),
            size,
            content_type: content_type.to_string(),
            uploaded_at: Utc::now(),
            status: DocumentStatus::Uploading,
        });
        id
    }

    pub fn set_status(&mut self, id: &str, status: DocumentStatus) -> bool {
        match self.docs.iter_mut().find(|d| d.id == id) {
            Some(doc) => {
                doc.status = status;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<DocumentRecord> {
        let pos = self.docs.iter().position(|d| d.id == id)?;
        Some(self.docs.remove(pos))
    }

    pub fn get(&self, id: &str) -> Option<&DocumentRecord> {
        self.docs.iter().find(|d| d.id == id)
    }

    pub fn list(&self) -> &[DocumentRecord] {
        &self.docs
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// Result for one file of a batch.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub record_id: String,
    pub name: String,
    pub result: Result<PipelineSummary, StepError>,
}

impl FileOutcome {
    pub fn status(&self) -> DocumentStatus {
        if self.result.is_ok() {
            DocumentStatus::Processed
        } else {
            DocumentStatus::Error
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub files: Vec<FileOutcome>,
}

impl IngestReport {
    pub fn processed(&self) -> usize {
        self.files.iter().filter(|f| f.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.processed()
    }
}

/// Ingest a batch of files, updating `docs` as each file progresses.
pub async fn ingest_files(
    backend: &dyn RagBackend,
    docs: &mut DocumentList,
    files: Vec<FileSource>,
    params: &IngestConfig,
    notifier: &dyn Notifier,
) -> IngestReport {
    // Every file shows up as `uploading` before the first request goes out.
    let mut pending = Vec::with_capacity(files.len());
    for source in files {
        let (name, size, content_type) = source.describe().await;
        let id = docs.add_uploading(&name, size, &content_type);
        pending.push((id, name, source));
    }

    let mut report = IngestReport::default();
    for (record_id, name, source) in pending {
        tracing::info!(project = backend.project_id(), file = %name, "ingesting");

        let result = match source.load().await {
            Ok(file) => run_pipeline(backend, &file, params).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(summary) => {
                tracing::info!(
                    file = %name,
                    chunks = summary.inserted_chunks,
                    items = summary.inserted_items,
                    "indexed"
                );
                docs.set_status(&record_id, DocumentStatus::Processed);
            }
            Err(e) => {
                tracing::warn!(file = %name, step = %e.step, error = %e.message, "ingestion failed");
                docs.set_status(&record_id, DocumentStatus::Error);
                notifier.notify(Notification::error(
                    "Upload/processing error",
                    format!("{}: {}", name, e),
                ));
            }
        }

        report.files.push(FileOutcome {
            record_id,
            name,
            result,
        });
    }

    if !report.files.is_empty() {
        notifier.notify(Notification::info(
            "Documents processed",
            format!(
                "{} of {} document(s) added to your knowledge base.",
                report.processed(),
                report.files.len()
            ),
        ));
    }

    report
}
