//! HTTP client for the RAG backend.
//!
//! Wraps the six REST operations the chat client needs. Every operation
//! returns an [`ApiResult`]: callers never see a `reqwest::Error` and
//! never have to catch anything. Transport errors, non-2xx statuses and
//! bodies that do not match the expected shape all become an [`ApiError`].
//!
//! # Endpoints
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | `POST` | `/api/v1/data/upload/{project}` | [`RagBackend::upload_file`] |
//! | `POST` | `/api/v1/data/process/{project}` | [`RagBackend::process_files`] |
//! | `POST` | `/api/v1/nlp/index/push/{project}` | [`RagBackend::push_to_index`] |
//! | `POST` | `/api/v1/nlp/index/answer/{project}` | [`RagBackend::answer`] |
//! | `GET`  | `/api/v1/data/assets/{project}` | [`RagBackend::list_assets`] |
//! | `DELETE` | `/api/v1/data/asset/{project}/{name}` | [`RagBackend::delete_asset`] |
//!
//! # Decoding
//!
//! A body is decoded as JSON when the response `content-type` contains
//! `application/json`, and kept as text otherwise. On failure the message
//! is taken from the text body, or from the JSON `signal`, `message` or
//! `detail` field, in that order.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

use crate::config::BackendConfig;
use crate::models::Asset;

/// Message used when the server gives no usable error text.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Default `limit` for [`RagBackend::answer`] when the caller passes none.
pub const DEFAULT_ANSWER_LIMIT: u32 = 10;

/// Uniform result of every backend call.
pub type ApiResult<T> = Result<T, ApiError>;

/// Why a backend call failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// No response was received (connection refused, DNS, timeout, bad URL).
    #[error("{message}")]
    Transport { message: String },
    /// The server answered with a non-success status.
    #[error("{message} (HTTP {status})")]
    Http { status: u16, message: String },
    /// The server answered 2xx but the body could not be decoded.
    #[error("unexpected response from server: {message}")]
    Decode { status: u16, message: String },
}

impl ApiError {
    fn transport(err: impl std::fmt::Display) -> Self {
        ApiError::Transport {
            message: format!("Network error: {}", err),
        }
    }

    /// Human-readable message, without the status suffix.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Transport { message }
            | ApiError::Http { message, .. }
            | ApiError::Decode { message, .. } => message,
        }
    }

    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Transport { .. } => None,
            ApiError::Http { status, .. } | ApiError::Decode { status, .. } => Some(*status),
        }
    }
}

/// A response body after the content-type driven decode step.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Text(String),
}

/// Decode raw bytes according to the declared content type.
pub fn decode_body(content_type: Option<&str>, bytes: &[u8]) -> Result<Body, String> {
    let is_json = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false);
    if is_json {
        serde_json::from_slice(bytes)
            .map(Body::Json)
            .map_err(|e| format!("invalid JSON body: {}", e))
    } else {
        Ok(Body::Text(String::from_utf8_lossy(bytes).into_owned()))
    }
}

/// Best available error text from a failed response body.
pub fn failure_message(body: &Body) -> String {
    match body {
        Body::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                UNKNOWN_ERROR.to_string()
            } else {
                text.to_string()
            }
        }
        Body::Json(json) => ["signal", "message", "detail"]
            .iter()
            .filter_map(|key| json.get(key).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_ERROR)
            .to_string(),
    }
}

/// Turn a raw response into a typed result.
pub fn interpret<T: DeserializeOwned>(
    status: u16,
    content_type: Option<&str>,
    bytes: &[u8],
) -> ApiResult<T> {
    let success = (200..300).contains(&status);
    let body = match decode_body(content_type, bytes) {
        Ok(body) => body,
        Err(message) if success => return Err(ApiError::Decode { status, message }),
        Err(_) => {
            return Err(ApiError::Http {
                status,
                message: UNKNOWN_ERROR.to_string(),
            })
        }
    };

    if !success {
        return Err(ApiError::Http {
            status,
            message: failure_message(&body),
        });
    }

    match body {
        Body::Json(json) => serde_json::from_value(json).map_err(|e| ApiError::Decode {
            status,
            message: e.to_string(),
        }),
        Body::Text(_) => Err(ApiError::Decode {
            status,
            message: "expected a JSON body".to_string(),
        }),
    }
}

// ============ Wire types ============

/// A file ready to be sent as multipart form data.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Build an upload, guessing the content type from the file name.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            name,
            content_type,
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub signal: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub file_id: Option<String>,
    #[serde(default)]
    pub asset_name: Option<String>,
}

impl UploadResponse {
    /// Identifier to hand to `process`: the asset name when present,
    /// otherwise the file id.
    pub fn file_ref(&self) -> Option<&str> {
        self.asset_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.file_id.as_deref().filter(|s| !s.is_empty()))
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRequest {
    pub chunk_size: u32,
    pub overlap_size: u32,
    /// `1` wipes the project's existing chunks first.
    pub do_reset: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessResponse {
    #[serde(default)]
    pub signal: String,
    #[serde(default)]
    pub inserted_chunks: u64,
    #[serde(default)]
    pub processed_files: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushResponse {
    #[serde(default)]
    pub signal: String,
    #[serde(default)]
    pub inserted_items_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerResponse {
    #[serde(default)]
    pub signal: String,
    pub answer: String,
    #[serde(default)]
    pub full_prompt: Option<String>,
    #[serde(default)]
    pub chat_history: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetsResponse {
    #[serde(default)]
    pub signal: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteAssetResponse {
    #[serde(default)]
    pub signal: String,
    #[serde(default)]
    pub asset_name: String,
}

// ============ Backend trait ============

/// The operations the workflows need from a backend project.
///
/// [`RagClient`] is the HTTP implementation; tests drive the workflows
/// with scripted implementations.
#[async_trait]
pub trait RagBackend: Send + Sync {
    /// Project every call is scoped to.
    fn project_id(&self) -> u64;

    async fn upload_file(&self, file: &UploadFile) -> ApiResult<UploadResponse>;

    async fn process_files(&self, request: &ProcessRequest) -> ApiResult<ProcessResponse>;

    async fn push_to_index(&self, do_reset: bool) -> ApiResult<PushResponse>;

    /// Ask a question. `limit` defaults to [`DEFAULT_ANSWER_LIMIT`].
    async fn answer(&self, text: &str, limit: Option<u32>) -> ApiResult<AnswerResponse>;

    async fn list_assets(&self) -> ApiResult<AssetsResponse>;

    async fn delete_asset(&self, asset_name: &str) -> ApiResult<DeleteAssetResponse>;
}

// ============ HTTP client ============

/// HTTP client bound to a base URL and a project id.
#[derive(Debug, Clone)]
pub struct RagClient {
    http: reqwest::Client,
    base_url: String,
    project_id: u64,
}

impl RagClient {
    pub fn new(base_url: &str, project_id: u64) -> Self {
        Self::with_http(reqwest::Client::new(), base_url, project_id)
    }

    /// Build a client honouring `[backend]` settings such as the timeout.
    pub fn from_config(config: &BackendConfig, project_id: u64) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self::with_http(builder.build()?, &config.base_url, project_id))
    }

    fn with_http(http: reqwest::Client, base_url: &str, project_id: u64) -> Self {
        let base_url = base_url.strip_suffix('/').unwrap_or(base_url).to_string();
        Self {
            http,
            base_url,
            project_id,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_project_id(&mut self, project_id: u64) {
        self.project_id = project_id;
    }

    /// Build `{base}/api/v1/{path...}`, percent-encoding each segment.
    pub fn endpoint(&self, path: &[&str]) -> ApiResult<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| ApiError::Transport {
            message: format!("invalid base URL '{}': {}", self.base_url, e),
        })?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport {
                message: format!("invalid base URL '{}'", self.base_url),
            })?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(path);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> ApiResult<T> {
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "request failed before a response arrived");
                return Err(ApiError::transport(e));
            }
        };

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(ApiError::transport)?;

        let result = interpret(status, content_type.as_deref(), &bytes);
        match &result {
            Ok(_) => tracing::debug!(status, "backend call succeeded"),
            Err(e) => tracing::warn!(status, error = %e, "backend call failed"),
        }
        result
    }
}

#[async_trait]
impl RagBackend for RagClient {
    fn project_id(&self) -> u64 {
        self.project_id
    }

    async fn upload_file(&self, file: &UploadFile) -> ApiResult<UploadResponse> {
        let project = self.project_id.to_string();
        let url = self.endpoint(&["data", "upload", &project])?;
        tracing::debug!(%url, name = %file.name, size = file.size(), "upload");

        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| ApiError::Transport {
                message: format!("invalid content type '{}': {}", file.content_type, e),
            })?;
        let form = reqwest::multipart::Form::new().part("file", part);
        self.send(self.http.post(url).multipart(form)).await
    }

    async fn process_files(&self, request: &ProcessRequest) -> ApiResult<ProcessResponse> {
        let project = self.project_id.to_string();
        let url = self.endpoint(&["data", "process", &project])?;
        tracing::debug!(%url, file_id = ?request.file_id, "process");
        self.send(self.http.post(url).json(request)).await
    }

    async fn push_to_index(&self, do_reset: bool) -> ApiResult<PushResponse> {
        let project = self.project_id.to_string();
        let url = self.endpoint(&["nlp", "index", "push", &project])?;
        tracing::debug!(%url, do_reset, "push to index");
        let body = serde_json::json!({ "do_reset": do_reset });
        self.send(self.http.post(url).json(&body)).await
    }

    async fn answer(&self, text: &str, limit: Option<u32>) -> ApiResult<AnswerResponse> {
        let project = self.project_id.to_string();
        let url = self.endpoint(&["nlp", "index", "answer", &project])?;
        let limit = limit.unwrap_or(DEFAULT_ANSWER_LIMIT);
        tracing::debug!(%url, limit, "answer");
        let body = serde_json::json!({ "text": text, "limit": limit });
        self.send(self.http.post(url).json(&body)).await
    }

    async fn list_assets(&self) -> ApiResult<AssetsResponse> {
        let project = self.project_id.to_string();
        let url = self.endpoint(&["data", "assets", &project])?;
        tracing::debug!(%url, "list assets");
        self.send(self.http.get(url)).await
    }

    async fn delete_asset(&self, asset_name: &str) -> ApiResult<DeleteAssetResponse> {
        let project = self.project_id.to_string();
        let url = self.endpoint(&["data", "asset", &project, asset_name])?;
        tracing::debug!(%url, "delete asset");
        self.send(self.http.delete(url)).await
    }
}
