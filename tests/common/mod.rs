//! Shared test doubles: a scripted in-process backend and an HTTP mock
//! backend served by axum on an ephemeral port.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use qwanza::client::{
    AnswerResponse, ApiError, ApiResult, AssetsResponse, DeleteAssetResponse, ProcessRequest,
    ProcessResponse, PushResponse, RagBackend, UploadFile, UploadResponse,
};
use qwanza::models::Asset;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

// ─── Scripted backend ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Upload(String),
    Process(Option<String>),
    Push(bool),
    Answer(String, Option<u32>),
    ListAssets,
    DeleteAsset(String),
}

/// A backend whose failures are decided up front.
pub struct ScriptedBackend {
    project: u64,
    calls: Mutex<Vec<Call>>,
    fail_upload: HashSet<String>,
    fail_process: HashSet<String>,
    fail_push: bool,
    no_file_ref: bool,
    answer: Result<String, ApiError>,
    assets: Mutex<Vec<Asset>>,
}

impl ScriptedBackend {
    pub fn new(project: u64) -> Self {
        Self {
            project,
            calls: Mutex::new(Vec::new()),
            fail_upload: HashSet::new(),
            fail_process: HashSet::new(),
            fail_push: false,
            no_file_ref: false,
            answer: Ok("hi there".to_string()),
            assets: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_upload(mut self, name: &str) -> Self {
        self.fail_upload.insert(name.to_string());
        self
    }

    pub fn failing_process(mut self, file_ref: &str) -> Self {
        self.fail_process.insert(file_ref.to_string());
        self
    }

    pub fn failing_push(mut self) -> Self {
        self.fail_push = true;
        self
    }

    /// Uploads succeed but name neither an asset nor a file id.
    pub fn without_file_ref(mut self) -> Self {
        self.no_file_ref = true;
        self
    }

    pub fn answering(mut self, answer: Result<String, ApiError>) -> Self {
        self.answer = answer;
        self
    }

    pub fn with_assets(self, names: &[&str]) -> Self {
        {
            let mut assets = self.assets.lock().unwrap();
            for (i, name) in names.iter().enumerate() {
                assets.push(Asset {
                    asset_id: i as i64 + 1,
                    asset_name: name.to_string(),
                    asset_size: 2048,
                    created_at: None,
                });
            }
        }
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn http_error(status: u16, message: &str) -> ApiError {
    ApiError::Http {
        status,
        message: message.to_string(),
    }
}

#[async_trait]
impl RagBackend for ScriptedBackend {
    fn project_id(&self) -> u64 {
        self.project
    }

    async fn upload_file(&self, file: &UploadFile) -> ApiResult<UploadResponse> {
        self.record(Call::Upload(file.name.clone()));
        if self.fail_upload.contains(&file.name) {
            return Err(http_error(400, "file_type_not_supported"));
        }
        self.assets.lock().unwrap().push(Asset {
            asset_id: 100,
            asset_name: file.name.clone(),
            asset_size: file.size(),
            created_at: None,
        });
        if self.no_file_ref {
            return Ok(UploadResponse {
                signal: "file_upload_success".into(),
                file_id: None,
                asset_name: None,
            });
        }
        Ok(UploadResponse {
            signal: "file_upload_success".into(),
            file_id: Some(format!("id-{}", file.name)),
            asset_name: Some(file.name.clone()),
        })
    }

    async fn process_files(&self, request: &ProcessRequest) -> ApiResult<ProcessResponse> {
        self.record(Call::Process(request.file_id.clone()));
        if let Some(id) = &request.file_id {
            if self.fail_process.contains(id) {
                return Err(http_error(400, "processing_failed"));
            }
        }
        Ok(ProcessResponse {
            signal: "processing_success".into(),
            inserted_chunks: 5,
            processed_files: 1,
        })
    }

    async fn push_to_index(&self, do_reset: bool) -> ApiResult<PushResponse> {
        self.record(Call::Push(do_reset));
        if self.fail_push {
            return Err(http_error(500, "insert_into_vectordb_error"));
        }
        Ok(PushResponse {
            signal: "insert_into_vectordb_success".into(),
            inserted_items_count: 5,
        })
    }

    async fn answer(&self, text: &str, limit: Option<u32>) -> ApiResult<AnswerResponse> {
        self.record(Call::Answer(text.to_string(), limit));
        match &self.answer {
            Ok(answer) => Ok(AnswerResponse {
                signal: "ok".into(),
                answer: answer.clone(),
                full_prompt: None,
                chat_history: Value::Null,
            }),
            Err(e) => Err(e.clone()),
        }
    }

    async fn list_assets(&self) -> ApiResult<AssetsResponse> {
        self.record(Call::ListAssets);
        Ok(AssetsResponse {
            signal: "ok".into(),
            assets: self.assets.lock().unwrap().clone(),
        })
    }

    async fn delete_asset(&self, asset_name: &str) -> ApiResult<DeleteAssetResponse> {
        self.record(Call::DeleteAsset(asset_name.to_string()));
        let mut assets = self.assets.lock().unwrap();
        let before = assets.len();
        assets.retain(|a| a.asset_name != asset_name);
        if assets.len() == before {
            return Err(http_error(404, "asset_not_found"));
        }
        Ok(DeleteAssetResponse {
            signal: "ok".into(),
            asset_name: asset_name.to_string(),
        })
    }
}

/// Lets a test keep a handle on a backend it hands to `ModeClients`.
pub struct Shared(pub Arc<ScriptedBackend>);

#[async_trait]
impl RagBackend for Shared {
    fn project_id(&self) -> u64 {
        self.0.project_id()
    }
    async fn upload_file(&self, file: &UploadFile) -> ApiResult<UploadResponse> {
        self.0.upload_file(file).await
    }
    async fn process_files(&self, request: &ProcessRequest) -> ApiResult<ProcessResponse> {
        self.0.process_files(request).await
    }
    async fn push_to_index(&self, do_reset: bool) -> ApiResult<PushResponse> {
        self.0.push_to_index(do_reset).await
    }
    async fn answer(&self, text: &str, limit: Option<u32>) -> ApiResult<AnswerResponse> {
        self.0.answer(text, limit).await
    }
    async fn list_assets(&self) -> ApiResult<AssetsResponse> {
        self.0.list_assets().await
    }
    async fn delete_asset(&self, asset_name: &str) -> ApiResult<DeleteAssetResponse> {
        self.0.delete_asset(asset_name).await
    }
}

// ─── HTTP mock backend ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub path: String,
    pub body: Value,
}

#[derive(Default)]
pub struct MockInner {
    pub requests: Vec<Recorded>,
    /// File ids whose process call answers 400.
    pub fail_process: Vec<String>,
    pub assets: Vec<Value>,
}

#[derive(Clone, Default)]
pub struct MockState(pub Arc<Mutex<MockInner>>);

impl MockState {
    pub fn requests(&self) -> Vec<Recorded> {
        self.0.lock().unwrap().requests.clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }

    fn record(&self, method: &'static str, path: String, body: Value) {
        self.0.lock().unwrap().requests.push(Recorded { method, path, body });
    }
}

async fn upload(
    Path(project): Path<u64>,
    State(state): State<MockState>,
    mut multipart: Multipart,
) -> Response {
    let mut file_name = None;
    let mut content_type = None;
    let mut size = 0usize;
    let mut field_name = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        field_name = field.name().map(str::to_string);
        file_name = field.file_name().map(str::to_string);
        content_type = field.content_type().map(str::to_string);
        size = field.bytes().await.map(|b| b.len()).unwrap_or(0);
    }
    let name = file_name.unwrap_or_default();
    state.record(
        "POST",
        format!("/api/v1/data/upload/{}", project),
        json!({
            "field": field_name,
            "file_name": name,
            "content_type": content_type,
            "size": size,
        }),
    );

    if name.ends_with(".exe") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "signal": "file_type_not_supported" })),
        )
            .into_response();
    }

    let asset_name = format!("x1_{}", name);
    {
        let mut inner = state.0.lock().unwrap();
        let id = inner.assets.len() as i64 + 1;
        inner.assets.push(json!({
            "asset_id": id,
            "asset_name": asset_name,
            "asset_size": size,
        }));
    }
    Json(json!({
        "signal": "file_upload_success",
        "file_id": asset_name,
        "asset_name": asset_name,
    }))
    .into_response()
}

async fn process(
    Path(project): Path<u64>,
    State(state): State<MockState>,
    Json(body): Json<Value>,
) -> Response {
    state.record("POST", format!("/api/v1/data/process/{}", project), body.clone());
    let file_id = body["file_id"].as_str().unwrap_or_default().to_string();
    let fail = state.0.lock().unwrap().fail_process.contains(&file_id);
    if fail {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "signal": "processing_failed" })),
        )
            .into_response();
    }
    Json(json!({
        "signal": "processing_success",
        "inserted_chunks": 3,
        "processed_files": 1,
    }))
    .into_response()
}

async fn push(
    Path(project): Path<u64>,
    State(state): State<MockState>,
    Json(body): Json<Value>,
) -> Response {
    state.record("POST", format!("/api/v1/nlp/index/push/{}", project), body);
    Json(json!({
        "signal": "insert_into_vectordb_success",
        "inserted_items_count": 3,
    }))
    .into_response()
}

async fn answer(
    Path(project): Path<u64>,
    State(state): State<MockState>,
    Json(body): Json<Value>,
) -> Response {
    state.record("POST", format!("/api/v1/nlp/index/answer/{}", project), body.clone());
    match body["text"].as_str().unwrap_or_default() {
        "boom" => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response(),
        "garbled" => (StatusCode::OK, "<html>not json</html>").into_response(),
        "" => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": "text is required" })),
        )
            .into_response(),
        text => {
            let answer = if text == "hello" {
                "hi there".to_string()
            } else {
                format!("answer to: {}", text)
            };
            Json(json!({
                "signal": "rag_answer_success",
                "answer": answer,
                "full_prompt": "prompt",
                "chat_history": [],
            }))
            .into_response()
        }
    }
}

async fn list_assets(Path(project): Path<u64>, State(state): State<MockState>) -> Response {
    state.record("GET", format!("/api/v1/data/assets/{}", project), Value::Null);
    let assets = state.0.lock().unwrap().assets.clone();
    Json(json!({ "signal": "ok", "assets": assets })).into_response()
}

async fn delete_asset(
    Path((project, name)): Path<(u64, String)>,
    State(state): State<MockState>,
) -> Response {
    state.record(
        "DELETE",
        format!("/api/v1/data/asset/{}/{}", project, name),
        Value::Null,
    );
    let mut inner = state.0.lock().unwrap();
    let before = inner.assets.len();
    inner.assets.retain(|a| a["asset_name"] != name.as_str());
    if inner.assets.len() == before {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "signal": "asset_not_found" })),
        )
            .into_response();
    }
    Json(json!({ "signal": "ok", "asset_name": name })).into_response()
}

/// Start the mock backend and return its base URL.
pub async fn spawn_mock(state: MockState) -> String {
    let app = Router::new()
        .route("/api/v1/data/upload/{project}", post(upload))
        .route("/api/v1/data/process/{project}", post(process))
        .route("/api/v1/nlp/index/push/{project}", post(push))
        .route("/api/v1/nlp/index/answer/{project}", post(answer))
        .route("/api/v1/data/assets/{project}", get(list_assets))
        .route("/api/v1/data/asset/{project}/{name}", delete(delete_asset))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}
