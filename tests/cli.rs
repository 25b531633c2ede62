//! End-to-end tests: run the `qwanza` binary against the mock backend.

mod common;

use common::{spawn_mock, MockState};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

fn qwanza_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_qwanza"))
}

fn setup_test_env(base_url: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(files_dir.join("contract.md"), "# Contract\n\nEnds in March.").unwrap();
    fs::write(files_dir.join("notes.txt"), "Renewal is automatic.").unwrap();
    fs::write(files_dir.join("setup.exe"), b"MZ\x90").unwrap();

    let config_content = format!(
        r#"[backend]
base_url = "{}"
timeout_secs = 10

[projects]
enterprise = 1
personal = 2

[chat]
answer_limit = 4

[state]
path = "{}/data/qwanza.sqlite"
"#,
        base_url,
        root.display()
    );

    let config_path = config_dir.join("qwanza.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn command(config_path: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(qwanza_binary());
    cmd.arg("--config")
        .arg(config_path)
        .arg("--notify")
        .arg("json")
        .args(args)
        .env_remove("RAG_API_BASE_URL")
        .env_remove("RUST_LOG");
    cmd
}

async fn run_qwanza(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = command(config_path, args)
        .output()
        .await
        .unwrap_or_else(|e| panic!("Failed to run qwanza: {}", e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn files(config_path: &Path, name: &str) -> String {
    config_path
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("files")
        .join(name)
        .display()
        .to_string()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ask_prints_answer() {
    let state = MockState::default();
    let base = spawn_mock(state.clone()).await;
    let (_tmp, config) = setup_test_env(&base);

    let (stdout, stderr, ok) = run_qwanza(&config, &["ask", "hello"]).await;
    assert!(ok, "ask failed: {}", stderr);
    assert_eq!(stdout.trim(), "hi there");

    let req = &state.requests()[0];
    assert_eq!(req.path, "/api/v1/nlp/index/answer/1");
    assert_eq!(req.body["limit"], 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ask_personal_with_limit() {
    let state = MockState::default();
    let base = spawn_mock(state.clone()).await;
    let (_tmp, config) = setup_test_env(&base);

    let (stdout, stderr, ok) = run_qwanza(
        &config,
        &["ask", "--mode", "personal", "--limit", "2", "when does it end?"],
    )
    .await;
    assert!(ok, "ask failed: {}", stderr);
    assert!(stdout.contains("answer to: when does it end?"));

    let req = &state.requests()[0];
    assert_eq!(req.path, "/api/v1/nlp/index/answer/2");
    assert_eq!(req.body["limit"], 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_base_url_env_overrides_config() {
    let state = MockState::default();
    let base = spawn_mock(state.clone()).await;
    // Nothing listens on the discard port; only the env value can succeed.
    let (_tmp, config) = setup_test_env("http://127.0.0.1:9");

    let output = command(&config, &["ask", "hello"])
        .env("RAG_API_BASE_URL", &base)
        .output()
        .await
        .unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "ask failed: {}", stderr);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hi there");
    assert_eq!(state.paths(), vec!["/api/v1/nlp/index/answer/1"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blank_base_url_env_is_ignored() {
    let state = MockState::default();
    let base = spawn_mock(state.clone()).await;
    let (_tmp, config) = setup_test_env(&base);

    let output = command(&config, &["ask", "hello"])
        .env("RAG_API_BASE_URL", "   ")
        .output()
        .await
        .unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "ask failed: {}", stderr);
    assert_eq!(state.requests().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ask_backend_error_exits_nonzero() {
    let base = spawn_mock(MockState::default()).await;
    let (_tmp, config) = setup_test_env(&base);

    let (_, stderr, ok) = run_qwanza(&config, &["ask", "boom"]).await;
    assert!(!ok);
    assert!(stderr.contains("answer failed"), "stderr: {}", stderr);
    assert!(stderr.contains("Internal Server Error"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_upload_runs_each_file_through_pipeline() {
    let state = MockState::default();
    let base = spawn_mock(state.clone()).await;
    let (_tmp, config) = setup_test_env(&base);

    let contract = files(&config, "contract.md");
    let notes = files(&config, "notes.txt");
    let (stdout, stderr, ok) = run_qwanza(&config, &["upload", &contract, &notes]).await;
    assert!(ok, "upload failed: {}", stderr);
    assert!(stdout.contains("upload (personal mode, project 2)"));
    assert!(stdout.contains("processed: 2"));
    assert!(stdout.contains("failed: 0"));
    assert!(stdout.trim_end().ends_with("ok"));

    assert_eq!(
        state.paths(),
        vec![
            "/api/v1/data/upload/2",
            "/api/v1/data/process/2",
            "/api/v1/nlp/index/push/2",
            "/api/v1/data/upload/2",
            "/api/v1/data/process/2",
            "/api/v1/nlp/index/push/2",
        ]
    );
    let process = &state.requests()[1];
    assert_eq!(process.body["file_id"], "x1_contract.md");
    assert_eq!(process.body["chunk_size"], 800);
    assert_eq!(process.body["overlap_size"], 100);
    assert_eq!(process.body["do_reset"], 0);

    assert!(stderr.contains("\"title\":\"Documents processed\""));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_upload_reports_failed_file_and_continues() {
    let state = MockState::default();
    let base = spawn_mock(state.clone()).await;
    let (_tmp, config) = setup_test_env(&base);

    let exe = files(&config, "setup.exe");
    let notes = files(&config, "notes.txt");
    let (stdout, stderr, ok) = run_qwanza(&config, &["upload", &exe, &notes]).await;
    assert!(!ok);
    assert!(stdout.contains("error"));
    assert!(stdout.contains("file_type_not_supported"));
    assert!(stdout.contains("processed: 1"));
    assert!(stdout.contains("failed: 1"));
    assert!(stderr.contains("Upload/processing error"));
    assert!(stderr.contains("1 of 2 file(s) failed"));

    let paths = state.paths();
    assert_eq!(paths.len(), 4);
    assert_eq!(paths[1], "/api/v1/data/upload/2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_assets_upload_list_delete() {
    let state = MockState::default();
    let base = spawn_mock(state.clone()).await;
    let (_tmp, config) = setup_test_env(&base);

    let contract = files(&config, "contract.md");
    let (stdout, stderr, ok) = run_qwanza(&config, &["assets", "upload", &contract]).await;
    assert!(ok, "assets upload failed: {}", stderr);
    assert!(stdout.contains("1 document(s)"));
    assert!(stdout.contains("x1_contract.md"));

    let (stdout, _, ok) = run_qwanza(&config, &["assets", "list"]).await;
    assert!(ok);
    assert!(stdout.contains("x1_contract.md"));

    let (stdout, stderr, ok) =
        run_qwanza(&config, &["assets", "delete", "x1_contract.md"]).await;
    assert!(ok, "assets delete failed: {}", stderr);
    assert!(stdout.contains("0 document(s)"));

    let (_, stderr, ok) = run_qwanza(&config, &["assets", "delete", "x1_contract.md"]).await;
    assert!(!ok);
    assert!(stderr.contains("asset_not_found"));

    // The asset panel only ever talks to the enterprise project.
    assert!(state
        .paths()
        .iter()
        .all(|p| p.ends_with("/1") || p.contains("/1/")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_process_and_push_commands() {
    let state = MockState::default();
    let base = spawn_mock(state.clone()).await;
    let (_tmp, config) = setup_test_env(&base);

    let (stdout, stderr, ok) = run_qwanza(&config, &["process", "--reset"]).await;
    assert!(ok, "process failed: {}", stderr);
    assert!(stdout.contains("inserted chunks: 3"));

    let (stdout, _, ok) = run_qwanza(&config, &["push", "--mode", "personal"]).await;
    assert!(ok);
    assert!(stdout.contains("push (project 2)"));
    assert!(stdout.contains("inserted items: 3"));

    let requests = state.requests();
    assert_eq!(requests[0].body["do_reset"], 1);
    assert!(requests[0].body.get("file_id").is_none());
    assert_eq!(requests[1].body["do_reset"], false);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_settings_persist_between_runs() {
    let (_tmp, config) = setup_test_env("http://127.0.0.1:9");

    let (stdout, stderr, ok) = run_qwanza(&config, &["settings", "show"]).await;
    assert!(ok, "settings show failed: {}", stderr);
    assert!(stdout.contains("gpt-4o-mini"));
    assert!(stdout.contains("text-embedding-3-small"));

    let (_, stderr, ok) = run_qwanza(&config, &["settings", "set", "text_model", "gpt-4o"]).await;
    assert!(ok, "settings set failed: {}", stderr);

    let (stdout, _, ok) = run_qwanza(&config, &["settings", "show"]).await;
    assert!(ok);
    assert!(stdout.contains("gpt-4o\n"));
    assert!(!stdout.contains("gpt-4o-mini"));

    let (_, stderr, ok) = run_qwanza(&config, &["settings", "set", "temperature", "1"]).await;
    assert!(!ok);
    assert!(stderr.contains("unknown setting"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_chat_repl_session() {
    let state = MockState::default();
    let base = spawn_mock(state.clone()).await;
    let (_tmp, config) = setup_test_env(&base);

    let mut child = command(&config, &["chat"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();
    stdin
        .write_all(b"first try\nhello\n/sessions\n/mode personal\n/quit\n")
        .await
        .unwrap();
    drop(stdin);

    let output = child.wait_with_output().await.unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.starts_with("qwanza: enterprise mode (project 1)"));
    assert!(stdout.contains("started conversation"));
    assert!(stdout.contains("bot> hi there"));
    assert!(stdout.contains("2 msg"));
    assert!(stdout.contains("personal mode (project 2)"));

    // The first line only opened a session.
    assert_eq!(state.requests().len(), 1);
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_tmp, config) = setup_test_env("ftp://example.com");
    let output = std::process::Command::new(qwanza_binary())
        .arg("--config")
        .arg(&config)
        .args(["settings", "show"])
        .env_remove("RAG_API_BASE_URL")
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("http:// or https://"), "stderr: {}", stderr);
}
