use axum::{routing::post, Json, Router};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const CHAPTER_PAGE: &str = r#"<!doctype html>
<html><head><title>Manipulators</title></head>
<body>
  <h1 class="chapter-title">Chapter 4: Manipulators</h1>
  <article data-source-id="chapter-4">
    <section>
      <h2>Actuator Design</h2>
      <p id="motors">Electric motors provide torque control for each joint in the arm.</p>
    </section>
    <section>
      <h2>Sensing</h2>
      <p id="encoders">Encoders report joint angles back to the controller.</p>
    </section>
  </article>
</body></html>
"#;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let page = tmp.path().join("chapter-4.html");
    fs::write(&page, CHAPTER_PAGE).unwrap();
    (tmp, page)
}

fn write_config(tmp: &TempDir, base_url: &str) -> PathBuf {
    let path = tmp.path().join("tbc.toml");
    fs::write(
        &path,
        format!(
            r#"[api]
base_url = "{}/api"
timeout_secs = 10

[chat]
endpoint = "{}/ask"
"#,
            base_url, base_url
        ),
    )
    .unwrap();
    path
}

fn run_tbc(cwd: &Path, config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_tbc"))
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run tbc: {}", e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_context_without_config_file() {
    let (tmp, page) = setup_test_env();
    let missing = tmp.path().join("missing.toml");

    let (stdout, stderr, success) = run_tbc(
        tmp.path(),
        &missing,
        &["context", "--page", page.to_str().unwrap(), "--select", "torque control"],
    );
    assert!(success, "context failed: stdout={}, stderr={}", stdout, stderr);

    let (json_part, composed) = stdout.split_once("\n---\n").unwrap();
    let ctx: Value = serde_json::from_str(json_part).unwrap();
    assert_eq!(ctx["text"], "torque control");
    assert_eq!(ctx["sectionTitle"], "Actuator Design");
    assert_eq!(ctx["chapterTitle"], "Chapter 4: Manipulators");
    assert_eq!(ctx["sourceId"], "chapter-4");
    assert!(composed.starts_with(
        "Chapter: Chapter 4: Manipulators\n\nSection: Actuator Design\n\nSelected text: torque control"
    ));
}

#[test]
fn test_context_explicit_anchor() {
    let (tmp, page) = setup_test_env();
    let missing = tmp.path().join("missing.toml");

    // The selection is not on the page; the anchor still places it.
    let (stdout, _, success) = run_tbc(
        tmp.path(),
        &missing,
        &[
            "context",
            "--page",
            page.to_str().unwrap(),
            "--select",
            "absolute encoders",
            "--anchor",
            "#encoders",
        ],
    );
    assert!(success);
    assert!(stdout.contains("\"sectionTitle\": \"Sensing\""));
    assert!(stdout.contains("\"surroundingText\": \"absolute encoders\""));
}

#[test]
fn test_context_blank_selection_fails() {
    let (tmp, page) = setup_test_env();
    let missing = tmp.path().join("missing.toml");

    let (_, stderr, success) = run_tbc(
        tmp.path(),
        &missing,
        &["context", "--page", page.to_str().unwrap(), "--select", "   "],
    );
    assert!(!success);
    assert!(stderr.contains("--select"));
}

#[test]
fn test_backend_commands_require_config() {
    let (tmp, _) = setup_test_env();
    let missing = tmp.path().join("missing.toml");

    let (_, stderr, success) = run_tbc(tmp.path(), &missing, &["query", "q1"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_auth_prints_redacted_config() {
    let (tmp, _) = setup_test_env();
    let missing = tmp.path().join("missing.toml");

    let output = Command::new(env!("CARGO_BIN_EXE_tbc"))
        .current_dir(tmp.path())
        .env("DATABASE_URL", "postgres://app:hunter2@db:5432/auth")
        .env("AUTH_ACCOUNT_LINKING", "true")
        .arg("--config")
        .arg(&missing)
        .arg("auth")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let cfg: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(cfg["databaseUrl"], "postgres://app:****@db:5432/auth");
    assert_eq!(cfg["account"]["accountLinking"], true);
    assert!(!stdout.contains("hunter2"));
}

#[test]
fn test_auth_requires_database_url() {
    let (tmp, _) = setup_test_env();
    let missing = tmp.path().join("missing.toml");

    let output = Command::new(env!("CARGO_BIN_EXE_tbc"))
        .current_dir(tmp.path())
        .env_remove("DATABASE_URL")
        .arg("--config")
        .arg(&missing)
        .arg("auth")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("DATABASE_URL"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ask_round_trip() {
    let router = Router::new().route(
        "/api/rag/query",
        post(|Json(body): Json<Value>| async move {
            let context = body["context_text"].as_str().unwrap_or_default();
            let answer = if context.contains("Section: Actuator Design") {
                "Torque control keeps each joint on its commanded trajectory."
            } else {
                "no context"
            };
            Json(json!({
                "id": "q7",
                "query_text": body["query_text"],
                "response_text": answer,
                "confidence_score": 0.9,
                "created_at": "2024-01-01"
            }))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let (tmp, page) = setup_test_env();
    let config = write_config(&tmp, &base);
    let cwd = tmp.path().to_path_buf();
    let page = page.to_str().unwrap().to_string();

    let (stdout, stderr, success) = tokio::task::spawn_blocking(move || {
        run_tbc(
            &cwd,
            &config,
            &[
                "ask",
                "--page",
                &page,
                "--select",
                "torque control",
                "--question",
                "Why does this matter?",
            ],
        )
    })
    .await
    .unwrap();

    assert!(success, "ask failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Torque control keeps each joint"));
    assert!(stdout.contains("query id: q7"));
    assert!(stdout.contains("confidence: 0.90"));
}

#[test]
fn test_ask_unreachable_backend_fails() {
    let (tmp, page) = setup_test_env();
    let config = write_config(&tmp, "http://127.0.0.1:9");

    let (_, stderr, success) = run_tbc(
        tmp.path(),
        &config,
        &["ask", "--page", page.to_str().unwrap(), "--select", "torque control"],
    );
    assert!(!success);
    assert!(stderr.contains("submit query"));
}

#[test]
fn test_chapter_unreachable_backend_reports_error() {
    let (tmp, _) = setup_test_env();
    let config = write_config(&tmp, "http://127.0.0.1:9");

    let (stdout, stderr, success) = run_tbc(tmp.path(), &config, &["chapter", "ch-4"]);
    assert!(!success);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Error loading chapter"), "stderr: {}", stderr);
    assert!(stderr.contains("get chapter"), "stderr: {}", stderr);
}
