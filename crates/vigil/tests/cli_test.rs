//! Integration tests for the `vigil` CLI binary.
//!
//! Argument parsing, help output, completions and error exit codes run
//! without a backend; the data commands run against a wiremock server.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `vigil` binary with env isolation.
///
/// Clears all `VIGIL_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn vigil_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("vigil");
    cmd.env("HOME", "/tmp/vigil-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/vigil-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("VIGIL_PROFILE")
        .env_remove("VIGIL_API_URL")
        .env_remove("VIGIL_TOKEN")
        .env_remove("VIGIL_OUTPUT")
        .env_remove("VIGIL_INSECURE")
        .env_remove("VIGIL_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run_blocking(args: Vec<String>) -> std::process::Output {
    tokio::task::spawn_blocking(move || vigil_cmd().args(&args).output().unwrap())
        .await
        .unwrap()
}

fn args(base: &str, rest: &[&str]) -> Vec<String> {
    let mut v: Vec<String> = rest.iter().map(ToString::to_string).collect();
    v.extend(["--api-url".into(), format!("{base}/api/v1")]);
    v.extend(["--token".into(), "t0k".into()]);
    v
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = vigil_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    vigil_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("threats")
            .and(predicate::str::contains("alerts"))
            .and(predicate::str::contains("models")),
    );
}

#[test]
fn test_version_flag() {
    vigil_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vigil"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    vigil_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    vigil_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_fish() {
    vigil_cmd()
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = vigil_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_page_zero_is_rejected_by_parser() {
    vigil_cmd()
        .args(["alerts", "list", "--page", "0"])
        .assert()
        .code(2);
}

#[test]
fn test_unsupported_page_size_is_usage_error() {
    vigil_cmd()
        .args([
            "alerts",
            "list",
            "--page-size",
            "7",
            "--api-url",
            "http://127.0.0.1:1/api/v1",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("page-size"));
}

#[test]
fn test_unreachable_backend_exit_code() {
    vigil_cmd()
        .args([
            "threats",
            "list",
            "--api-url",
            "http://127.0.0.1:1/api/v1",
            "--token",
            "t0k",
            "--timeout",
            "5",
        ])
        .assert()
        .code(7);
}

#[test]
fn test_respond_requires_a_payload() {
    vigil_cmd()
        .args(["threats", "respond", "12"])
        .assert()
        .code(2);
}

#[test]
fn test_missing_explicit_profile() {
    vigil_cmd()
        .args(["alerts", "list", "--profile", "nope"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nope"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path() {
    vigil_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_without_file_prints_defaults() {
    vigil_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]").and(predicate::str::contains("page_size = 10")));
}

#[test]
fn test_config_file_profile_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let cfg_dir = dir.path().join("vigil");
    std::fs::create_dir_all(&cfg_dir).unwrap();
    std::fs::write(
        cfg_dir.join("config.toml"),
        "default_profile = \"lab\"\n\n[profiles.lab]\napi_url = \"http://127.0.0.1:1/api/v1\"\ntoken = \"secret-token\"\n",
    )
    .unwrap();

    vigil_cmd()
        .env("XDG_CONFIG_HOME", dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[profiles.lab]")
                .and(predicate::str::contains("secret-token").not()),
        );
}

#[test]
fn test_config_defaults_set_output_format() {
    let dir = tempfile::tempdir().unwrap();
    let cfg_dir = dir.path().join("vigil");
    std::fs::create_dir_all(&cfg_dir).unwrap();
    std::fs::write(
        cfg_dir.join("config.toml"),
        "[defaults]\noutput = \"json\"\ncolor = \"never\"\n",
    )
    .unwrap();

    let output = vigil_cmd()
        .env("XDG_CONFIG_HOME", dir.path())
        .args(["config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["defaults"]["output"], "json");

    // An explicit flag still wins over the configured default
    vigil_cmd()
        .env("XDG_CONFIG_HOME", dir.path())
        .args(["config", "show", "-o", "table"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]"));
}

#[test]
fn test_unknown_configured_output_falls_back_to_table() {
    let dir = tempfile::tempdir().unwrap();
    let cfg_dir = dir.path().join("vigil");
    std::fs::create_dir_all(&cfg_dir).unwrap();
    std::fs::write(cfg_dir.join("config.toml"), "[defaults]\noutput = \"xml\"\n").unwrap();

    vigil_cmd()
        .env("XDG_CONFIG_HOME", dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]"))
        .stderr(predicate::str::contains("defaults.output"));
}

// ── Backend round trips ─────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_alerts_list_json_uses_page_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/alerts"))
        .and(query_param("skip", "10"))
        .and(query_param("limit", "5"))
        .and(header("authorization", "Bearer t0k"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 5,
                "alert_type": "intrusion",
                "message": "port scan from 10.0.0.7",
                "status": "new",
                "timestamp": "2024-05-01T12:00:00",
                "metadata": {},
                "comments": []
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let output = run_blocking(args(
        &server.uri(),
        &["alerts", "list", "--page", "3", "--page-size", "5", "-o", "json"],
    ))
    .await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body[0]["id"], 5);
    assert_eq!(body[0]["status"], "new");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ack_sends_status_query() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/alerts/5/status"))
        .and(query_param("status", "acknowledged"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5,
            "status": "acknowledged"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = run_blocking(args(&server.uri(), &["alerts", "ack", "5"])).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("acknowledged"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_token_exits_with_auth_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/models"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let output = run_blocking(args(&server.uri(), &["models", "list"])).await;

    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("vigil auth login"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_alert_exits_with_not_found_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/alerts/999"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Alert not found"})))
        .mount(&server)
        .await;

    let output = run_blocking(args(&server.uri(), &["alerts", "get", "999"])).await;

    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_train_with_bad_payload_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let payload = dir.path().join("train.json");
    std::fs::write(&payload, r#"{"features": [[1, 2], [3, 4]], "labels": [0]}"#).unwrap();
    let payload = payload.display().to_string();

    let output = run_blocking(args(
        &server.uri(),
        &["models", "train", "detector", "--from-file", &payload],
    ))
    .await;

    assert_eq!(output.status.code(), Some(2), "{}", combined_output(&output));
}
