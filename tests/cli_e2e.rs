//! End-to-end tests of the `clip-archiver` binary.

#![allow(deprecated)]

use std::path::Path;

use assert_cmd::Command;
use assert_cmd::prelude::OutputAssertExt;
use clip_archiver::Database;
use clip_archiver::store::{ClipStore, DownloadStatus, Namespace};
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

/// A command isolated from the user's config directory and log settings.
fn archiver(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("clip-archiver").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.join("xdg-config"))
        .env("HOME", home)
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_describes_tool() {
    let home = TempDir::new().unwrap();
    archiver(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Harvest clip metadata"))
        .stdout(predicate::str::contains("--skip-harvest"))
        .stdout(predicate::str::contains("--api-base").not());
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    archiver(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_credentials_fail_before_network() {
    let home = TempDir::new().unwrap();
    archiver(home.path())
        .args(["-s", "some_streamer"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Missing client id"));
}

#[test]
fn test_download_requires_directory() {
    let home = TempDir::new().unwrap();
    archiver(home.path())
        .args(["--client-id", "id", "--client-secret", "secret", "-s", "x", "-d"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("download directory is required"));
}

#[test]
fn test_unknown_config_key_is_rejected() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("archiver.toml");
    std::fs::write(&config, "[settings]\nstreamer = \"x\"\nbogus = 1\n").unwrap();

    archiver(home.path())
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_missing_explicit_config_is_rejected() {
    let home = TempDir::new().unwrap();
    archiver(home.path())
        .arg("--config")
        .arg(home.path().join("absent.toml"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_out_of_range_concurrency_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    archiver(home.path())
        .args(["-c", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--concurrency"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_export_only_run_registers_account() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "access_token": "t", "expires_in": 60 })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .and(query_param("login", "some_streamer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "1001", "login": "some_streamer", "display_name": "Some Streamer" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let database = home.path().join("clips.sqlite3");
    let output = home.path().join("out");

    let mut cmd = archiver(home.path());
    cmd.arg("--client-id")
        .arg("id")
        .arg("--client-secret")
        .arg("secret")
        .arg("-s")
        .arg("some_streamer")
        .arg("-b")
        .arg(&database)
        .arg("-o")
        .arg(&output)
        .arg("--api-base")
        .arg(server.uri())
        .arg("--auth-base")
        .arg(server.uri())
        .args(["-n", "-e", "-q"]);
    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();
    output.assert().success();

    let store = ClipStore::new(Database::new(&database).await.unwrap());
    let ns = Namespace::parse("some_streamer").unwrap();
    assert_eq!(
        store
            .count_by_status(&ns, DownloadStatus::Downloaded)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_streamer_fails_startup() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "t" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/helix/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let mut cmd = archiver(home.path());
    cmd.args(["--client-id", "id", "--client-secret", "secret", "-s", "ghost", "-n"])
        .arg("-b")
        .arg(home.path().join("clips.sqlite3"))
        .arg("--api-base")
        .arg(server.uri())
        .arg("--auth-base")
        .arg(server.uri());
    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();
    output
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not resolve account 'ghost'"));
}
