//! End-to-end CLI tests for the albumcache binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

/// Binary invocation isolated from any user config file.
fn albumcache(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("albumcache").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let home = TempDir::new().unwrap();
    albumcache(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Resolve remote albums"))
        .stdout(predicate::str::contains("recommend"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let home = TempDir::new().unwrap();
    albumcache(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("albumcache"));
}

#[test]
fn test_binary_without_subcommand_fails() {
    let home = TempDir::new().unwrap();
    albumcache(&home).assert().failure();
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let home = TempDir::new().unwrap();
    albumcache(&home)
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_search_requires_ordinal() {
    let home = TempDir::new().unwrap();
    albumcache(&home).args(["search", "foo"]).assert().failure();
}

#[test]
fn test_binary_search_zero_ordinal_is_rejected() {
    let home = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    albumcache(&home)
        .args(["-q", "--base-dir"])
        .arg(cache.path())
        .args(["search", "foo", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: invalid ordinal '0'"));
}

#[test]
fn test_binary_author_non_numeric_ordinal_is_rejected() {
    let home = TempDir::new().unwrap();
    albumcache(&home)
        .args(["-q", "author", "some", "artist", "first"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid ordinal 'first'"));
}

#[test]
fn test_binary_info_rejects_path_like_id() {
    let home = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    albumcache(&home)
        .args(["-q", "--base-dir"])
        .arg(cache.path())
        .args(["info", "../x"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid album id"));
    assert!(!cache.path().join("picture").exists());
}

#[test]
fn test_binary_missing_explicit_config_fails() {
    let home = TempDir::new().unwrap();
    albumcache(&home)
        .args(["--config", "/nonexistent/albumcache.toml", "info", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn test_binary_invalid_config_value_fails() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("albumcache").join("config.toml");
    std::fs::create_dir_all(config.parent().unwrap()).unwrap();
    std::fs::write(&config, "download_workers = 99\n").unwrap();

    albumcache(&home)
        .args(["info", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("download_workers"));
}

#[test]
fn test_binary_workers_flag_out_of_range() {
    let home = TempDir::new().unwrap();
    albumcache(&home)
        .args(["--workers", "0", "recommend"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("workers"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_binary_info_prints_summary_and_caches_cover() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/albums/350234"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 350234,
            "title": "Sample Album",
            "tags": ["alpha", "beta"],
            "pub_date": "2024-05-01",
            "photos": [{"id": "p1"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/photos/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"url": "media/p1/00001.jpg"},
            {"url": "media/p1/00002.jpg"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media/p1/00001.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"cover".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let api_url = server.uri();
    let cache_path = cache.path().to_path_buf();

    // assert_cmd blocks; keep the mock server's runtime free to respond.
    let assert = tokio::task::spawn_blocking(move || {
        albumcache(&home)
            .args(["-q", "--api-url", &api_url, "--base-dir"])
            .arg(&cache_path)
            .args(["info", "350234"])
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("Title: Sample Album"))
        .stdout(predicate::str::contains("Tags: alpha, beta"))
        .stdout(predicate::str::contains("Pages: 2"));
    let cover = cache.path().join("picture/350234/00001.jpg");
    assert_eq!(std::fs::read(cover).unwrap(), b"cover");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_binary_info_unknown_album_exits_with_failure() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/albums/123456"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let config = home.path().join("albumcache").join("config.toml");
    std::fs::create_dir_all(config.parent().unwrap()).unwrap();
    std::fs::write(
        &config,
        format!(
            "api_base_url = \"{}\"\nbase_dir = \"{}\"\nverbosity = \"quiet\"\n",
            server.uri(),
            cache.path().display()
        ),
    )
    .unwrap();

    let assert = tokio::task::spawn_blocking(move || {
        albumcache(&home).args(["info", "123456"]).assert()
    })
    .await
    .unwrap();

    assert
        .code(1)
        .stderr(predicate::str::contains("album 123456 not found"));
    assert!(!cache.path().join("picture").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_binary_download_prints_document_path() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/albums/5/document"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let api_url = server.uri();
    let cache_path = cache.path().to_path_buf();

    let assert = tokio::task::spawn_blocking(move || {
        albumcache(&home)
            .args(["-q", "--api-url", &api_url, "--base-dir"])
            .arg(&cache_path)
            .args(["download", "5"])
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("Document: "))
        .stdout(predicate::str::contains("5.pdf"));
    assert_eq!(
        std::fs::read(cache.path().join("pdf/5.pdf")).unwrap(),
        b"%PDF-1.7"
    );
}
