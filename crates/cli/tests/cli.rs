//! End-to-end checks of the `mineral` binary that need no storage service

use std::process::{Command, Output};

use tempfile::TempDir;

fn mineral(config_dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mineral"))
        .args(args)
        .env("MINERAL_CONFIG_DIR", config_dir.path())
        .env("AWS_ACCESS_KEY_ID", "test")
        .env("AWS_SECRET_ACCESS_KEY", "test")
        .env("AWS_ENDPOINT", "http://127.0.0.1:9")
        .env("AWS_REGION", "us-east-1")
        .env_remove("AWS_DEFAULT_BUCKET")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run mineral")
}

#[test]
fn test_unknown_subcommand_is_usage_error() {
    let config = TempDir::new().unwrap();
    let output = mineral(&config, &["frobnicate"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_put_requires_file() {
    let config = TempDir::new().unwrap();
    let output = mineral(&config, &["put", "--bucket", "media"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_completions_for_bash() {
    let config = TempDir::new().unwrap();
    let output = mineral(&config, &["completions", "bash"]);
    assert!(output.status.success());
    let script = String::from_utf8_lossy(&output.stdout);
    assert!(script.contains("mineral"));
    assert!(script.contains("puts"));
}

#[test]
fn test_missing_file_is_not_found() {
    let config = TempDir::new().unwrap();
    let output = mineral(
        &config,
        &["put", "--file", "/definitely/not/here.bin", "--bucket", "media"],
    );

    assert_eq!(output.status.code(), Some(5));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("File doesn't exist"));
}

#[test]
fn test_missing_directory_is_not_found_as_json() {
    let config = TempDir::new().unwrap();
    let output = mineral(
        &config,
        &["puts", "--path", "/definitely/not/here", "--bucket", "media", "--json"],
    );

    assert_eq!(output.status.code(), Some(5));
    let stderr = String::from_utf8_lossy(&output.stderr);
    let start = stderr.find('{').expect("JSON error on stderr");
    let error: serde_json::Value = serde_json::from_str(stderr[start..].trim()).unwrap();
    assert!(error["error"].as_str().unwrap().contains("Path does not exist"));
}

#[test]
fn test_missing_bucket_is_usage_error() {
    let config = TempDir::new().unwrap();
    let output = mineral(&config, &["ls"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_invalid_config_file_is_usage_error() {
    let config = TempDir::new().unwrap();
    std::fs::write(
        config.path().join("config.toml"),
        "[transfer]\npart_size = 10\n",
    )
    .unwrap();

    let output = mineral(&config, &["ls", "--bucket", "media"]);
    assert_eq!(output.status.code(), Some(2));
}
