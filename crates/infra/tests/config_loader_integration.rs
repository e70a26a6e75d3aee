//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files and
//! wiring a controller from it.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use idswitch_core::testing::RecordingAgent;
use idswitch_core::FlowController;
use idswitch_domain::{FlowError, PresentationMode};
use idswitch_infra::config;
use idswitch_infra::http::http_ports;
use tempfile::NamedTempFile;

fn write_config(contents: &str, extension: &str) -> PathBuf {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(contents.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension(extension);
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");
    path
}

#[test]
fn test_load_config_from_json_file() {
    let path = write_config(
        r#"{
            "issuer": "https://login.example.test/",
            "client_id": "urn:my:application:identifier:1234",
            "redirect_uri": "com.example.app://auth/callback",
            "post_logout_redirect_uri": "com.example.app://auth/logout",
            "app_switch_resume_uri": "https://app.example/resume",
            "pending_timeout_seconds": 600,
            "http_timeout_seconds": 15,
            "log_filter": "idswitch=debug"
        }"#,
        "json",
    );

    let config = config::load_from_file(Some(path.clone())).expect("valid config");

    assert_eq!(config.issuer_origin().unwrap().as_str(), "https://login.example.test");
    assert_eq!(config.client_id, "urn:my:application:identifier:1234");
    assert_eq!(
        config.post_logout_redirect_url().unwrap().as_str(),
        "com.example.app://auth/logout"
    );
    assert_eq!(config.pending_timeout(), Some(Duration::from_secs(600)));
    assert_eq!(config.http_timeout(), Duration::from_secs(15));
    assert_eq!(config.log_filter, "idswitch=debug");

    std::fs::remove_file(path).ok();
}

/// Validates that a loaded TOML config wires a working controller.
///
/// # Test Steps
/// 1. Load a TOML config with app switch enabled
/// 2. Build HTTP ports and a controller from it
/// 3. Verify the controller exposes the resume contract and starts idle
#[tokio::test]
async fn test_loaded_config_builds_controller() {
    let path = write_config(
        r#"
issuer = "login.example.test"
client_id = "urn:my:client"
redirect_uri = "com.example.app://auth/callback"
app_switch_resume_uri = "https://app.example/resume"
"#,
        "toml",
    );

    let config = config::load_from_file(Some(path.clone())).expect("valid config");
    let (agent, _launches) = RecordingAgent::new(PresentationMode::GeneralBrowserTab);
    let ports = http_ports(&config, Arc::new(agent)).expect("HTTP client builds");
    let controller = FlowController::new(&config, ports).expect("controller builds");

    assert_eq!(controller.issuer().as_str(), "https://login.example.test");
    assert_eq!(
        controller.app_switch().map(|resume| resume.resume_uri().as_str()),
        Some("https://app.example/resume")
    );
    assert!(!controller.is_ready().await);

    std::fs::remove_file(path).ok();
}

#[test]
fn test_load_config_from_nonexistent_file() {
    let result = config::load_from_file(Some("/nonexistent/path/config.json".into()));

    match result {
        Err(FlowError::Config(msg)) => {
            assert!(msg.contains("not found"), "Error message should mention 'not found'");
        }
        other => panic!("Expected Config error, got {other:?}"),
    }
}

#[test]
fn test_load_config_with_invalid_format() {
    let path = write_config(r#"{ "this is": "not valid" "#, "json");

    match config::load_from_file(Some(path.clone())) {
        Err(FlowError::Config(msg)) => {
            assert!(msg.contains("Invalid JSON"), "Error message should mention invalid JSON");
        }
        other => panic!("Expected Config error, got {other:?}"),
    }

    std::fs::remove_file(path).ok();
}
