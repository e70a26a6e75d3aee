//! Configuration loader
//!
//! Loads flow configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file if one exists, without overriding set variables
//! 2. Attempts to load from environment variables
//! 3. If incomplete, falls back to loading from file
//! 4. Probes multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `IDSWITCH_ISSUER`: Provider issuer (required)
//! - `IDSWITCH_CLIENT_ID`: Registered client id (required)
//! - `IDSWITCH_REDIRECT_URI`: Registered redirect target (required)
//! - `IDSWITCH_POST_LOGOUT_REDIRECT_URI`: Target after end-session
//! - `IDSWITCH_APP_SWITCH_RESUME_URI`: Link identity apps open to return
//! - `IDSWITCH_PENDING_TIMEOUT_SECONDS`: Give up on unanswered requests
//! - `IDSWITCH_HTTP_TIMEOUT_SECONDS`: Timeout for provider requests
//! - `IDSWITCH_LOG_FILTER`: Default log filter when `RUST_LOG` is unset
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./idswitch.json` or `./idswitch.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. Relative to executable location
//!
//! Every loaded configuration is validated before it is returned.

use std::path::{Path, PathBuf};

use idswitch_domain::constants::ENV_PREFIX;
use idswitch_domain::{FlowConfig, FlowError, Result};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `FlowError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing or fail validation
pub fn load() -> Result<FlowConfig> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `FlowError::Config` if required variables are missing, a number
/// does not parse, or the result fails validation.
pub fn load_from_env() -> Result<FlowConfig> {
    let mut config =
        FlowConfig::new(env_var("ISSUER")?, env_var("CLIENT_ID")?, env_var("REDIRECT_URI")?);

    config.post_logout_redirect_uri = env_opt("POST_LOGOUT_REDIRECT_URI");
    config.app_switch_resume_uri = env_opt("APP_SWITCH_RESUME_URI");
    config.pending_timeout_seconds = env_opt("PENDING_TIMEOUT_SECONDS")
        .map(|s| parse_seconds("pending timeout", &s))
        .transpose()?;
    if let Some(secs) = env_opt("HTTP_TIMEOUT_SECONDS") {
        config.http_timeout_seconds = parse_seconds("HTTP timeout", &secs)?;
    }
    if let Some(filter) = env_opt("LOG_FILTER") {
        config.log_filter = filter;
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `FlowError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing or fail validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<FlowConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(FlowError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            FlowError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| FlowError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<FlowConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| FlowError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| FlowError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(FlowError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: &[&str] = &[
        "config.json",
        "config.toml",
        "idswitch.json",
        "idswitch.toml",
        "../config.json",
        "../config.toml",
    ];

    let mut candidates = Vec::new();

    // Try current working directory
    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(NAMES.iter().map(|name| cwd.join(name)));
    }

    // Try relative to executable
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(NAMES.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn env_key(name: &str) -> String {
    format!("{ENV_PREFIX}{name}")
}

/// Get required `IDSWITCH_*` environment variable
fn env_var(name: &str) -> Result<String> {
    let key = env_key(name);
    std::env::var(&key)
        .map_err(|_| FlowError::Config(format!("Missing required environment variable: {key}")))
}

/// Optional `IDSWITCH_*` environment variable; blank counts as unset
fn env_opt(name: &str) -> Option<String> {
    std::env::var(env_key(name)).ok().filter(|value| !value.trim().is_empty())
}

fn parse_seconds(what: &str, raw: &str) -> Result<u64> {
    raw.trim().parse::<u64>().map_err(|e| FlowError::Config(format!("Invalid {what}: {e}")))
}
