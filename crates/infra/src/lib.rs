//! # idswitch Infrastructure
//!
//! Infrastructure implementations of core flow ports.
//!
//! This crate contains:
//! - HTTP adapters for provider metadata, signing keys and code redemption
//! - Launcher adapters for auth tabs and general browser tabs
//! - Configuration loading
//! - Logging setup
//!
//! ## Architecture
//! - Implements traits defined in `idswitch-core`
//! - Depends on `idswitch-domain`, `idswitch-common` and `idswitch-core`
//! - Contains all "impure" code (network, host browser integration)

pub mod config;
pub mod errors;
pub mod http;
pub mod launcher;
pub mod logging;

// Re-export commonly used items
pub use http::*;
pub use launcher::*;
