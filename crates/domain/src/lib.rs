//! # idswitch Domain
//!
//! Domain types and models for the idswitch authorization flow.
//!
//! This crate contains:
//! - Provider, key and claim types shared by every layer
//! - The flow error taxonomy and Result definition
//! - Flow configuration structures
//! - Protocol constants
//!
//! ## Architecture
//! - No dependencies on other idswitch crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
