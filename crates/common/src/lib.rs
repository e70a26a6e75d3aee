//! Protocol building blocks shared across idswitch crates.
//!
//! - [`auth::pkce`]: PKCE verifier/challenge pairs and anti-forgery state
//! - [`auth::request`]: authorization and end-session request builders
//! - [`auth::callback`]: callback query parsing
//! - [`auth::verifier`]: ID-token signature and claim verification
//!
//! Enable the `test-utils` feature for [`testing`], which generates signing
//! keys and mints tokens the verifier accepts.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types
pub use auth::callback::CallbackParams;
pub use auth::pkce::PkceChallenge;
pub use auth::request::{AuthorizationRequest, EndSessionRequest, RequestBuilder, RequestDescriptor};
pub use auth::verifier::{verify, TokenVerifier};
