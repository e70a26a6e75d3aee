//! Authorization code flow primitives
//!
//! Pure, synchronous pieces of the flow: nothing here performs I/O or holds
//! state across calls.

pub mod callback;
pub mod pkce;
pub mod request;
pub mod verifier;
