//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 for public clients that cannot hold a client secret.
//! The verifier stays in process memory until the code is redeemed.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use idswitch_domain::constants::PKCE_METHOD_S256;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Bytes of entropy behind verifiers and state tokens
const RANDOM_TOKEN_BYTES: usize = 32;

fn random_token() -> String {
    let mut bytes = [0u8; RANDOM_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a cryptographically secure code verifier
///
/// Returns a URL-safe base64-encoded random string of 32 bytes (43 characters).
/// Per RFC 7636, verifiers must be 43-128 characters long.
pub fn generate_code_verifier() -> String {
    random_token()
}

/// Derive the S256 code challenge: BASE64URL(SHA256(ASCII(code_verifier)))
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate a random anti-forgery state token
///
/// Same shape as a verifier but drawn independently, so the state that
/// travels in URLs reveals nothing about the verifier.
pub fn generate_state() -> String {
    random_token()
}

/// PKCE verifier/challenge pair for one authorization request
#[derive(Clone, PartialEq, Eq)]
pub struct PkceChallenge {
    /// Random string (43 chars, base64url encoded)
    /// Kept secret until token exchange
    pub code_verifier: String,

    /// SHA256 hash of code_verifier (base64url encoded)
    /// Sent in the authorization request
    pub code_challenge: String,
}

impl PkceChallenge {
    /// Generate a fresh pair
    ///
    /// # Examples
    /// ```
    /// use idswitch_common::auth::pkce::PkceChallenge;
    ///
    /// let pkce = PkceChallenge::generate();
    /// assert_eq!(pkce.code_verifier.len(), 43);
    /// assert_eq!(pkce.challenge_method(), "S256");
    /// ```
    pub fn generate() -> Self {
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);
        Self { code_verifier, code_challenge }
    }

    /// Get the challenge method (always "S256" for SHA256)
    #[must_use]
    pub const fn challenge_method(&self) -> &'static str {
        PKCE_METHOD_S256
    }
}

impl fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("code_verifier", &"<redacted>")
            .field("code_challenge", &self.code_challenge)
            .finish()
    }
}
