//! Error types used throughout the flow

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{LaunchFailureReason, OAuthError, RequestKind};

/// Main error type for idswitch
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum FlowError {
    /// Provider metadata or signing keys have not been loaded
    #[error("Not ready: {0}")]
    NotReady(String),

    #[error("Busy: {kind} request still pending")]
    Busy { kind: RequestKind },

    #[error("Launch failed: {0}")]
    LaunchFailure(LaunchFailureReason),

    /// The provider redirected back with an OAuth error response
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(OAuthError),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// The token names a key id that is not in the loaded key set
    #[error("Unknown signing key: {0}")]
    UnknownKey(String),

    #[error("Token verification failed: {0}")]
    TokenVerification(#[from] TokenVerificationError),

    #[error("Metadata fetch failed: {0}")]
    MetadataFetch(String),

    #[error("Key set fetch failed: {0}")]
    KeySetFetch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No callback received within {0:?}")]
    TimedOut(Duration),

    #[error("Flow controller disposed")]
    Disposed,
}

impl FlowError {
    /// Short, stable label for structured log fields.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NotReady(_) => "not_ready",
            Self::Busy { .. } => "busy",
            Self::LaunchFailure(_) => "launch_failure",
            Self::AuthorizationDenied(_) => "authorization_denied",
            Self::TokenExchange(_) => "token_exchange",
            Self::UnknownKey(_) => "unknown_key",
            Self::TokenVerification(_) => "token_verification",
            Self::MetadataFetch(_) => "metadata_fetch",
            Self::KeySetFetch(_) => "key_set_fetch",
            Self::Config(_) => "config",
            Self::TimedOut(_) => "timed_out",
            Self::Disposed => "disposed",
        }
    }

    /// Whether repeating the same call later could succeed.
    ///
    /// Network failures and timeouts are transient. Verification and protocol
    /// failures are not: retrying would replay the same rejected material.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::MetadataFetch(_)
                | Self::KeySetFetch(_)
                | Self::TokenExchange(_)
                | Self::TimedOut(_)
                | Self::Busy { .. }
        )
    }

    pub fn verification(reason: VerificationFailure, detail: impl Into<String>) -> Self {
        Self::TokenVerification(TokenVerificationError::new(reason, detail))
    }
}

/// Why an ID token was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationFailure {
    #[error("malformed token")]
    Malformed,
    #[error("missing key id")]
    MissingKeyId,
    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,
    #[error("unusable key material")]
    InvalidKey,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("issuer mismatch")]
    IssuerMismatch,
    #[error("token not yet valid")]
    NotYetValid,
    #[error("token expired")]
    Expired,
    #[error("missing claim")]
    MissingClaim,
    #[error("invalid claims")]
    InvalidClaims,
}

/// Verification failure with its sub-reason and a human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenVerificationError {
    pub reason: VerificationFailure,
    pub detail: String,
}

impl TokenVerificationError {
    pub fn new(reason: VerificationFailure, detail: impl Into<String>) -> Self {
        Self { reason, detail: detail.into() }
    }
}

impl fmt::Display for TokenVerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.reason)
        } else {
            write!(f, "{}: {}", self.reason, self.detail)
        }
    }
}

impl std::error::Error for TokenVerificationError {}

/// Result type alias for idswitch operations
pub type Result<T> = std::result::Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_error_display_includes_reason_and_detail() {
        let err = FlowError::verification(VerificationFailure::Expired, "exp 10 < now 20");
        assert_eq!(err.to_string(), "Token verification failed: token expired: exp 10 < now 20");
        assert_eq!(err.label(), "token_verification");
        assert!(!err.is_retryable());
    }

    #[test]
    fn transport_failures_are_retryable() {
        assert!(FlowError::MetadataFetch("503".into()).is_retryable());
        assert!(FlowError::TimedOut(Duration::from_secs(1)).is_retryable());
        assert!(!FlowError::UnknownKey("kid-1".into()).is_retryable());
        assert!(!FlowError::Disposed.is_retryable());
    }

    #[test]
    fn busy_names_the_pending_kind() {
        let err = FlowError::Busy { kind: RequestKind::EndSession };
        assert_eq!(err.to_string(), "Busy: end-session request still pending");
    }

    #[test]
    fn errors_serialize_with_type_tag() {
        let err = FlowError::UnknownKey("kid-9".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "UnknownKey");
        assert_eq!(json["details"], "kid-9");
    }
}
