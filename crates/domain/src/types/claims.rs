use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::IDENTITY_SCHEME_CLAIM;

/// Claims of an ID token that passed verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedClaims {
    /// The compact token exactly as received, usable as an end-session hint
    pub raw_token: String,
    pub subject: String,
    pub identity_scheme: Option<String>,
    pub display_name: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Every claim in the payload, unchanged
    pub claims: Map<String, Value>,
}

impl VerifiedClaims {
    /// Builds the typed view over a verified payload. Returns `None` when the
    /// payload has no string `sub`.
    pub fn from_payload(raw_token: impl Into<String>, claims: Map<String, Value>) -> Option<Self> {
        let subject = claims.get("sub")?.as_str()?.to_string();
        let string_claim = |name: &str| claims.get(name).and_then(Value::as_str).map(str::to_string);
        let time_claim = |name: &str| {
            claims
                .get(name)
                .and_then(Value::as_i64)
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        };

        Some(Self {
            raw_token: raw_token.into(),
            subject,
            identity_scheme: string_claim(IDENTITY_SCHEME_CLAIM),
            display_name: string_claim("name"),
            issued_at: time_claim("iat"),
            expires_at: time_claim("exp"),
            claims,
        })
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }
}
