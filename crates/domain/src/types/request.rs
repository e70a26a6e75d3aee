use std::fmt;

use serde::{Deserialize, Serialize};

/// The two request kinds that can be in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Authorization,
    EndSession,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authorization => f.write_str("authorization"),
            Self::EndSession => f.write_str("end-session"),
        }
    }
}

/// Where the flow controller is in its request lifecycle.
///
/// `Resolving` covers the window between a matched callback and the caller's
/// resolution (code redemption and verification for sign-in).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowPhase {
    Idle,
    AwaitingCallback,
    Resolving,
}
