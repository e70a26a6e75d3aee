//! Domain types and models

pub mod agent;
pub mod claims;
pub mod keys;
pub mod provider;
pub mod request;
pub mod scheme;
pub mod token;

pub use agent::{AgentOutcome, InstalledBrowser, LaunchFailureReason, PresentationChoice, PresentationMode};
pub use claims::VerifiedClaims;
pub use keys::{KeyRecord, KeySet, PublicKeyMaterial};
pub use provider::{IssuerOrigin, ProviderMetadata};
pub use request::{FlowPhase, RequestKind};
pub use scheme::IdentityScheme;
pub use token::{OAuthError, TokenResponse};
