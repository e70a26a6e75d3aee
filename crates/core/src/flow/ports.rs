//! Port interfaces for the authorization flow
//!
//! These traits define the boundaries between the flow controller and the
//! network or platform implementations behind it.

use async_trait::async_trait;
use idswitch_domain::{
    IssuerOrigin, KeySet, PresentationMode, ProviderMetadata, RequestKind, Result, TokenResponse,
};
use url::Url;

use super::sink::OutcomeSink;

/// Resolves provider metadata from the discovery document
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch and parse `<issuer>/.well-known/openid-configuration`
    async fn resolve(&self, issuer: &IssuerOrigin) -> Result<ProviderMetadata>;
}

/// Fetches the provider's signing keys
#[async_trait]
pub trait KeySetSource: Send + Sync {
    /// Fetch every published key. `jwks_uri` comes from metadata when known;
    /// otherwise the issuer's well-known key location is used.
    async fn fetch_all(&self, issuer: &IssuerOrigin, jwks_uri: Option<&Url>) -> Result<KeySet>;
}

/// Parameters of one authorization-code redemption
#[derive(Debug, Clone, Copy)]
pub struct CodeExchange<'a> {
    pub token_endpoint: &'a Url,
    pub client_id: &'a str,
    pub code: &'a str,
    pub redirect_uri: &'a Url,
    pub code_verifier: &'a str,
}

/// Redeems authorization codes at the token endpoint
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange_code(&self, exchange: CodeExchange<'_>) -> Result<TokenResponse>;
}

/// One hand-off to an external agent
#[derive(Debug, Clone)]
pub struct AgentLaunch {
    pub kind: RequestKind,
    /// Fully encoded request URI to present
    pub uri: Url,
    /// Target the agent should watch for
    pub redirect_uri: Url,
    /// Where the single terminal outcome of this launch is delivered
    pub outcomes: OutcomeSink,
}

/// Presents a request URI to the user and reports how it ended
///
/// `launch` returns once the URI has been handed off. The terminal outcome
/// arrives later, exactly once, through [`AgentLaunch::outcomes`].
#[async_trait]
pub trait AuthorizationAgent: Send + Sync {
    fn presentation_mode(&self) -> PresentationMode;

    /// # Errors
    /// `FlowError::LaunchFailure` when the URI could not be presented at all
    async fn launch(&self, launch: AgentLaunch) -> Result<()>;
}
