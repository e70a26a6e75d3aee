//! In-memory ports for exercising the flow controller

// Test doubles fail loudly; a poisoned lock or bad URL should abort the test
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use idswitch_domain::{
    AgentOutcome, FlowError, IssuerOrigin, KeySet, PresentationMode, ProviderMetadata,
    RequestKind, Result, TokenResponse,
};
use tokio::sync::mpsc;
use url::Url;

use crate::flow::ports::{
    AgentLaunch, AuthorizationAgent, CodeExchange, KeySetSource, MetadataSource, TokenExchanger,
};
use crate::flow::{FlowPorts, OutcomeSink};

/// Metadata for an issuer with the usual endpoint layout.
pub fn metadata_for(issuer: &str) -> ProviderMetadata {
    let endpoint = |path: &str| Url::parse(&format!("{issuer}{path}")).expect("valid endpoint");
    ProviderMetadata {
        issuer: Some(issuer.to_string()),
        authorization_endpoint: endpoint("/oauth2/authorize"),
        token_endpoint: endpoint("/oauth2/token"),
        end_session_endpoint: Some(endpoint("/oidc/logout")),
        jwks_uri: Some(endpoint("/.well-known/jwks")),
    }
}

/// Serves fixed metadata, or fails when none is set.
#[derive(Debug, Default)]
pub struct StaticMetadata {
    metadata: Mutex<Option<ProviderMetadata>>,
}

impl StaticMetadata {
    pub fn new(metadata: ProviderMetadata) -> Self {
        Self { metadata: Mutex::new(Some(metadata)) }
    }

    pub fn failing() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataSource for StaticMetadata {
    async fn resolve(&self, issuer: &IssuerOrigin) -> Result<ProviderMetadata> {
        self.metadata
            .lock()
            .expect("metadata lock")
            .clone()
            .ok_or_else(|| FlowError::MetadataFetch(format!("{issuer}: unavailable")))
    }
}

/// Serves a fixed key set, or fails when none is set.
#[derive(Debug, Default)]
pub struct StaticKeys {
    keys: Option<KeySet>,
    requested: Mutex<Vec<Option<Url>>>,
}

impl StaticKeys {
    pub const fn new(keys: KeySet) -> Self {
        Self { keys: Some(keys), requested: Mutex::new(Vec::new()) }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    /// `jwks_uri` values passed to each fetch.
    pub fn requested(&self) -> Vec<Option<Url>> {
        self.requested.lock().expect("requested lock").clone()
    }
}

#[async_trait]
impl KeySetSource for StaticKeys {
    async fn fetch_all(&self, issuer: &IssuerOrigin, jwks_uri: Option<&Url>) -> Result<KeySet> {
        self.requested.lock().expect("requested lock").push(jwks_uri.cloned());
        self.keys.clone().ok_or_else(|| FlowError::KeySetFetch(format!("{issuer}: unavailable")))
    }
}

/// A redemption the exchanger was asked to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedExchange {
    pub token_endpoint: Url,
    pub client_id: String,
    pub code: String,
    pub redirect_uri: Url,
    pub code_verifier: String,
}

/// Answers every redemption with a scripted result.
#[derive(Debug)]
pub struct ScriptedTokens {
    response: Mutex<Result<TokenResponse>>,
    exchanges: Mutex<Vec<RecordedExchange>>,
}

impl ScriptedTokens {
    /// Respond with `id_token`.
    pub fn issuing(id_token: impl Into<String>) -> Self {
        Self::responding(Ok(TokenResponse {
            id_token: Some(id_token.into()),
            access_token: Some("access".to_string()),
            token_type: Some("Bearer".to_string()),
            expires_in: Some(600),
            scope: Some("openid".to_string()),
        }))
    }

    pub fn responding(response: Result<TokenResponse>) -> Self {
        Self { response: Mutex::new(response), exchanges: Mutex::new(Vec::new()) }
    }

    pub fn set_id_token(&self, id_token: impl Into<String>) {
        let mut response = self.response.lock().expect("response lock");
        if let Ok(tokens) = response.as_mut() {
            tokens.id_token = Some(id_token.into());
        }
    }

    pub fn exchanges(&self) -> Vec<RecordedExchange> {
        self.exchanges.lock().expect("exchanges lock").clone()
    }
}

#[async_trait]
impl TokenExchanger for ScriptedTokens {
    async fn exchange_code(&self, exchange: CodeExchange<'_>) -> Result<TokenResponse> {
        self.exchanges.lock().expect("exchanges lock").push(RecordedExchange {
            token_endpoint: exchange.token_endpoint.clone(),
            client_id: exchange.client_id.to_string(),
            code: exchange.code.to_string(),
            redirect_uri: exchange.redirect_uri.clone(),
            code_verifier: exchange.code_verifier.to_string(),
        });
        self.response.lock().expect("response lock").clone()
    }
}

/// A launch as seen by [`RecordingAgent`].
#[derive(Debug, Clone)]
pub struct RecordedLaunch {
    pub kind: RequestKind,
    pub uri: Url,
    pub redirect_uri: Url,
    pub outcomes: OutcomeSink,
}

impl RecordedLaunch {
    /// Query parameter of the launched URI.
    pub fn param(&self, name: &str) -> Option<String> {
        self.uri.query_pairs().find(|(key, _)| key == name).map(|(_, value)| value.into_owned())
    }

    pub fn state(&self) -> String {
        self.param("state").expect("launch uri carries state")
    }

    /// Redirect to the launch's target with `params` as query.
    pub fn callback(&self, params: &[(&str, &str)]) -> Url {
        let mut uri = self.redirect_uri.clone();
        uri.query_pairs_mut().extend_pairs(params);
        uri
    }

    /// Successful authorization callback for this launch.
    pub fn success(&self, code: &str) -> AgentOutcome {
        let state = self.state();
        AgentOutcome::Completed { callback_uri: self.callback(&[("code", code), ("state", &state)]) }
    }

    /// Redirect carrying `state` only, as sent after end-session.
    pub fn signed_out(&self) -> AgentOutcome {
        let state = self.state();
        AgentOutcome::Completed { callback_uri: self.callback(&[("state", &state)]) }
    }

    pub async fn deliver(&self, outcome: AgentOutcome) -> bool {
        self.outcomes.deliver(outcome).await
    }
}

/// Agent that records launches and leaves outcomes to the test.
#[derive(Debug)]
pub struct RecordingAgent {
    mode: PresentationMode,
    launches: mpsc::UnboundedSender<RecordedLaunch>,
    refuse_with: Option<FlowError>,
}

impl RecordingAgent {
    pub fn new(mode: PresentationMode) -> (Self, mpsc::UnboundedReceiver<RecordedLaunch>) {
        let (launches, rx) = mpsc::unbounded_channel();
        (Self { mode, launches, refuse_with: None }, rx)
    }

    /// Fail every launch with `err` before presenting anything.
    #[must_use]
    pub fn refusing(mut self, err: FlowError) -> Self {
        self.refuse_with = Some(err);
        self
    }
}

#[async_trait]
impl AuthorizationAgent for RecordingAgent {
    fn presentation_mode(&self) -> PresentationMode {
        self.mode
    }

    async fn launch(&self, launch: AgentLaunch) -> Result<()> {
        if let Some(err) = &self.refuse_with {
            return Err(err.clone());
        }
        let recorded = RecordedLaunch {
            kind: launch.kind,
            uri: launch.uri,
            redirect_uri: launch.redirect_uri,
            outcomes: launch.outcomes,
        };
        self.launches
            .send(recorded)
            .map_err(|_| FlowError::LaunchFailure(idswitch_domain::LaunchFailureReason::Other(
                "launch recorder dropped".to_string(),
            )))
    }
}

/// Bundle the doubles into [`FlowPorts`].
pub fn ports(
    metadata: Arc<StaticMetadata>,
    keys: Arc<StaticKeys>,
    tokens: Arc<ScriptedTokens>,
    agent: Arc<RecordingAgent>,
) -> FlowPorts {
    FlowPorts { metadata, keys, tokens, agent }
}
