//! HTTP adapters for the identity provider
//!
//! Every adapter shares one `reqwest` client built with the configured
//! timeout. Requests are sent once; there is no retry.

pub mod keys;
pub mod metadata;
pub mod token;

use std::sync::Arc;
use std::time::Duration;

use idswitch_core::flow::ports::AuthorizationAgent;
use idswitch_core::FlowPorts;
use idswitch_domain::{FlowConfig, FlowError, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

pub use keys::HttpKeySetSource;
pub use metadata::HttpMetadataResolver;
pub use token::HttpTokenExchanger;

use crate::errors::HttpFailure;

const USER_AGENT: &str = concat!("idswitch/", env!("CARGO_PKG_VERSION"));

/// Build the client shared by the HTTP adapters.
///
/// # Errors
/// Returns `FlowError::Config` if the TLS backend cannot be initialized.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| FlowError::Config(format!("failed to build HTTP client: {e}")))
}

/// Wire the HTTP adapters and `agent` into a port bundle for `config`.
pub fn http_ports(config: &FlowConfig, agent: Arc<dyn AuthorizationAgent>) -> Result<FlowPorts> {
    let client = build_http_client(config.http_timeout())?;
    Ok(FlowPorts {
        metadata: Arc::new(HttpMetadataResolver::new(client.clone())),
        keys: Arc::new(HttpKeySetSource::new(client.clone())),
        tokens: Arc::new(HttpTokenExchanger::new(client)),
        agent,
    })
}

/// GET `url` and decode a JSON body, failing on non-success statuses.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &Url,
) -> std::result::Result<T, HttpFailure> {
    debug!(endpoint = %url, "GET");

    let response = client
        .get(url.clone())
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| HttpFailure::from_reqwest(&e, url))?;

    let body = response.bytes().await.map_err(|e| HttpFailure::from_reqwest(&e, url))?;
    serde_json::from_slice(&body).map_err(|e| HttpFailure::decode(url, &e))
}
