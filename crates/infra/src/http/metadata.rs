//! Provider metadata resolution over HTTPS

use async_trait::async_trait;
use idswitch_core::flow::ports::MetadataSource;
use idswitch_domain::{IssuerOrigin, ProviderMetadata, Result};
use reqwest::Client;
use tracing::{info, warn};

use super::get_json;
use crate::errors::HttpFailure;

/// Fetches `<issuer>/.well-known/openid-configuration`.
#[derive(Debug, Clone)]
pub struct HttpMetadataResolver {
    client: Client,
}

impl HttpMetadataResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetadataSource for HttpMetadataResolver {
    async fn resolve(&self, issuer: &IssuerOrigin) -> Result<ProviderMetadata> {
        let url = issuer.metadata_url()?;
        let metadata: ProviderMetadata =
            get_json(&self.client, &url).await.map_err(HttpFailure::into_metadata_error)?;

        if let Some(advertised) = metadata.issuer.as_deref() {
            if advertised.trim_end_matches('/') != issuer.as_str() {
                warn!(
                    configured = %issuer,
                    advertised,
                    "Discovery document advertises a different issuer"
                );
            }
        }

        info!(
            issuer = %issuer,
            authorization_endpoint = %metadata.authorization_endpoint,
            end_session = metadata.end_session_endpoint.is_some(),
            "Provider metadata loaded"
        );
        Ok(metadata)
    }
}
