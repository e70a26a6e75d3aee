//! Authorization code redemption
//!
//! Posts the `authorization_code` grant with the PKCE verifier as a form
//! body. Public clients send no secret.

use async_trait::async_trait;
use idswitch_core::flow::ports::{CodeExchange, TokenExchanger};
use idswitch_domain::{FlowError, OAuthError, Result, TokenResponse};
use reqwest::Client;
use tracing::{debug, warn};

use crate::errors::HttpFailure;

const GRANT_TYPE_AUTHORIZATION_CODE: &str = "authorization_code";

#[derive(Debug, Clone)]
pub struct HttpTokenExchanger {
    client: Client,
}

impl HttpTokenExchanger {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenExchanger for HttpTokenExchanger {
    async fn exchange_code(&self, exchange: CodeExchange<'_>) -> Result<TokenResponse> {
        let endpoint = exchange.token_endpoint;
        let form = [
            ("grant_type", GRANT_TYPE_AUTHORIZATION_CODE),
            ("client_id", exchange.client_id),
            ("code", exchange.code),
            ("redirect_uri", exchange.redirect_uri.as_str()),
            ("code_verifier", exchange.code_verifier),
        ];

        debug!(endpoint = %endpoint, "Redeeming authorization code");

        let response = self
            .client
            .post(endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| HttpFailure::from_reqwest(&e, endpoint).into_exchange_error())?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| HttpFailure::from_reqwest(&e, endpoint).into_exchange_error())?;

        // Handle OAuth errors
        if !status.is_success() {
            let err = match serde_json::from_slice::<OAuthError>(&body) {
                Ok(oauth) => FlowError::TokenExchange(oauth.to_string()),
                Err(_) => HttpFailure::Status { url: endpoint.to_string(), status: status.as_u16() }
                    .into_exchange_error(),
            };
            warn!(endpoint = %endpoint, status = status.as_u16(), error = %err, "Code redemption rejected");
            return Err(err);
        }

        serde_json::from_slice::<TokenResponse>(&body)
            .map_err(|e| HttpFailure::decode(endpoint, &e).into_exchange_error())
    }
}
