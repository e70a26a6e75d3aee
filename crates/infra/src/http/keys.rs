//! Signing key retrieval
//!
//! Reads the provider's JWK set once and keeps only public signing keys of
//! a supported type. Entries that fail to parse are skipped rather than
//! failing the whole document.

use async_trait::async_trait;
use idswitch_core::flow::ports::KeySetSource;
use idswitch_domain::{FlowError, IssuerOrigin, KeyRecord, KeySet, PublicKeyMaterial, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use super::get_json;
use crate::errors::HttpFailure;

#[derive(Debug, Deserialize)]
struct JwkDocument {
    #[serde(default)]
    keys: Vec<Value>,
}

/// One entry of a JWK set, as published.
#[derive(Debug, Deserialize)]
struct Jwk {
    kty: String,
    kid: Option<String>,
    alg: Option<String>,
    #[serde(rename = "use")]
    key_use: Option<String>,
    n: Option<String>,
    e: Option<String>,
    crv: Option<String>,
    x: Option<String>,
    y: Option<String>,
    /// Private component; its presence disqualifies the entry
    d: Option<String>,
}

impl Jwk {
    fn into_record(self) -> std::result::Result<KeyRecord, &'static str> {
        let key_id = self.kid.filter(|kid| !kid.is_empty()).ok_or("missing kid")?;
        if self.d.is_some() {
            return Err("carries private key material");
        }
        if self.key_use.as_deref().is_some_and(|u| u != "sig") {
            return Err("not a signing key");
        }

        let material = match self.kty.as_str() {
            "RSA" => match (self.n, self.e) {
                (Some(n), Some(e)) => PublicKeyMaterial::Rsa { n, e },
                _ => return Err("RSA key without n/e"),
            },
            "EC" => match (self.crv, self.x, self.y) {
                (Some(crv), Some(x), Some(y)) => PublicKeyMaterial::Ec { crv, x, y },
                _ => return Err("EC key without crv/x/y"),
            },
            _ => return Err("unsupported key type"),
        };

        Ok(KeyRecord { key_id, algorithm: self.alg, material })
    }
}

fn parse_key_set(document: JwkDocument) -> KeySet {
    document
        .keys
        .into_iter()
        .filter_map(|entry| {
            let kid = entry.get("kid").and_then(Value::as_str).unwrap_or("<none>").to_string();
            let parsed = serde_json::from_value::<Jwk>(entry)
                .map_err(|_| "unreadable entry")
                .and_then(Jwk::into_record);
            match parsed {
                Ok(record) => Some(record),
                Err(reason) => {
                    debug!(kid = %kid, reason, "Skipping key");
                    None
                }
            }
        })
        .collect()
}

/// Fetches the provider's JWK set.
#[derive(Debug, Clone)]
pub struct HttpKeySetSource {
    client: Client,
}

impl HttpKeySetSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn fetch_all(&self, issuer: &IssuerOrigin, jwks_uri: Option<&Url>) -> Result<KeySet> {
        let url = match jwks_uri {
            Some(url) => url.clone(),
            None => issuer.default_jwks_url()?,
        };

        let document: JwkDocument =
            get_json(&self.client, &url).await.map_err(HttpFailure::into_key_set_error)?;
        let keys = parse_key_set(document);

        if keys.is_empty() {
            return Err(FlowError::KeySetFetch(format!("{url} published no usable signing keys")));
        }

        info!(endpoint = %url, kids = ?keys.key_ids(), "Signing keys loaded");
        Ok(keys)
    }
}
