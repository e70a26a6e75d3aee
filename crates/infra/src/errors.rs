//! Conversions from transport errors into flow errors.

use idswitch_domain::FlowError;
use thiserror::Error;
use url::Url;

/// A failed exchange with the identity provider, before it is attributed to
/// a flow step.
#[derive(Debug, Error)]
pub enum HttpFailure {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("could not connect to {url}")]
    Connect { url: String },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid document from {url}: {detail}")]
    Decode { url: String, detail: String },

    #[error("request to {url} failed: {detail}")]
    Other { url: String, detail: String },
}

impl HttpFailure {
    pub(crate) fn from_reqwest(err: &reqwest::Error, url: &Url) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            return Self::Timeout { url };
        }

        #[cfg(not(target_arch = "wasm32"))]
        if err.is_connect() {
            return Self::Connect { url };
        }

        if let Some(status) = err.status() {
            return Self::Status { url, status: status.as_u16() };
        }
        if err.is_decode() {
            return Self::Decode { url, detail: err.to_string() };
        }
        Self::Other { url, detail: err.to_string() }
    }

    pub(crate) fn decode(url: &Url, err: &serde_json::Error) -> Self {
        Self::Decode { url: url.to_string(), detail: err.to_string() }
    }

    pub fn into_metadata_error(self) -> FlowError {
        FlowError::MetadataFetch(self.to_string())
    }

    pub fn into_key_set_error(self) -> FlowError {
        FlowError::KeySetFetch(self.to_string())
    }

    pub fn into_exchange_error(self) -> FlowError {
        FlowError::TokenExchange(self.to_string())
    }
}
