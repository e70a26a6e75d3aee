//! Verification key records

use serde::{Deserialize, Serialize};

/// Public key material of a single signing key. Never carries private parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kty")]
pub enum PublicKeyMaterial {
    /// Base64url-encoded modulus and exponent
    #[serde(rename = "RSA")]
    Rsa { n: String, e: String },
    /// Base64url-encoded affine coordinates on the named curve
    #[serde(rename = "EC")]
    Ec { crv: String, x: String, y: String },
}

/// A signing key published by the provider, addressed by its key id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub key_id: String,
    /// Declared JWS algorithm (`alg`), when the provider publishes one
    pub algorithm: Option<String>,
    pub material: PublicKeyMaterial,
}

/// Ordered collection of key records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
    keys: Vec<KeyRecord>,
}

impl KeySet {
    pub fn new(keys: Vec<KeyRecord>) -> Self {
        Self { keys }
    }

    /// First key whose id matches.
    pub fn find(&self, key_id: &str) -> Option<&KeyRecord> {
        self.keys.iter().find(|key| key.key_id == key_id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyRecord> {
        self.keys.iter()
    }

    pub fn key_ids(&self) -> Vec<&str> {
        self.keys.iter().map(|key| key.key_id.as_str()).collect()
    }
}

impl FromIterator<KeyRecord> for KeySet {
    fn from_iter<I: IntoIterator<Item = KeyRecord>>(iter: I) -> Self {
        Self { keys: iter.into_iter().collect() }
    }
}
