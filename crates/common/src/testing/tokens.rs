//! Signing keys and ID-token fixtures

// Test helpers fail loudly; a broken key generator should abort the test
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::expect_used)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use idswitch_domain::{KeyRecord, PublicKeyMaterial};
use jsonwebtoken::{encode, get_current_timestamp, Algorithm, EncodingKey, Header};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::{EncodePrivateKey, LineEnding};
use p256::SecretKey;
use serde_json::{json, Value};

/// Audience placed in fixture tokens
pub const TEST_AUDIENCE: &str = "urn:my:application:identifier:1234";

/// An ES256 signing key with a fixed key id.
pub struct TestSigner {
    key_id: String,
    encoding_key: EncodingKey,
    x: String,
    y: String,
}

impl TestSigner {
    /// Generate a fresh P-256 key pair.
    pub fn generate(key_id: impl Into<String>) -> Self {
        let secret = SecretKey::random(&mut rand::rngs::OsRng);
        let pem = secret.to_pkcs8_pem(LineEnding::LF).expect("encode P-256 key as PKCS#8");
        let encoding_key =
            EncodingKey::from_ec_pem(pem.as_bytes()).expect("load P-256 key for signing");

        let point = secret.public_key().to_encoded_point(false);
        let x = URL_SAFE_NO_PAD.encode(point.x().expect("uncompressed point has x"));
        let y = URL_SAFE_NO_PAD.encode(point.y().expect("uncompressed point has y"));

        Self { key_id: key_id.into(), encoding_key, x, y }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Public half as a key record.
    pub fn key_record(&self) -> KeyRecord {
        KeyRecord {
            key_id: self.key_id.clone(),
            algorithm: Some("ES256".to_string()),
            material: PublicKeyMaterial::Ec {
                crv: "P-256".to_string(),
                x: self.x.clone(),
                y: self.y.clone(),
            },
        }
    }

    /// Public half as a JWK document entry.
    pub fn jwk(&self) -> Value {
        json!({
            "kty": "EC",
            "use": "sig",
            "alg": "ES256",
            "kid": self.key_id,
            "crv": "P-256",
            "x": self.x,
            "y": self.y,
        })
    }

    /// Sign `claims` with the key id in the header.
    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key_id.clone());
        encode(&header, claims, &self.encoding_key).expect("sign test token")
    }

    /// Sign `claims` with no key id in the header.
    pub fn sign_without_kid(&self, claims: &Value) -> String {
        encode(&Header::new(Algorithm::ES256), claims, &self.encoding_key)
            .expect("sign test token")
    }
}

/// Claims shaped like a provider's ID token, valid for the next ten minutes.
pub fn id_token_claims(issuer: &str, subject: &str) -> Value {
    let now = get_current_timestamp();
    json!({
        "iss": issuer,
        "sub": subject,
        "aud": TEST_AUDIENCE,
        "identityscheme": "urn:grn:authn:mock",
        "name": "Test User",
        "iat": now,
        "nbf": now,
        "exp": now + 600,
    })
}
