//! Testing utilities and helpers
//!
//! - **[`tokens`]**: P-256 signing keys and ID-token fixtures the verifier
//!   accepts
//!
//! ## Usage
//!
//! ```rust
//! use idswitch_common::testing::{id_token_claims, TestSigner};
//! use idswitch_domain::KeySet;
//!
//! let signer = TestSigner::generate("kid-1");
//! let keys = KeySet::new(vec![signer.key_record()]);
//! let token = signer.sign(&id_token_claims("https://idp.test", "user-1"));
//!
//! let claims = idswitch_common::verify(&token, "https://idp.test", &keys).unwrap();
//! assert_eq!(claims.subject, "user-1");
//! ```

pub mod tokens;

pub use tokens::{id_token_claims, TestSigner, TEST_AUDIENCE};
