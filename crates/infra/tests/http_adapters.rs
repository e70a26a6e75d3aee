//! Integration tests for the HTTP adapters against a mock provider

use std::time::Duration;

use idswitch_core::flow::ports::{CodeExchange, KeySetSource, MetadataSource, TokenExchanger};
use idswitch_domain::{FlowError, IssuerOrigin, PublicKeyMaterial};
use idswitch_infra::http::{
    build_http_client, HttpKeySetSource, HttpMetadataResolver, HttpTokenExchanger,
};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> reqwest::Client {
    build_http_client(Duration::from_secs(5)).unwrap()
}

fn origin(server: &MockServer) -> IssuerOrigin {
    IssuerOrigin::parse(&server.uri()).unwrap()
}

fn discovery(issuer: &str) -> serde_json::Value {
    json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{issuer}/oauth2/authorize"),
        "token_endpoint": format!("{issuer}/oauth2/token"),
        "end_session_endpoint": format!("{issuer}/oidc/logout"),
        "jwks_uri": format!("{issuer}/.well-known/jwks"),
        "response_types_supported": ["code"],
        "code_challenge_methods_supported": ["S256"]
    })
}

/// Validates discovery against the well-known path.
///
/// # Test Steps
/// 1. Serve a discovery document with extra members
/// 2. Resolve it
/// 3. Verify the endpoints the flow uses
#[tokio::test]
async fn metadata_is_resolved_from_well_known_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(discovery(&server.uri())))
        .expect(1)
        .mount(&server)
        .await;

    let metadata = HttpMetadataResolver::new(client()).resolve(&origin(&server)).await.unwrap();

    assert_eq!(metadata.authorization_endpoint.path(), "/oauth2/authorize");
    assert_eq!(metadata.token_endpoint.path(), "/oauth2/token");
    assert_eq!(metadata.end_session_endpoint.unwrap().path(), "/oidc/logout");
    assert_eq!(metadata.jwks_uri.unwrap().path(), "/.well-known/jwks");
}

#[tokio::test]
async fn metadata_without_required_endpoints_is_a_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "issuer": server.uri() })))
        .mount(&server)
        .await;

    let err = HttpMetadataResolver::new(client()).resolve(&origin(&server)).await.unwrap_err();
    assert!(matches!(err, FlowError::MetadataFetch(_)), "got {err:?}");
}

#[tokio::test]
async fn metadata_server_error_is_a_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = HttpMetadataResolver::new(client()).resolve(&origin(&server)).await.unwrap_err();
    assert!(matches!(&err, FlowError::MetadataFetch(msg) if msg.contains("500")), "got {err:?}");
}

#[tokio::test]
async fn keys_are_read_from_given_location() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/keys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keys": [
                { "kty": "RSA", "kid": "rsa-1", "alg": "RS256", "use": "sig", "n": "sXch", "e": "AQAB" },
                { "kty": "EC", "kid": "ec-1", "crv": "P-256", "x": "xx", "y": "yy", "d": "private" },
                { "kty": "EC", "kid": "ec-2", "crv": "P-256", "x": "xx", "y": "yy" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let location = Url::parse(&format!("{}/keys", server.uri())).unwrap();
    let keys = HttpKeySetSource::new(client())
        .fetch_all(&origin(&server), Some(&location))
        .await
        .unwrap();

    assert_eq!(keys.key_ids(), vec!["rsa-1", "ec-2"]);
    assert!(matches!(keys.find("rsa-1").unwrap().material, PublicKeyMaterial::Rsa { .. }));
}

#[tokio::test]
async fn keys_fall_back_to_well_known_location() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/jwks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keys": [{ "kty": "EC", "kid": "ec-1", "crv": "P-256", "x": "xx", "y": "yy" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let keys = HttpKeySetSource::new(client()).fetch_all(&origin(&server), None).await.unwrap();
    assert_eq!(keys.len(), 1);
}

#[tokio::test]
async fn key_set_without_usable_keys_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/jwks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keys": [{ "kty": "oct", "kid": "hmac", "k": "c2VjcmV0" }]
        })))
        .mount(&server)
        .await;

    let err = HttpKeySetSource::new(client()).fetch_all(&origin(&server), None).await.unwrap_err();
    assert!(matches!(err, FlowError::KeySetFetch(_)), "got {err:?}");
}

/// Validates the authorization-code grant sent to the token endpoint.
///
/// # Test Steps
/// 1. Expect a form POST carrying grant type, code, verifier and client id
/// 2. Redeem a code
/// 3. Verify the parsed token response
#[tokio::test]
async fn code_exchange_posts_pkce_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-1"))
        .and(body_string_contains("code_verifier=verifier-abc"))
        .and(body_string_contains("client_id=my-client"))
        .and(body_string_contains("redirect_uri=com.example.app%3A%2F%2Fauth%2Fcallback"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id_token": "header.payload.signature",
            "access_token": "access",
            "token_type": "Bearer",
            "expires_in": 600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token_endpoint = Url::parse(&format!("{}/oauth2/token", server.uri())).unwrap();
    let redirect_uri = Url::parse("com.example.app://auth/callback").unwrap();
    let response = HttpTokenExchanger::new(client())
        .exchange_code(CodeExchange {
            token_endpoint: &token_endpoint,
            client_id: "my-client",
            code: "auth-code-1",
            redirect_uri: &redirect_uri,
            code_verifier: "verifier-abc",
        })
        .await
        .unwrap();

    assert_eq!(response.id_token.as_deref(), Some("header.payload.signature"));
    assert_eq!(response.expires_in, Some(600));
}

#[tokio::test]
async fn code_exchange_reports_oauth_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "code expired"
        })))
        .mount(&server)
        .await;

    let token_endpoint = Url::parse(&format!("{}/oauth2/token", server.uri())).unwrap();
    let redirect_uri = Url::parse("com.example.app://auth/callback").unwrap();
    let err = HttpTokenExchanger::new(client())
        .exchange_code(CodeExchange {
            token_endpoint: &token_endpoint,
            client_id: "my-client",
            code: "stale",
            redirect_uri: &redirect_uri,
            code_verifier: "verifier",
        })
        .await
        .unwrap_err();

    assert_eq!(err, FlowError::TokenExchange("invalid_grant: code expired".into()));
}

#[tokio::test]
async fn code_exchange_with_opaque_failure_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let token_endpoint = Url::parse(&format!("{}/oauth2/token", server.uri())).unwrap();
    let redirect_uri = Url::parse("com.example.app://auth/callback").unwrap();
    let err = HttpTokenExchanger::new(client())
        .exchange_code(CodeExchange {
            token_endpoint: &token_endpoint,
            client_id: "my-client",
            code: "code",
            redirect_uri: &redirect_uri,
            code_verifier: "verifier",
        })
        .await
        .unwrap_err();

    assert!(matches!(&err, FlowError::TokenExchange(msg) if msg.contains("502")), "got {err:?}");
}
