//! End-to-end flows over HTTP adapters and launcher adapters
//!
//! A wiremock server plays the identity provider. A fake host stands in for
//! the platform browser and hands results back through the launchers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use idswitch_common::testing::{id_token_claims, TestSigner};
use idswitch_core::{BrowserProbe, FlowController};
use idswitch_domain::{
    FlowConfig, FlowError, FlowPhase, IdentityScheme, InstalledBrowser, LaunchFailureReason,
    PresentationMode,
};
use idswitch_infra::http::http_ports;
use idswitch_infra::launcher::{
    select_launcher, AuthTabHost, AuthTabResult, BrowserTabHost, SelectedLauncher,
};
use serde_json::json;
use tokio::sync::mpsc;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CLIENT_ID: &str = "urn:my:application:identifier:1234";
const REDIRECT: &str = "com.example.app://auth/callback";

#[derive(Debug, Clone)]
struct Opened {
    browser: Option<String>,
    uri: Url,
}

impl Opened {
    fn state(&self) -> String {
        self.uri
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .expect("launch uri carries state")
    }

    fn callback(&self, query: &str) -> Url {
        Url::parse(&format!("{REDIRECT}?{query}")).unwrap()
    }
}

#[derive(Clone)]
struct FakeHost {
    opened: mpsc::UnboundedSender<Opened>,
    warm_ups: Arc<AtomicUsize>,
}

impl FakeHost {
    fn new() -> (Self, mpsc::UnboundedReceiver<Opened>) {
        let (opened, rx) = mpsc::unbounded_channel();
        (Self { opened, warm_ups: Arc::new(AtomicUsize::new(0)) }, rx)
    }

    fn record(&self, browser: Option<&str>, uri: &Url) -> Result<(), String> {
        self.opened
            .send(Opened { browser: browser.map(str::to_string), uri: uri.clone() })
            .map_err(|_| "host gone".to_string())
    }
}

impl AuthTabHost for FakeHost {
    fn open_auth_tab(
        &self,
        browser_package: Option<&str>,
        uri: &Url,
        _redirect_uri: &Url,
    ) -> Result<(), String> {
        self.record(browser_package, uri)
    }
}

impl BrowserTabHost for FakeHost {
    fn warm_up(&self, _browser_package: Option<&str>) {
        self.warm_ups.fetch_add(1, Ordering::SeqCst);
    }

    fn open_tab(&self, browser_package: Option<&str>, uri: &Url) -> Result<(), String> {
        self.record(browser_package, uri)
    }
}

struct FixedProbe(Vec<InstalledBrowser>);

impl BrowserProbe for FixedProbe {
    fn installed_browsers(&self) -> Vec<InstalledBrowser> {
        self.0.clone()
    }
}

fn browser(package: &str, version: u32, supports_auth_tab: bool) -> InstalledBrowser {
    InstalledBrowser { package: package.to_string(), version, supports_auth_tab }
}

struct Provider {
    server: MockServer,
    signer: TestSigner,
}

impl Provider {
    async fn start() -> Self {
        let server = MockServer::start().await;
        let signer = TestSigner::generate("kid-e2e");
        let issuer = server.uri();

        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issuer": issuer,
                "authorization_endpoint": format!("{issuer}/oauth2/authorize"),
                "token_endpoint": format!("{issuer}/oauth2/token"),
                "end_session_endpoint": format!("{issuer}/oidc/logout"),
                "jwks_uri": format!("{issuer}/.well-known/jwks"),
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/.well-known/jwks"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "keys": [signer.jwk()] })),
            )
            .mount(&server)
            .await;

        Self { server, signer }
    }

    fn issuer(&self) -> String {
        self.server.uri()
    }

    async fn issue_token_for(&self, code: &str, subject: &str) {
        let id_token = self.signer.sign(&id_token_claims(&self.issuer(), subject));
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains(format!("code={code}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id_token": id_token,
                "access_token": "access",
                "token_type": "Bearer",
                "expires_in": 600
            })))
            .expect(1)
            .mount(&self.server)
            .await;
    }
}

async fn controller_for(
    provider: &Provider,
    probe: &FixedProbe,
) -> (FlowController, SelectedLauncher<FakeHost, FakeHost>, FakeHost, mpsc::UnboundedReceiver<Opened>)
{
    let (host, opened) = FakeHost::new();
    let launcher = select_launcher(probe, host.clone(), host.clone());

    let config = FlowConfig::new(provider.issuer(), CLIENT_ID, REDIRECT);
    let controller = FlowController::new(&config, http_ports(&config, launcher.agent()).unwrap())
        .unwrap();
    assert!(controller.initialize().await.is_ready());

    (controller, launcher, host, opened)
}

async fn next_opened(opened: &mut mpsc::UnboundedReceiver<Opened>) -> Opened {
    tokio::time::timeout(Duration::from_secs(5), opened.recv())
        .await
        .expect("tab opened in time")
        .expect("host still connected")
}

/// Validates sign-in through an auth tab against a mock provider.
///
/// # Test Steps
/// 1. Select the auth tab launcher from a recent Chrome
/// 2. Start login and capture the opened authorization URI
/// 3. Feed back the tab's OK result with the matching state
/// 4. Verify the claims and that a duplicate result is ignored
#[tokio::test]
async fn auth_tab_login_against_mock_provider() {
    let provider = Provider::start().await;
    let probe = FixedProbe(vec![browser("com.android.chrome", 140, true)]);
    let (controller, launcher, _host, mut opened) = controller_for(&provider, &probe).await;

    assert_eq!(launcher.mode(), PresentationMode::EphemeralAuthTab);
    assert_eq!(controller.presentation_mode(), PresentationMode::EphemeralAuthTab);
    let SelectedLauncher::AuthTab(tab) = &launcher else {
        panic!("expected auth tab launcher");
    };

    provider.issue_token_for("code-e2e", "user-42").await;

    let login = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.login(IdentityScheme::Mock).await })
    };
    let launch = next_opened(&mut opened).await;
    assert_eq!(launch.browser.as_deref(), Some("com.android.chrome"));
    assert_eq!(launch.uri.path(), "/oauth2/authorize");
    assert!(tab.is_active());

    let callback = launch.callback(&format!("code=code-e2e&state={}", launch.state()));
    assert!(tab.on_result(AuthTabResult::ok(callback.clone())).await);

    let claims = login.await.unwrap().unwrap();
    assert_eq!(claims.subject, "user-42");
    assert_eq!(claims.identity_scheme.as_deref(), Some("urn:grn:authn:mock"));
    assert_eq!(controller.phase().await, FlowPhase::Idle);

    assert!(!tab.on_result(AuthTabResult::ok(callback)).await);
}

#[tokio::test]
async fn auth_tab_cancel_resolves_login() {
    let provider = Provider::start().await;
    let probe = FixedProbe(vec![browser("com.android.chrome", 140, true)]);
    let (controller, launcher, _host, mut opened) = controller_for(&provider, &probe).await;
    let SelectedLauncher::AuthTab(tab) = &launcher else {
        panic!("expected auth tab launcher");
    };

    let login = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.login(IdentityScheme::NoBankId).await })
    };
    next_opened(&mut opened).await;

    assert!(tab.on_result(AuthTabResult::canceled()).await);
    assert_eq!(
        login.await.unwrap().unwrap_err(),
        FlowError::LaunchFailure(LaunchFailureReason::UserCancelled)
    );
    assert!(!tab.is_active());
}

/// Validates sign-in and sign-out through a general browser tab.
///
/// # Test Steps
/// 1. Select the browser tab launcher from a device without auth tab support
/// 2. Verify the browser was warmed up once
/// 3. Log in, routing an unrelated link and then the redirect
/// 4. Log out with the ID token and route the post-logout redirect
#[tokio::test]
async fn browser_tab_login_and_logout() {
    let provider = Provider::start().await;
    let probe = FixedProbe(vec![
        browser("com.example.otherbrowser", 1, false),
        browser("org.mozilla.firefox", 120, false),
    ]);
    let (controller, launcher, host, mut opened) = controller_for(&provider, &probe).await;

    assert_eq!(launcher.mode(), PresentationMode::GeneralBrowserTab);
    let SelectedLauncher::BrowserTab(tab) = &launcher else {
        panic!("expected browser tab launcher");
    };
    assert_eq!(host.warm_ups.load(Ordering::SeqCst), 1);

    provider.issue_token_for("code-tab", "user-7").await;

    let login = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.login(IdentityScheme::Mock).await })
    };
    let launch = next_opened(&mut opened).await;
    assert_eq!(launch.browser.as_deref(), Some("org.mozilla.firefox"));

    let unrelated = Url::parse("https://app.example/promo?state=x").unwrap();
    assert!(!tab.on_redirect_intent(&unrelated).await);
    assert!(tab.is_active());

    let callback = launch.callback(&format!("code=code-tab&state={}", launch.state()));
    assert!(tab.on_redirect_intent(&callback).await);
    let claims = login.await.unwrap().unwrap();
    assert_eq!(claims.subject, "user-7");

    let logout = {
        let controller = controller.clone();
        let hint = claims.raw_token.clone();
        tokio::spawn(async move { controller.logout(Some(&hint)).await })
    };
    let launch = next_opened(&mut opened).await;
    assert_eq!(launch.uri.path(), "/oidc/logout");

    assert!(tab.on_redirect_intent(&launch.callback(&format!("state={}", launch.state()))).await);
    logout.await.unwrap().unwrap();

    assert_eq!(host.warm_ups.load(Ordering::SeqCst), 1);
    assert_eq!(controller.phase().await, FlowPhase::Idle);
}

/// Validates that a stale redirect does not shut out the real one.
///
/// # Test Steps
/// 1. Start login through a browser tab
/// 2. Route a redirect left over from an earlier attempt
/// 3. Verify the flow and the launcher are still waiting
/// 4. Route the real redirect and verify login completes
#[tokio::test]
async fn browser_tab_stale_redirect_then_real_one() {
    let provider = Provider::start().await;
    let probe = FixedProbe(vec![browser("org.mozilla.firefox", 120, false)]);
    let (controller, launcher, _host, mut opened) = controller_for(&provider, &probe).await;
    let SelectedLauncher::BrowserTab(tab) = &launcher else {
        panic!("expected browser tab launcher");
    };

    provider.issue_token_for("code-fresh", "user-9").await;

    let login = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.login(IdentityScheme::Mock).await })
    };
    let launch = next_opened(&mut opened).await;

    let stale = launch.callback("code=code-old&state=stale-state");
    assert!(tab.on_redirect_intent(&stale).await);
    assert_eq!(controller.phase().await, FlowPhase::AwaitingCallback);
    assert!(tab.is_active());

    let callback = launch.callback(&format!("code=code-fresh&state={}", launch.state()));
    assert!(tab.on_redirect_intent(&callback).await);
    assert!(!tab.is_active());

    let claims = tokio::time::timeout(Duration::from_secs(5), login)
        .await
        .expect("login resolved")
        .unwrap()
        .unwrap();
    assert_eq!(claims.subject, "user-9");
    assert_eq!(controller.phase().await, FlowPhase::Idle);
}

#[tokio::test]
async fn browser_tab_cancel_after_stale_redirect_resolves_login() {
    let provider = Provider::start().await;
    let probe = FixedProbe(vec![browser("org.mozilla.firefox", 120, false)]);
    let (controller, launcher, _host, mut opened) = controller_for(&provider, &probe).await;
    let SelectedLauncher::BrowserTab(tab) = &launcher else {
        panic!("expected browser tab launcher");
    };

    let login = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.login(IdentityScheme::Mock).await })
    };
    let launch = next_opened(&mut opened).await;

    assert!(tab.on_redirect_intent(&launch.callback("state=forged")).await);
    assert!(tab.on_cancelled().await);

    assert_eq!(
        login.await.unwrap().unwrap_err(),
        FlowError::LaunchFailure(LaunchFailureReason::UserCancelled)
    );
    assert!(!tab.is_active());
}

#[tokio::test]
async fn unreachable_provider_leaves_controller_not_ready() {
    let server = MockServer::start().await;
    let issuer = server.uri();
    drop(server);

    let (host, _opened) = FakeHost::new();
    let probe = FixedProbe(vec![browser("com.android.chrome", 140, true)]);
    let launcher = select_launcher(&probe, host.clone(), host);

    let mut config = FlowConfig::new(issuer, CLIENT_ID, REDIRECT);
    config.http_timeout_seconds = 2;
    let controller =
        FlowController::new(&config, http_ports(&config, launcher.agent()).unwrap()).unwrap();

    let readiness = controller.initialize().await;
    assert!(!readiness.metadata_loaded);
    assert!(!readiness.keys_loaded);
    assert!(matches!(
        controller.login(IdentityScheme::Mock).await,
        Err(FlowError::NotReady(_))
    ));
}
