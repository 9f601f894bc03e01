//! End-to-end callback flow tests against a mocked identity provider.
//!
//! The mock server plays the provider's token and JWKS endpoints; tokens are
//! HS256-signed with a symmetric key published as an `oct` JWK so the full
//! exchange-verify-normalize-issue sequence runs without a real provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use cookie::Cookie;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::json;
use time::OffsetDateTime;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use outpost_auth::oidc::state::LoginStateStore;
use outpost_auth::storage::{SessionRecord, SessionStore, SessionStoreError};
use outpost_auth::{
    CallbackConfig, CallbackParams, CallbackState, CodeExchanger, CookieConfig, JwksCache,
    JwksCacheConfig, LoginState, ProviderConfig, ProxyClaims, TokenVerifier, callback_handler,
};
use outpost_session_memory::{MemoryLoginStateStore, MemorySessionStore};

const ISSUER: &str = "https://auth.example.com";
const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";
// base64url of SECRET, no padding.
const SECRET_B64: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY";

fn sign_token(exp: i64, proxy: Option<serde_json::Value>) -> String {
    let mut claims = json!({
        "iss": ISSUER,
        "aud": "outpost",
        "sub": "user-123",
        "exp": exp,
    });
    if let Some(proxy) = proxy {
        claims["proxy"] = proxy;
    }

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some("k1".to_string());
    encode(&header, &claims, &EncodingKey::from_secret(SECRET)).unwrap()
}

async fn mount_jwks(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keys": [{
                "kty": "oct",
                "kid": "k1",
                "use": "sig",
                "alg": "HS256",
                "k": SECRET_B64
            }]
        })))
        .mount(server)
        .await;
}

async fn mount_token_endpoint(server: &MockServer, access_token: &str) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

fn provider_for(server: &MockServer) -> ProviderConfig {
    ProviderConfig::new(
        ISSUER,
        "outpost",
        Url::parse("https://app.example.com/outpost/callback").unwrap(),
        Url::parse(&format!("{}/token", server.uri())).unwrap(),
        Url::parse(&format!("{}/jwks", server.uri())).unwrap(),
    )
}

fn callback_config(server: &MockServer) -> CallbackConfig {
    CallbackConfig::new(provider_for(server))
        .with_cookie(CookieConfig::default().with_secure(false))
        .with_clock_skew_tolerance(Duration::from_secs(0))
        .with_jwks(JwksCacheConfig::default().with_allow_http(true))
}

fn callback_state(server: &MockServer, session_store: Arc<dyn SessionStore>) -> CallbackState {
    let provider = provider_for(server);

    let http_client = reqwest::Client::new();
    let exchanger = Arc::new(CodeExchanger::new(http_client.clone(), provider.clone()));
    let jwks = Arc::new(JwksCache::new(
        http_client,
        JwksCacheConfig::default().with_allow_http(true),
    ));
    let verifier = Arc::new(TokenVerifier::new(jwks, &provider, Duration::from_secs(0)));

    CallbackState::new(
        Arc::new(MemoryLoginStateStore::new()),
        exchanger,
        verifier,
        session_store,
        CookieConfig::default().with_secure(false),
        "/",
    )
}

async fn run_callback(
    state: &CallbackState,
    code: Option<&str>,
    login_state: Option<&str>,
) -> Response {
    callback_handler(
        State(state.clone()),
        Query(CallbackParams {
            code: code.map(String::from),
            state: login_state.map(String::from),
        }),
        CookieJar::new(),
    )
    .await
}

fn session_cookie(response: &Response) -> Option<Cookie<'static>> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| Cookie::parse(v.to_str().unwrap().to_string()).unwrap())
}

fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string())
}

#[tokio::test]
async fn test_success_flow_sets_cookie_and_persists_session() {
    let server = MockServer::start().await;
    mount_jwks(&server).await;

    let exp = OffsetDateTime::now_utc().unix_timestamp() + 3600;
    mount_token_endpoint(&server, &sign_token(exp, None)).await;

    let sessions = Arc::new(MemorySessionStore::new());
    let state = callback_state(&server, sessions.clone());
    state
        .state_store
        .insert(LoginState::new("state-1").with_redirect("/app"))
        .await;

    let response = run_callback(&state, Some("abc123"), Some("state-1")).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/app"));

    let cookie = session_cookie(&response).expect("session cookie must be set");
    assert_eq!(cookie.name(), "outpost_session");
    let max_age = cookie.max_age().unwrap().whole_seconds();
    assert!((3598..=3600).contains(&max_age), "max_age was {max_age}");

    // The persisted claims carry a synthesized, non-null proxy sub-structure.
    let record = sessions.get(cookie.value()).await.unwrap().unwrap();
    assert_eq!(record.claims.sub, "user-123");
    assert_eq!(record.claims.exp, exp);
    assert_eq!(record.claims.proxy, ProxyClaims::default());
    assert!(!record.claims.raw_token.is_empty());
}

#[tokio::test]
async fn test_from_config_runs_the_full_flow() {
    let server = MockServer::start().await;
    mount_jwks(&server).await;

    let exp = OffsetDateTime::now_utc().unix_timestamp() + 3600;
    mount_token_endpoint(&server, &sign_token(exp, None)).await;

    let config = callback_config(&server).with_cookie(
        CookieConfig::default()
            .with_name("configured_session")
            .with_secure(false),
    );

    let sessions = Arc::new(MemorySessionStore::new());
    let state = CallbackState::from_config(
        config,
        Arc::new(MemoryLoginStateStore::new()),
        sessions.clone(),
    )
    .unwrap();
    state
        .state_store
        .insert(LoginState::new("state-1").with_redirect("/app"))
        .await;

    let response = run_callback(&state, Some("abc123"), Some("state-1")).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/app"));

    // The cookie settings came from the config, not a hand-wired default.
    let cookie = session_cookie(&response).expect("session cookie must be set");
    assert_eq!(cookie.name(), "configured_session");
    assert!(sessions.get(cookie.value()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_request_timeout_bounds_the_exchange() {
    let server = MockServer::start().await;

    // The provider stalls for longer than the configured timeout; the
    // exchange must fail soft and the flow degrade to a redirect.
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "never-delivered" }))
                .set_delay(Duration::from_secs(10)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = callback_config(&server).with_request_timeout(Duration::from_millis(250));

    let sessions = Arc::new(MemorySessionStore::new());
    let state = CallbackState::from_config(
        config,
        Arc::new(MemoryLoginStateStore::new()),
        sessions.clone(),
    )
    .unwrap();
    state.state_store.insert(LoginState::new("state-1")).await;

    let response = run_callback(&state, Some("abc123"), Some("state-1")).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(session_cookie(&response).is_none());
    assert!(sessions.is_empty().await);
}

#[tokio::test]
async fn test_proxy_claims_survive_into_session() {
    let server = MockServer::start().await;
    mount_jwks(&server).await;

    let exp = OffsetDateTime::now_utc().unix_timestamp() + 3600;
    let proxy = json!({ "host_header": "internal.example.com", "is_superuser": false });
    mount_token_endpoint(&server, &sign_token(exp, Some(proxy))).await;

    let sessions = Arc::new(MemorySessionStore::new());
    let state = callback_state(&server, sessions.clone());
    state.state_store.insert(LoginState::new("state-1")).await;

    let response = run_callback(&state, Some("abc123"), Some("state-1")).await;

    let cookie = session_cookie(&response).unwrap();
    let record = sessions.get(cookie.value()).await.unwrap().unwrap();
    assert_eq!(
        record.claims.proxy.host_header.as_deref(),
        Some("internal.example.com")
    );
    assert_eq!(record.claims.proxy.is_superuser, Some(false));
}

#[tokio::test]
async fn test_invalid_state_redirects_without_network_or_session() {
    let server = MockServer::start().await;

    // Neither endpoint may be touched when the state is unknown.
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let sessions = Arc::new(MemorySessionStore::new());
    let state = callback_state(&server, sessions.clone());

    let response = run_callback(&state, Some("abc123"), Some("never-issued")).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/"));
    assert!(session_cookie(&response).is_none());
    assert!(sessions.is_empty().await);

    // Missing state parameter behaves the same.
    let response = run_callback(&state, Some("abc123"), None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(sessions.is_empty().await);
}

#[tokio::test]
async fn test_state_cannot_be_replayed() {
    let server = MockServer::start().await;
    mount_jwks(&server).await;

    let exp = OffsetDateTime::now_utc().unix_timestamp() + 3600;
    mount_token_endpoint(&server, &sign_token(exp, None)).await;

    let sessions = Arc::new(MemorySessionStore::new());
    let state = callback_state(&server, sessions.clone());
    state.state_store.insert(LoginState::new("state-1")).await;

    let first = run_callback(&state, Some("abc123"), Some("state-1")).await;
    assert!(session_cookie(&first).is_some());

    // Same state again: silently redirected, no new session.
    let replay = run_callback(&state, Some("abc123"), Some("state-1")).await;
    assert_eq!(replay.status(), StatusCode::SEE_OTHER);
    assert!(session_cookie(&replay).is_none());
    assert_eq!(sessions.len().await, 1);
}

#[tokio::test]
async fn test_empty_code_redirects_with_zero_outbound_calls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let sessions = Arc::new(MemorySessionStore::new());
    let state = callback_state(&server, sessions.clone());
    state
        .state_store
        .insert(LoginState::new("state-1").with_redirect("/app"))
        .await;

    let response = run_callback(&state, None, Some("state-1")).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/app"));
    assert!(session_cookie(&response).is_none());
    assert!(sessions.is_empty().await);
}

#[tokio::test]
async fn test_expired_token_redirects_without_session() {
    let server = MockServer::start().await;
    mount_jwks(&server).await;

    let exp = OffsetDateTime::now_utc().unix_timestamp() - 600;
    mount_token_endpoint(&server, &sign_token(exp, None)).await;

    let sessions = Arc::new(MemorySessionStore::new());
    let state = callback_state(&server, sessions.clone());
    state.state_store.insert(LoginState::new("state-1")).await;

    let response = run_callback(&state, Some("abc123"), Some("state-1")).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(session_cookie(&response).is_none());
    assert!(sessions.is_empty().await);
}

#[tokio::test]
async fn test_exchange_failure_redirects_without_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "code already redeemed"
        })))
        .mount(&server)
        .await;

    let sessions = Arc::new(MemorySessionStore::new());
    let state = callback_state(&server, sessions.clone());
    state.state_store.insert(LoginState::new("state-1")).await;

    let response = run_callback(&state, Some("abc123"), Some("state-1")).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(session_cookie(&response).is_none());
    assert!(sessions.is_empty().await);
}

struct FailingSessionStore;

#[async_trait]
impl SessionStore for FailingSessionStore {
    async fn get(&self, _: &str) -> Result<Option<SessionRecord>, SessionStoreError> {
        Err(SessionStoreError::Backend("store offline".to_string()))
    }

    async fn save(&self, _: &SessionRecord) -> Result<(), SessionStoreError> {
        Err(SessionStoreError::Backend("store offline".to_string()))
    }
}

#[tokio::test]
async fn test_persist_failure_is_an_explicit_400() {
    let server = MockServer::start().await;
    mount_jwks(&server).await;

    let exp = OffsetDateTime::now_utc().unix_timestamp() + 3600;
    mount_token_endpoint(&server, &sign_token(exp, None)).await;

    let state = callback_state(&server, Arc::new(FailingSessionStore));
    state.state_store.insert(LoginState::new("state-1")).await;

    let response = run_callback(&state, Some("abc123"), Some("state-1")).await;

    // Identity was verified, so the failure is surfaced, not hidden behind
    // a redirect.
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(location(&response).is_none());
    assert!(session_cookie(&response).is_none());
}
