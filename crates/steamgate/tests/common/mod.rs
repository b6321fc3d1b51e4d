//! Test utilities and common setup.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::response::Response;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use steamgate::api::{self, AppState};
use steamgate::auth::{
    AuthState, Identity, SigningSecret, TokenIssuer, TokenLifetimes, TokenPair, TokenVerifier,
};
use steamgate::openid::{
    OpenIdError, OpenIdResult, OpenIdValidator, STEAM_OPENID_ENDPOINT, VerificationTransport,
};
use steamgate::profile::{ProfileError, ProfileProvider, ProfileResult, Profile};

pub const SECRET: &str = "test-secret-for-integration-tests-minimum-32-chars";
pub const PUBLIC_URL: &str = "http://localhost:8080";
pub const RETURN_URL: &str = "http://localhost:8080/api/auth/process";
pub const PLAYER_ID: &str = "76561198000000000";
pub const UNKNOWN_PLAYER_ID: &str = "76561198999999999";

/// What the stubbed provider says about every assertion.
#[derive(Debug, Clone, Copy)]
pub enum Verdict {
    Valid,
    Invalid,
    Unreachable,
}

/// Stands in for Steam's `check_authentication` endpoint.
pub struct StubTransport {
    verdict: Verdict,
    calls: AtomicUsize,
}

impl StubTransport {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerificationTransport for StubTransport {
    async fn check_authentication(
        &self,
        _endpoint: &str,
        params: &[(String, String)],
    ) -> OpenIdResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(
            params
                .iter()
                .any(|(k, v)| k == "openid.mode" && v == "check_authentication")
        );

        match self.verdict {
            Verdict::Valid => Ok("ns:http://specs.openid.net/auth/2.0\nis_valid:true\n".into()),
            Verdict::Invalid => Ok("ns:http://specs.openid.net/auth/2.0\nis_valid:false\n".into()),
            Verdict::Unreachable => Err(OpenIdError::Transport("connection refused".into())),
        }
    }
}

/// Knows exactly one player, optionally answering slowly.
#[derive(Default)]
pub struct StubProfiles {
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubProfiles {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileProvider for StubProfiles {
    async fn profile(&self, steam_id: &Identity) -> ProfileResult<Profile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if steam_id.as_str() != PLAYER_ID {
            return Err(ProfileError::PlayerNotFound(steam_id.to_string()));
        }

        Ok(Profile {
            id: PLAYER_ID.to_string(),
            name: "gordon".to_string(),
            url: "https://steamcommunity.com/id/gordon/".to_string(),
            avatar: "https://avatars.example/gordon_full.jpg".to_string(),
            kills: 20,
            deaths: 5,
            headshot_rate: 35,
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub transport: Arc<StubTransport>,
    pub profiles: Arc<StubProfiles>,
}

/// Router wired to stubs, with the provider confirming every assertion.
pub fn test_app() -> Router {
    test_app_with(Verdict::Valid).router
}

pub fn test_app_with(verdict: Verdict) -> TestApp {
    build_app(verdict, StubProfiles::default(), None)
}

/// Router whose profile lookups take `delay`, bounded by `request_timeout`.
pub fn test_app_with_slow_profiles(delay: Duration, request_timeout: Duration) -> TestApp {
    let profiles = StubProfiles {
        delay: Some(delay),
        ..StubProfiles::default()
    };
    build_app(Verdict::Valid, profiles, Some(request_timeout))
}

fn build_app(
    verdict: Verdict,
    profiles: StubProfiles,
    request_timeout: Option<Duration>,
) -> TestApp {
    let profiles = Arc::new(profiles);
    let transport = Arc::new(StubTransport {
        verdict,
        calls: AtomicUsize::new(0),
    });

    let validator = OpenIdValidator::new(
        Url::parse(STEAM_OPENID_ENDPOINT).unwrap(),
        Url::parse(RETURN_URL).unwrap(),
        transport.clone(),
    );

    let mut state = AppState::new(
        AuthState::new(TokenVerifier::new(SigningSecret::new(SECRET))),
        validator,
        Arc::new(issuer()),
        profiles.clone(),
    )
    .with_allowed_origins(vec!["http://localhost:3000".to_string()]);
    if let Some(timeout) = request_timeout {
        state = state.with_request_timeout(timeout);
    }

    TestApp {
        router: api::create_router(state),
        transport,
        profiles,
    }
}

pub fn issuer() -> TokenIssuer {
    TokenIssuer::new(SigningSecret::new(SECRET), TokenLifetimes::default())
}

/// Token pair for `id` issued at `now`.
pub fn tokens_for(id: &str, now: DateTime<Utc>) -> TokenPair {
    issuer()
        .generate_tokens_at(&Identity::new(id).unwrap(), now)
        .unwrap()
}

/// A positive assertion as Steam would append it to the return URL.
pub fn callback_query(claimed_id: &str) -> String {
    let mut url = Url::parse(RETURN_URL).unwrap();
    url.query_pairs_mut()
        .append_pair("openid.ns", "http://specs.openid.net/auth/2.0")
        .append_pair("openid.mode", "id_res")
        .append_pair("openid.op_endpoint", STEAM_OPENID_ENDPOINT)
        .append_pair("openid.claimed_id", claimed_id)
        .append_pair("openid.identity", claimed_id)
        .append_pair("openid.return_to", RETURN_URL)
        .append_pair("openid.response_nonce", "2024-01-01T00:00:00Zabc")
        .append_pair("openid.assoc_handle", "1234567890")
        .append_pair(
            "openid.signed",
            "signed,op_endpoint,claimed_id,identity,return_to,response_nonce,assoc_handle",
        )
        .append_pair("openid.sig", "c2lnbmF0dXJl");
    format!("/api/auth/process?{}", url.query().unwrap_or_default())
}

pub async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
