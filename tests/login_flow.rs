//! End-to-end login flow against a mock provider.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use mockito::{Matcher, Server};
use url::Url;

use okta_auth::config::{ConfigStore, Endpoints, ServiceConfig};
use okta_auth::error::{Error, ErrorKind, OAuthErrorKind, ValidationErrorKind};
use okta_auth::flow::{CallbackOutcome, CallbackQuery, Coordinator, FlowState};
use okta_auth::hooks::{AccountUpsert, UserId};
use okta_auth::oauth::{LoginOptions, LoginStyle};
use okta_auth::secret;

struct StaticConfig(ServiceConfig);

impl ConfigStore for StaticConfig {
    fn load(&self) -> Option<ServiceConfig> {
        Some(self.0.clone())
    }
}

fn test_config() -> ServiceConfig {
    ServiceConfig::new("example.okta.com", "cid", "enc")
}

#[derive(Default)]
struct RecordingAccounts {
    upserted: Arc<Mutex<Vec<String>>>,
}

#[async_trait::async_trait]
impl AccountUpsert for RecordingAccounts {
    async fn upsert(&self, outcome: &CallbackOutcome) -> Result<UserId, Error> {
        let provider_id = outcome.service_data["id"].as_str().unwrap().to_string();
        self.upserted.lock().unwrap().push(provider_id.clone());
        Ok(format!("user-{}", provider_id))
    }
}

fn site() -> Url {
    Url::parse("https://app.example.com/").unwrap()
}

fn coordinator_with(server_url: &str, config: ServiceConfig) -> Coordinator<StaticConfig> {
    let endpoints = Endpoints {
        authorize_url: "https://example.okta.com/oauth2/v1/authorize".to_string(),
        token_url: format!("{}/oauth2/v1/token", server_url),
        userinfo_url: format!("{}/oauth2/v1/userinfo", server_url),
    };
    Coordinator::new(StaticConfig(config), site(), b"state-signing-key".to_vec())
        .with_endpoints(endpoints)
}

fn state_from(url: &str) -> String {
    Url::parse(url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.to_string())
        .unwrap()
}

#[tokio::test]
async fn full_login_flow() {
    let mut server = Server::new_async().await;

    let token_mock = server
        .mock("POST", "/oauth2/v1/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("code".into(), "XYZ".into()),
            Matcher::UrlEncoded("client_id".into(), "cid".into()),
            Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
            Matcher::UrlEncoded(
                "redirect_uri".into(),
                "https://app.example.com/_oauth/okta".into(),
            ),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"AT","expires_in":3600,"id_token":"IDT"}"#)
        .create_async()
        .await;

    let userinfo_mock = server
        .mock("GET", "/oauth2/v1/userinfo")
        .match_header("authorization", "Bearer AT")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"sub":"abc123","name":"A","email":"a@x.com","locale":"en-US"}"#)
        .create_async()
        .await;

    let coordinator = coordinator_with(&server.url(), test_config());

    let request = coordinator
        .request_login(LoginStyle::Redirect, &LoginOptions::default(), Some("/dashboard"))
        .await
        .unwrap();
    assert_eq!(request.state, FlowState::AwaitingCallback);

    let authorize = Url::parse(&request.url).unwrap();
    assert_eq!(authorize.host_str(), Some("example.okta.com"));
    assert_eq!(authorize.path(), "/oauth2/v1/authorize");
    let scope = authorize
        .query_pairs()
        .find(|(k, _)| k == "scope")
        .map(|(_, v)| v.to_string())
        .unwrap();
    assert_eq!(scope, "openid email profile");

    let query = CallbackQuery {
        code: Some("XYZ".to_string()),
        state: state_from(&request.url),
        error: None,
    };

    let before = Utc::now().timestamp_millis();
    let outcome = coordinator.handle_callback(&query, &test_config()).await.unwrap();

    token_mock.assert_async().await;
    userinfo_mock.assert_async().await;

    assert_eq!(outcome.state, FlowState::Normalized);
    assert_eq!(outcome.redirect_url, "https://app.example.com/dashboard");
    assert_eq!(outcome.service_data["access_token"], "AT");
    assert_eq!(outcome.service_data["id_token"], "IDT");
    assert_eq!(outcome.service_data["id"], "abc123");
    assert_eq!(outcome.service_data["name"], "A");
    assert!(!outcome.service_data.contains_key("locale"));
    assert!(!outcome.service_data.contains_key("refresh_token"));
    assert_eq!(outcome.profile.name.as_deref(), Some("A"));
    assert_eq!(outcome.profile.email.as_deref(), Some("a@x.com"));

    let expires_at = outcome.service_data["expires_at"].as_i64().unwrap();
    let expected = before + 3_600_000;
    assert!((expires_at - expected).abs() < 5_000);

    // The credential token was consumed; replaying the callback fails
    // without touching the provider again.
    let replay = coordinator
        .handle_callback(&query, &test_config())
        .await
        .unwrap_err();
    assert_eq!(
        replay.error_kind,
        ErrorKind::Validation(ValidationErrorKind::UnknownCredentialToken)
    );
}

#[tokio::test]
async fn provider_error_callback_makes_no_outbound_call() {
    let mut server = Server::new_async().await;
    let token_mock = server
        .mock("POST", "/oauth2/v1/token")
        .expect(0)
        .create_async()
        .await;

    let coordinator = coordinator_with(&server.url(), test_config());
    let request = coordinator
        .request_login(LoginStyle::Redirect, &LoginOptions::default(), None)
        .await
        .unwrap();

    let query = CallbackQuery {
        code: None,
        state: state_from(&request.url),
        error: Some("access_denied".to_string()),
    };

    let err = coordinator
        .handle_callback(&query, &test_config())
        .await
        .unwrap_err();
    assert_eq!(
        err.error_kind,
        ErrorKind::OAuth(OAuthErrorKind::ProviderRejected)
    );
    token_mock.assert_async().await;
}

#[tokio::test]
async fn rejected_code_produces_no_token_set() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/oauth2/v1/token")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"invalid_grant"}"#)
        .create_async()
        .await;
    let userinfo_mock = server
        .mock("GET", "/oauth2/v1/userinfo")
        .expect(0)
        .create_async()
        .await;

    let coordinator = coordinator_with(&server.url(), test_config());
    let request = coordinator
        .request_login(LoginStyle::Redirect, &LoginOptions::default(), None)
        .await
        .unwrap();

    let query = CallbackQuery {
        code: Some("reused".to_string()),
        state: state_from(&request.url),
        error: None,
    };

    let err = coordinator
        .handle_callback(&query, &test_config())
        .await
        .unwrap_err();
    assert_eq!(
        err.error_kind,
        ErrorKind::OAuth(OAuthErrorKind::ProviderRejected)
    );
    // Identity fetch never runs after a failed exchange.
    userinfo_mock.assert_async().await;
}

#[tokio::test]
async fn sealed_secret_is_opened_for_the_exchange() {
    const KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    let mut server = Server::new_async().await;
    let token_mock = server
        .mock("POST", "/oauth2/v1/token")
        .match_body(Matcher::UrlEncoded(
            "client_secret".into(),
            "the-real-secret".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"AT","expires_in":600}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/oauth2/v1/userinfo")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"sub":"abc123"}"#)
        .create_async()
        .await;

    let sealed = secret::seal("the-real-secret", KEY).unwrap();
    let config = ServiceConfig::new("example.okta.com", "cid", &sealed);

    let coordinator =
        coordinator_with(&server.url(), config.clone()).with_secret_key(KEY);
    let request = coordinator
        .request_login(LoginStyle::Redirect, &LoginOptions::default(), None)
        .await
        .unwrap();

    let query = CallbackQuery {
        code: Some("XYZ".to_string()),
        state: state_from(&request.url),
        error: None,
    };

    let outcome = coordinator.handle_callback(&query, &config).await.unwrap();
    token_mock.assert_async().await;
    assert_eq!(outcome.service_data["id"], "abc123");
}

#[tokio::test]
async fn login_resolves_the_account_record() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/oauth2/v1/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"AT","expires_in":3600}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/oauth2/v1/userinfo")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"sub":"abc123","name":"A","email":"a@x.com"}"#)
        .create_async()
        .await;

    let coordinator = coordinator_with(&server.url(), test_config());
    let request = coordinator
        .request_login(LoginStyle::Redirect, &LoginOptions::default(), None)
        .await
        .unwrap();

    let query = CallbackQuery {
        code: Some("XYZ".to_string()),
        state: state_from(&request.url),
        error: None,
    };

    let accounts = RecordingAccounts::default();
    let user_id = coordinator
        .login(&query, &test_config(), &accounts)
        .await
        .unwrap();

    assert_eq!(user_id, "user-abc123");
    assert_eq!(*accounts.upserted.lock().unwrap(), vec!["abc123"]);
}

#[tokio::test]
async fn failed_identity_fetch_writes_no_account_state() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/oauth2/v1/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"AT","expires_in":3600}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/oauth2/v1/userinfo")
        .with_status(500)
        .create_async()
        .await;

    let coordinator = coordinator_with(&server.url(), test_config());
    let request = coordinator
        .request_login(LoginStyle::Redirect, &LoginOptions::default(), None)
        .await
        .unwrap();

    let query = CallbackQuery {
        code: Some("XYZ".to_string()),
        state: state_from(&request.url),
        error: None,
    };

    let accounts = RecordingAccounts::default();
    let err = coordinator
        .login(&query, &test_config(), &accounts)
        .await
        .unwrap_err();

    assert_eq!(
        err.error_kind,
        ErrorKind::OAuth(OAuthErrorKind::IdentityFetchFailure)
    );
    assert!(accounts.upserted.lock().unwrap().is_empty());
}
