//! Login flow coordination: the request leg and the callback leg.
//!
//! One `Coordinator` serves every login attempt. Each attempt walks
//! `Idle -> AuthorizeUrlBuilt -> AwaitingCallback -> CodeReceived ->
//! TokensExchanged -> IdentityFetched -> Normalized`, short-circuiting
//! to `Failed` on the first error. Nothing is retried at this layer and
//! no account state is written unless every step succeeded.

use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};
use url::Url;

use crate::config::{ConfigStore, Endpoints, ServiceConfig};
use crate::error::{
    configuration_error, oauth_error, validation_error, ConfigurationErrorKind, Error, ErrorKind,
    OAuthErrorKind, ValidationErrorKind,
};
use crate::hooks::{AccountUpsert, LoginLauncher, PopupOptions, UserId};
use crate::http::HttpConfig;
use crate::oauth::client::{OktaClient, TokenSet};
use crate::oauth::identity::{normalize, CanonicalIdentity, Profile};
use crate::oauth::{
    build_authorize_url, credential_token, redirect_uri, LoginOptions, LoginStyle,
    PendingAttempts, StateCodec,
};

/// Where a login attempt currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    Idle,
    AuthorizeUrlBuilt,
    AwaitingCallback,
    CodeReceived,
    TokensExchanged,
    IdentityFetched,
    /// Terminal success.
    Normalized,
    /// Terminal failure, reachable from every state after
    /// `AuthorizeUrlBuilt`.
    Failed(ErrorKind),
}

impl FlowState {
    /// The failure state an error short-circuits to.
    pub fn from_failure(error: &Error) -> Self {
        FlowState::Failed(error.error_kind.clone())
    }
}

/// Result of starting a login attempt.
#[derive(Debug)]
pub struct LoginRequest {
    /// Authorize URL the user is sent to.
    pub url: String,
    /// Per-attempt token, consumed when the callback arrives.
    pub credential_token: String,
    pub state: FlowState,
}

/// Query parameters of the provider's redirect callback.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: String,
    /// Set instead of `code` when the provider refused the login.
    pub error: Option<String>,
}

/// Result of a completed callback, handed to account creation/lookup.
#[derive(Debug, Clone)]
pub struct CallbackOutcome {
    /// Token fields plus whitelisted identity claims, as stored by the
    /// account system.
    pub service_data: Map<String, Value>,
    /// Profile fields surfaced on the user record.
    pub profile: Profile,
    /// Where to send the user after the login completes.
    pub redirect_url: String,
    pub state: FlowState,
}

impl CallbackOutcome {
    fn assemble(tokens: TokenSet, identity: CanonicalIdentity, redirect_url: String) -> Self {
        let mut service_data = Map::new();
        service_data.insert(
            "access_token".to_string(),
            Value::from(tokens.access_token.expose_secret().to_string()),
        );
        if let Some(id_token) = &tokens.id_token {
            service_data.insert("id_token".to_string(), Value::from(id_token.clone()));
        }
        service_data.insert(
            "expires_at".to_string(),
            Value::from(tokens.expires_at.timestamp_millis()),
        );
        if !tokens.scope.is_empty() {
            service_data.insert("scope".to_string(), Value::from(tokens.scope.clone()));
        }

        for (field, value) in &identity.claims {
            service_data.insert(field.clone(), value.clone());
        }

        // Only set when the provider returned one, so a previously
        // stored refresh token is never overwritten by its absence.
        if let Some(refresh_token) = &tokens.refresh_token {
            service_data.insert(
                "refresh_token".to_string(),
                Value::from(refresh_token.expose_secret().to_string()),
            );
        }

        Self {
            service_data,
            profile: identity.profile,
            redirect_url,
            state: FlowState::Normalized,
        }
    }
}

/// Coordinates the authorization-code login flow for the Okta service.
pub struct Coordinator<S: ConfigStore> {
    config_store: S,
    site_url: Url,
    codec: StateCodec,
    attempts: PendingAttempts,
    http_config: HttpConfig,
    endpoints: Option<Endpoints>,
    secret_key: Option<String>,
    launcher: Option<Box<dyn LoginLauncher>>,
    popup: PopupOptions,
}

impl<S: ConfigStore> Coordinator<S> {
    /// Create a coordinator.
    ///
    /// `site_url` is the site's own root URL; the redirect URI and every
    /// post-login return target resolve under it. `state_key` signs the
    /// state parameter.
    pub fn new(config_store: S, site_url: Url, state_key: impl Into<Vec<u8>>) -> Self {
        Self {
            config_store,
            site_url,
            codec: StateCodec::new(state_key),
            attempts: PendingAttempts::new(),
            http_config: HttpConfig::default(),
            endpoints: None,
            secret_key: None,
            launcher: None,
            popup: PopupOptions::default(),
        }
    }

    /// Override the HTTP client configuration.
    pub fn with_http_config(mut self, http_config: HttpConfig) -> Self {
        self.http_config = http_config;
        self
    }

    /// Override the provider endpoints (tests point these at a mock
    /// server; production derives them from the configured domain).
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Key for opening a sealed client secret.
    pub fn with_secret_key(mut self, key_hex: &str) -> Self {
        self.secret_key = Some(key_hex.to_string());
        self
    }

    /// Attach the host framework's login launcher.
    pub fn with_launcher(mut self, launcher: Box<dyn LoginLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Override the popup geometry passed to the launcher.
    pub fn with_popup_options(mut self, popup: PopupOptions) -> Self {
        self.popup = popup;
        self
    }

    /// Override the pending-attempt store (e.g. a shorter TTL).
    pub fn with_attempts(mut self, attempts: PendingAttempts) -> Self {
        self.attempts = attempts;
        self
    }

    /// Start a login attempt.
    ///
    /// Builds the authorize URL, registers the credential token, and
    /// hands the URL to the launcher when one is attached. A missing
    /// service configuration fails here, synchronously, before anything
    /// else happens.
    pub async fn request_login(
        &self,
        login_style: LoginStyle,
        options: &LoginOptions,
        return_to: Option<&str>,
    ) -> Result<LoginRequest, Error> {
        let config = self.config_store.load().ok_or_else(|| {
            configuration_error(
                ConfigurationErrorKind::Missing,
                "no service configuration for okta",
            )
        })?;
        config.validate()?;

        let credential_token = credential_token();
        let built = build_authorize_url(
            login_style,
            &credential_token,
            &config,
            options,
            &self.codec,
            &self.site_url,
            return_to,
        )?;

        self.attempts
            .register(&credential_token, login_style, &built.redirect_url);

        info!("okta login attempt started, style {}", login_style.as_str());

        if let Some(launcher) = &self.launcher {
            launcher.launch(&built.url, login_style, &self.popup).await?;
        }

        Ok(LoginRequest {
            url: built.url,
            credential_token,
            state: FlowState::AwaitingCallback,
        })
    }

    /// Handle the provider's redirect callback.
    ///
    /// Verifies and consumes the attempt, then runs code exchange,
    /// identity fetch, and normalization in order. The first failure
    /// aborts the attempt; an authorization code is submitted for
    /// exchange at most once.
    pub async fn handle_callback(
        &self,
        query: &CallbackQuery,
        config: &ServiceConfig,
    ) -> Result<CallbackOutcome, Error> {
        config.validate()?;

        let payload = self.codec.decode(&query.state)?;
        self.attempts
            .consume(&payload.credential_token)
            .ok_or_else(|| {
                validation_error(
                    ValidationErrorKind::UnknownCredentialToken,
                    "credential token unknown, expired, or already used",
                )
            })?;

        if let Some(provider_error) = &query.error {
            warn!("okta callback carried an error: {}", provider_error);
            return Err(oauth_error(OAuthErrorKind::ProviderRejected, provider_error));
        }
        let code = query.code.as_deref().ok_or_else(|| {
            oauth_error(
                OAuthErrorKind::ProviderRejected,
                "callback carried neither code nor error",
            )
        })?;

        let endpoints = self
            .endpoints
            .clone()
            .unwrap_or_else(|| Endpoints::for_domain(&config.domain));
        let client = OktaClient::new(
            config,
            self.secret_key.as_deref(),
            endpoints,
            &self.http_config,
            redirect_uri(&self.site_url)?,
        )?;

        let tokens = client.exchange_code(code).await?;
        let claims = client.fetch_identity(&tokens.access_token).await?;
        let identity = normalize(claims)?;

        info!("okta login completed for provider user {}", identity.id);

        Ok(CallbackOutcome::assemble(
            tokens,
            identity,
            payload.redirect_url,
        ))
    }

    /// Handle the callback and resolve the account record in one step.
    pub async fn login(
        &self,
        query: &CallbackQuery,
        config: &ServiceConfig,
        accounts: &dyn AccountUpsert,
    ) -> Result<UserId, Error> {
        let outcome = self.handle_callback(query, config).await?;
        accounts.upsert(&outcome).await
    }
}
