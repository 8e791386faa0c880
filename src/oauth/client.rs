//! Okta OAuth client for token exchange and identity retrieval.
//!
//! Covers the two server-leg calls of the authorization-code flow:
//! exchanging the callback code for tokens and reading the userinfo
//! endpoint with the resulting access token.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{Endpoints, ServiceConfig};
use crate::error::{oauth_error, Error, ErrorKind, OAuthErrorKind};
use crate::http::{build_client, HttpConfig};
use crate::oauth::identity::IdentityClaims;
use crate::secret;

/// Token response from Okta.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
    id_token: Option<String>,
    #[serde(default)]
    scope: String,
}

/// Error body returned by the token endpoint.
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Request to exchange an authorization code for tokens.
#[derive(Debug, Serialize)]
struct TokenExchangeRequest {
    code: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    grant_type: String,
}

/// Tokens produced by a successful code exchange.
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: SecretString,
    /// Present only when the provider returned one; absence must not
    /// clobber a refresh token the account system already stored.
    pub refresh_token: Option<SecretString>,
    pub id_token: Option<String>,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    /// Absolute expiry, computed when the exchange response arrived.
    pub expires_at: DateTime<Utc>,
    /// Scopes the provider actually granted.
    pub scope: String,
}

/// Okta OAuth client for the server leg of the login flow.
pub struct OktaClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    endpoints: Endpoints,
}

impl OktaClient {
    /// Create a client from a validated service configuration.
    ///
    /// `secret_key` opens a sealed client secret when the host stores it
    /// sealed; `redirect_uri` must be the exact value used on the
    /// authorize request.
    pub fn new(
        config: &ServiceConfig,
        secret_key: Option<&str>,
        endpoints: Endpoints,
        http_config: &HttpConfig,
        redirect_uri: String,
    ) -> Result<Self, Error> {
        config.validate()?;
        let client_secret = secret::open_secret(&config.secret, secret_key)?;
        let http = build_client(http_config)?;

        Ok(Self {
            http,
            client_id: config.client_id.clone(),
            client_secret,
            redirect_uri,
            endpoints,
        })
    }

    /// Exchange an authorization code for tokens.
    ///
    /// A body carrying an `error` field is the provider rejecting the
    /// code (invalid, expired, or reused); anything else that isn't a
    /// parseable success body is a transport failure.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet, Error> {
        let request = TokenExchangeRequest {
            code: code.to_string(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.expose_secret().to_string(),
            redirect_uri: self.redirect_uri.clone(),
            grant_type: "authorization_code".to_string(),
        };

        debug!("exchanging authorization code with Okta");

        let response = self
            .http
            .post(&self.endpoints.token_url)
            .form(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("failed to reach the Okta token endpoint: {:?}", e);
                Error {
                    source: Some(Box::new(e)),
                    error_kind: ErrorKind::OAuth(OAuthErrorKind::TransportFailure),
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            warn!("failed to read the token endpoint response: {:?}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::OAuth(OAuthErrorKind::TransportFailure),
            }
        })?;

        if let Ok(rejection) = serde_json::from_str::<ProviderErrorBody>(&body) {
            warn!(
                "Okta rejected the authorization code: {} {}",
                rejection.error,
                rejection.error_description.as_deref().unwrap_or("")
            );
            return Err(oauth_error(OAuthErrorKind::ProviderRejected, &rejection.error));
        }

        if !status.is_success() {
            warn!("Okta token endpoint returned {}", status);
            return Err(oauth_error(
                OAuthErrorKind::TransportFailure,
                &format!("token endpoint returned {}", status),
            ));
        }

        let tokens: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            warn!("failed to parse the Okta token response: {:?}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::OAuth(OAuthErrorKind::TransportFailure),
            }
        })?;

        info!("exchanged authorization code for Okta tokens");

        Ok(TokenSet {
            access_token: SecretString::from(tokens.access_token),
            refresh_token: tokens.refresh_token.map(SecretString::from),
            id_token: tokens.id_token,
            expires_in: tokens.expires_in,
            expires_at: Utc::now() + Duration::seconds(tokens.expires_in),
            scope: tokens.scope,
        })
    }

    /// Read the userinfo endpoint with an access token.
    ///
    /// Returns the raw claims map; field-level checks happen during
    /// normalization.
    pub async fn fetch_identity(&self, access_token: &SecretString) -> Result<IdentityClaims, Error> {
        let response = self
            .http
            .get(&self.endpoints.userinfo_url)
            .bearer_auth(access_token.expose_secret())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                warn!("failed to reach the Okta userinfo endpoint: {:?}", e);
                Error {
                    source: Some(Box::new(e)),
                    error_kind: ErrorKind::OAuth(OAuthErrorKind::IdentityFetchFailure),
                }
            })?;

        if !response.status().is_success() {
            warn!("Okta userinfo endpoint returned {}", response.status());
            return Err(oauth_error(
                OAuthErrorKind::IdentityFetchFailure,
                &format!("userinfo endpoint returned {}", response.status()),
            ));
        }

        let claims: serde_json::Map<String, serde_json::Value> =
            response.json().await.map_err(|e| {
                warn!("failed to parse the Okta userinfo response: {:?}", e);
                Error {
                    source: Some(Box::new(e)),
                    error_kind: ErrorKind::OAuth(OAuthErrorKind::IdentityFetchFailure),
                }
            })?;

        Ok(IdentityClaims::new(claims))
    }
}
