//! Authorize-URL construction for the login request leg.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{Endpoints, ServiceConfig, SERVICE_NAME};
use crate::error::{validation_error, Error, ValidationErrorKind};
use crate::oauth::state::{nonce, StateCodec, StatePayload};

/// Parameters the builder sets itself; callers may not override them.
pub const RESERVED_PARAMETERS: [&str; 5] = [
    "response_type",
    "client_id",
    "scope",
    "redirect_uri",
    "state",
];

/// Scopes every login requests so the user can sign in.
pub const DEFAULT_SCOPES: [&str; 3] = ["openid", "email", "profile"];

/// Scope that asks the provider for a refresh token.
const OFFLINE_ACCESS_SCOPE: &str = "wl.offline_access";

/// How the host framework presents the provider's login page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginStyle {
    Redirect,
    Popup,
}

impl LoginStyle {
    /// Get the login style identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginStyle::Redirect => "redirect",
            LoginStyle::Popup => "popup",
        }
    }
}

/// Caller-supplied options for a single login attempt.
#[derive(Debug, Clone, Default)]
pub struct LoginOptions {
    /// Request a refresh token via the offline-access scope.
    pub request_offline_token: bool,
    /// Additional scopes beyond the defaults.
    pub request_permissions: Vec<String>,
    /// Extra authorize-URL parameters; override config-supplied ones.
    pub login_url_parameters: BTreeMap<String, String>,
}

/// Result of building an authorize URL.
#[derive(Debug, Clone)]
pub struct BuiltAuthorizeUrl {
    /// Fully-qualified authorization endpoint URL.
    pub url: String,
    /// Absolute post-login return target, embedded in the state parameter.
    pub redirect_url: String,
}

/// The redirect URI the provider sends the user back to, per the host
/// framework's `_oauth/{service}` convention. Must be whitelisted in the
/// Okta application and must match exactly between the authorize and
/// token requests.
pub fn redirect_uri(site_url: &Url) -> Result<String, Error> {
    let joined = site_url.join(&format!("_oauth/{}", SERVICE_NAME)).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: crate::error::ErrorKind::Validation(ValidationErrorKind::InvalidRedirect),
    })?;
    Ok(joined.to_string())
}

/// Build the fully-qualified authorization endpoint URL.
///
/// Pure besides the random nonce and the signed state parameter: no
/// network traffic, no blocking. Query parameters appear in a
/// deterministic order so the output is directly assertable: extra
/// parameters in sorted key order, then the required parameters.
pub fn build_authorize_url(
    login_style: LoginStyle,
    credential_token: &str,
    config: &ServiceConfig,
    options: &LoginOptions,
    codec: &StateCodec,
    site_url: &Url,
    return_to: Option<&str>,
) -> Result<BuiltAuthorizeUrl, Error> {
    let scope = assemble_scopes(options);

    // Config-supplied parameters first, then caller options so they
    // override the configuration.
    let mut parameters = config.login_url_parameters.clone();
    parameters.extend(
        options
            .login_url_parameters
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );

    let violations: Vec<&str> = parameters
        .keys()
        .filter(|key| RESERVED_PARAMETERS.contains(&key.as_str()))
        .map(|key| key.as_str())
        .collect();
    if !violations.is_empty() {
        return Err(validation_error(
            ValidationErrorKind::ReservedParameter,
            &format!("reserved login-URL parameters: {}", violations.join(", ")),
        ));
    }

    let redirect_url = resolve_return_to(site_url, return_to)?;

    let payload = StatePayload::new(login_style, credential_token, &redirect_url);
    let state = codec.encode(&payload)?;

    // Required parameters are appended after the extras so nothing can
    // shadow them.
    let mut pairs: Vec<(String, String)> = parameters.into_iter().collect();
    pairs.push(("response_type".to_string(), "code".to_string()));
    pairs.push(("client_id".to_string(), config.client_id.clone()));
    pairs.push(("scope".to_string(), scope));
    pairs.push(("redirect_uri".to_string(), redirect_uri(site_url)?));
    pairs.push(("nonce".to_string(), nonce()));
    pairs.push(("state".to_string(), state));

    let query = pairs
        .iter()
        .map(|(param, value)| {
            format!(
                "{}={}",
                urlencoding::encode(param),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&");

    let endpoints = Endpoints::for_domain(&config.domain);
    let url = format!("{}?{}", endpoints.authorize_url, query);

    Ok(BuiltAuthorizeUrl { url, redirect_url })
}

/// Default scopes, the offline-access scope when requested, then the
/// caller's permissions. Duplicate tokens collapse, first-seen order wins.
fn assemble_scopes(options: &LoginOptions) -> String {
    let mut scopes: Vec<&str> = DEFAULT_SCOPES.to_vec();
    if options.request_offline_token {
        scopes.push(OFFLINE_ACCESS_SCOPE);
    }
    for permission in &options.request_permissions {
        for token in permission.split_whitespace() {
            if !scopes.contains(&token) {
                scopes.push(token);
            }
        }
    }
    scopes.join(" ")
}

/// Resolve the post-login return route to an absolute URL under the
/// site's own origin. Defaults to the site root; a single leading path
/// separator is stripped before resolving.
fn resolve_return_to(site_url: &Url, return_to: Option<&str>) -> Result<String, Error> {
    let route = return_to.unwrap_or("/");
    let route = route.strip_prefix('/').unwrap_or(route);

    let resolved = site_url.join(route).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: crate::error::ErrorKind::Validation(ValidationErrorKind::InvalidRedirect),
    })?;

    if resolved.origin() != site_url.origin() {
        return Err(validation_error(
            ValidationErrorKind::InvalidRedirect,
            &format!("return target {} leaves the site origin", resolved),
        ));
    }

    Ok(resolved.to_string())
}
