//! Service configuration supplied by the hosting account system.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{configuration_error, ConfigurationErrorKind, Error};

/// Identifier the hosting account system registers this service under.
pub const SERVICE_NAME: &str = "okta";

/// Admin-configured record for the Okta service.
///
/// The secret is opaque at this layer: it may be plaintext or a sealed
/// blob, depending on how the host stores it (see [`crate::secret`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Okta org hostname, e.g. `example.okta.com`.
    pub domain: String,
    /// OAuth client ID issued by the Okta application.
    pub client_id: String,
    /// OAuth client secret, possibly sealed at rest.
    pub secret: String,
    /// Extra authorize-URL parameters configured by the admin.
    #[serde(default)]
    pub login_url_parameters: BTreeMap<String, String>,
}

impl ServiceConfig {
    /// Create a config with no extra login-URL parameters.
    pub fn new(domain: &str, client_id: &str, secret: &str) -> Self {
        Self {
            domain: domain.to_string(),
            client_id: client_id.to_string(),
            secret: secret.to_string(),
            login_url_parameters: BTreeMap::new(),
        }
    }

    /// Reject records with empty required fields.
    pub fn validate(&self) -> Result<(), Error> {
        if self.domain.is_empty() {
            return Err(configuration_error(
                ConfigurationErrorKind::Invalid,
                "service configuration has an empty domain",
            ));
        }
        if self.client_id.is_empty() {
            return Err(configuration_error(
                ConfigurationErrorKind::Invalid,
                "service configuration has an empty client_id",
            ));
        }
        if self.secret.is_empty() {
            return Err(configuration_error(
                ConfigurationErrorKind::Invalid,
                "service configuration has an empty secret",
            ));
        }
        Ok(())
    }
}

/// Source of the service configuration record.
///
/// Implemented by the hosting account system (e.g. an admin-configured
/// record store). `None` means the service was never configured, which
/// the coordinator surfaces as a hard configuration error.
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> Option<ServiceConfig>;
}

/// Okta OAuth endpoint URLs.
///
/// Derived from the org domain in production; tests point the token and
/// userinfo URLs at a mock server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl Endpoints {
    /// Endpoints for an Okta org domain.
    pub fn for_domain(domain: &str) -> Self {
        Self {
            authorize_url: format!("https://{}/oauth2/v1/authorize", domain),
            token_url: format!("https://{}/oauth2/v1/token", domain),
            userinfo_url: format!("https://{}/oauth2/v1/userinfo", domain),
        }
    }
}
