//! HTTP client construction for the provider calls.
//!
//! Both outbound calls (token exchange, identity fetch) run through one
//! client with a bounded timeout and no automatic retry; transient
//! failures surface to the caller as transport errors.

use std::time::Duration;

use crate::error::Error;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout applied to each provider call.
    pub timeout: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("okta-auth/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Build the configured HTTP client.
pub fn build_client(config: &HttpConfig) -> Result<reqwest::Client, Error> {
    let client = reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(config.timeout)
        .user_agent(config.user_agent.clone())
        .build()?;

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("okta-auth/"));
    }

    #[test]
    fn test_build_client() {
        let config = HttpConfig {
            timeout: Duration::from_secs(5),
            ..HttpConfig::default()
        };
        assert!(build_client(&config).is_ok());
    }
}
