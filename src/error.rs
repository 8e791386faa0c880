//! Error types for the `okta-auth` crate.
//!
//! A root Error struct holds an error kind and an optional source for
//! error chaining.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for okta-auth.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in okta-auth.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    Configuration(ConfigurationErrorKind),
    Validation(ValidationErrorKind),
    OAuth(OAuthErrorKind),
    Identity(IdentityErrorKind),
}

/// Errors from the service configuration record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigurationErrorKind {
    /// No configuration record exists for the service.
    Missing,
    /// A configuration record exists but carries unusable values.
    Invalid,
}

/// Caller-bug errors detected before any network traffic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValidationErrorKind {
    /// A login-URL parameter collides with a reserved OAuth parameter.
    ReservedParameter,
    /// The post-login return target does not resolve under the site origin.
    InvalidRedirect,
    /// The state parameter failed signature or version checks.
    MalformedState,
    /// The credential token is unknown, expired, or already consumed.
    UnknownCredentialToken,
}

/// Errors from the provider during code exchange or profile fetch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OAuthErrorKind {
    /// Connection failure, timeout, or a non-2xx response without a
    /// parseable body.
    TransportFailure,
    /// The provider returned a body with an `error` field. Invalid,
    /// expired, and reused authorization codes land here.
    ProviderRejected,
    /// The userinfo endpoint could not be read.
    IdentityFetchFailure,
}

/// Errors from normalizing the provider's profile claims.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IdentityErrorKind {
    /// The profile carries no usable unique identifier.
    MissingIdentifier,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Configuration(kind) => write!(f, "configuration error: {:?}", kind),
            ErrorKind::Validation(kind) => write!(f, "validation error: {:?}", kind),
            ErrorKind::OAuth(kind) => write!(f, "OAuth error: {:?}", kind),
            ErrorKind::Identity(kind) => write!(f, "identity error: {:?}", kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // A builder failure means the client was constructed from bad
        // settings; everything else is the network.
        let error_kind = if err.is_builder() {
            ErrorKind::Configuration(ConfigurationErrorKind::Invalid)
        } else {
            ErrorKind::OAuth(OAuthErrorKind::TransportFailure)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

/// Helper function to create configuration errors.
pub fn configuration_error(kind: ConfigurationErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Configuration(kind),
    }
}

/// Helper function to create validation errors.
pub fn validation_error(kind: ValidationErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Validation(kind),
    }
}

/// Helper function to create OAuth errors.
pub fn oauth_error(kind: OAuthErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::OAuth(kind),
    }
}

/// Helper function to create identity errors.
pub fn identity_error(kind: IdentityErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Identity(kind),
    }
}
