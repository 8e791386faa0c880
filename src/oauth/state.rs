//! Credential tokens and the signed state parameter.
//!
//! The state parameter round-trips the login style, the per-attempt
//! credential token, and the post-login redirect target through the
//! provider redirect. The encoding is versioned and HMAC-SHA256 signed
//! so the callback leg can reject tampered or foreign values.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{validation_error, Error, ValidationErrorKind};
use crate::oauth::authorize::LoginStyle;

type HmacSha256 = Hmac<Sha256>;

/// Current state-parameter format version.
const STATE_VERSION: u8 = 1;

/// Generate a high-entropy credential token for one login attempt.
pub fn credential_token() -> String {
    generate_token()
}

/// Generate a fresh nonce for the authorize request.
pub fn nonce() -> String {
    generate_token()
}

/// 32 random bytes, hex encoded.
fn generate_token() -> String {
    let random_bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(random_bytes)
}

/// Data carried through the provider redirect in the state parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePayload {
    #[serde(rename = "v")]
    version: u8,
    pub login_style: LoginStyle,
    pub credential_token: String,
    pub redirect_url: String,
}

impl StatePayload {
    pub fn new(login_style: LoginStyle, credential_token: &str, redirect_url: &str) -> Self {
        Self {
            version: STATE_VERSION,
            login_style,
            credential_token: credential_token.to_string(),
            redirect_url: redirect_url.to_string(),
        }
    }
}

/// Encoder/decoder for the state parameter.
///
/// Wire format: `base64url(json payload) "." base64url(hmac-sha256)`,
/// signed with a host-supplied key.
pub struct StateCodec {
    key: Vec<u8>,
}

impl StateCodec {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    /// Encode and sign a state payload.
    pub fn encode(&self, payload: &StatePayload) -> Result<String, Error> {
        let json = serde_json::to_vec(payload).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: crate::error::ErrorKind::Validation(ValidationErrorKind::MalformedState),
        })?;
        let encoded = URL_SAFE_NO_PAD.encode(json);

        let mut mac = self.mac()?;
        mac.update(encoded.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", encoded, signature))
    }

    /// Verify and decode a state parameter received on the callback.
    pub fn decode(&self, state: &str) -> Result<StatePayload, Error> {
        let (encoded, signature) = state.split_once('.').ok_or_else(|| {
            validation_error(
                ValidationErrorKind::MalformedState,
                "state parameter is not payload.signature",
            )
        })?;

        let signature_bytes = URL_SAFE_NO_PAD.decode(signature).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: crate::error::ErrorKind::Validation(ValidationErrorKind::MalformedState),
        })?;

        let mut mac = self.mac()?;
        mac.update(encoded.as_bytes());
        mac.verify_slice(&signature_bytes).map_err(|_| {
            validation_error(
                ValidationErrorKind::MalformedState,
                "state parameter signature mismatch",
            )
        })?;

        let json = URL_SAFE_NO_PAD.decode(encoded).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: crate::error::ErrorKind::Validation(ValidationErrorKind::MalformedState),
        })?;
        let payload: StatePayload = serde_json::from_slice(&json).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: crate::error::ErrorKind::Validation(ValidationErrorKind::MalformedState),
        })?;

        if payload.version != STATE_VERSION {
            return Err(validation_error(
                ValidationErrorKind::MalformedState,
                &format!("unsupported state version {}", payload.version),
            ));
        }

        Ok(payload)
    }

    fn mac(&self) -> Result<HmacSha256, Error> {
        HmacSha256::new_from_slice(&self.key).map_err(|_| {
            validation_error(ValidationErrorKind::MalformedState, "invalid signing key")
        })
    }
}
