//! AES-256-GCM sealing of the stored client secret.
//!
//! Admin-configured client secrets may be stored sealed rather than in
//! plaintext. The sealing key is a 32-byte key provided as a hex-encoded
//! string (64 characters). Sealed values carry a random 12-byte nonce
//! prepended to the ciphertext, base64-encoded for text storage.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::Rng;
use secrecy::SecretString;

use crate::error::{configuration_error, ConfigurationErrorKind, Error, ErrorKind};

/// 12-byte nonce size for AES-GCM
const NONCE_SIZE: usize = 12;

fn seal_err() -> Error {
    configuration_error(
        ConfigurationErrorKind::Invalid,
        "failed to seal client secret",
    )
}

fn open_err() -> Error {
    configuration_error(
        ConfigurationErrorKind::Invalid,
        "failed to open sealed client secret",
    )
}

/// Seals a plaintext secret with AES-256-GCM under a random nonce.
pub fn seal(plaintext: &str, key_hex: &str) -> Result<String, Error> {
    let key = parse_key(key_hex)?;
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| seal_err())?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| seal_err())?;

    let mut combined = nonce_bytes.to_vec();
    combined.extend(ciphertext);

    Ok(BASE64.encode(combined))
}

/// Opens a value sealed with [`seal`].
pub fn open(sealed_b64: &str, key_hex: &str) -> Result<SecretString, Error> {
    let key = parse_key(key_hex)?;
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| open_err())?;

    let combined = BASE64.decode(sealed_b64).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: ErrorKind::Configuration(ConfigurationErrorKind::Invalid),
    })?;

    if combined.len() < NONCE_SIZE {
        return Err(open_err());
    }

    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext_bytes = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| open_err())?;

    let plaintext = String::from_utf8(plaintext_bytes).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: ErrorKind::Configuration(ConfigurationErrorKind::Invalid),
    })?;

    Ok(SecretString::from(plaintext))
}

/// Resolves the stored secret to its usable form.
///
/// With a sealing key configured the stored value is opened; without one
/// it is passed through as plaintext.
pub fn open_secret(secret: &str, key_hex: Option<&str>) -> Result<SecretString, Error> {
    match key_hex {
        Some(key) => open(secret, key),
        None => Ok(SecretString::from(secret.to_string())),
    }
}

fn parse_key(key_hex: &str) -> Result<[u8; 32], Error> {
    let bytes = hex::decode(key_hex).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: ErrorKind::Configuration(ConfigurationErrorKind::Invalid),
    })?;
    if bytes.len() != 32 {
        return Err(seal_err());
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}
