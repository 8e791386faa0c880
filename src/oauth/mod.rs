//! OAuth 2.0 authorization-code flow pieces for the Okta service.

mod attempts;
mod authorize;
mod state;

pub mod client;
pub mod identity;

pub use attempts::{AttemptData, PendingAttempts};
pub use authorize::{
    build_authorize_url, redirect_uri, BuiltAuthorizeUrl, LoginOptions, LoginStyle,
    DEFAULT_SCOPES, RESERVED_PARAMETERS,
};
pub use state::{credential_token, nonce, StateCodec, StatePayload};
