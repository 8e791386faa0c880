//! # okta-auth
//!
//! OAuth 2.0 authorization-code login flow binding Okta into a pluggable
//! accounts system:
//! - Authorize-URL construction with scope and parameter handling
//! - Signed state parameter carrying the per-attempt credential token
//! - Authorization-code exchange at the Okta token endpoint
//! - Identity retrieval from the userinfo endpoint
//! - Normalization of provider claims onto a canonical identity
//!
//! ## Architecture
//!
//! The [`flow::Coordinator`] drives one login attempt end to end. The
//! hosting framework supplies the pieces this crate deliberately does
//! not own: the configuration record ([`config::ConfigStore`]), the
//! redirect/popup mechanics ([`hooks::LoginLauncher`]), and account
//! record creation ([`hooks::AccountUpsert`]).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use okta_auth::{
//!     flow::{CallbackQuery, Coordinator},
//!     oauth::{LoginOptions, LoginStyle},
//! };
//!
//! let coordinator = Coordinator::new(config_store, site_url, state_key);
//! let request = coordinator
//!     .request_login(LoginStyle::Redirect, &LoginOptions::default(), Some("/dashboard"))
//!     .await?;
//! // ...provider redirects back...
//! let outcome = coordinator.handle_callback(&query, &config).await?;
//! ```

pub mod config;
pub mod error;
pub mod flow;
pub mod hooks;
pub mod http;
pub mod oauth;
pub mod secret;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
pub use flow::{CallbackOutcome, CallbackQuery, Coordinator, FlowState, LoginRequest};
