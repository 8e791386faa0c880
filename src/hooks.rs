//! Narrow interfaces onto the hosting account system.
//!
//! The coordinator never opens browser windows or writes user records;
//! the host framework implements these two traits and the flow calls
//! through them.

use async_trait::async_trait;

use crate::error::Error;
use crate::flow::CallbackOutcome;
use crate::oauth::LoginStyle;

/// Identifier of the user record the account system resolved.
pub type UserId = String;

/// Geometry for popup-style logins.
#[derive(Debug, Clone, Copy)]
pub struct PopupOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for PopupOptions {
    fn default() -> Self {
        Self {
            width: 445,
            height: 625,
        }
    }
}

/// Opens the authorize URL for the user, as a full redirect or a popup
/// window, and arranges for the provider's callback to reach the server
/// leg.
#[async_trait]
pub trait LoginLauncher: Send + Sync {
    async fn launch(
        &self,
        url: &str,
        style: LoginStyle,
        popup: &PopupOptions,
    ) -> Result<(), Error>;
}

/// Creates or looks up the account record for a completed login.
#[async_trait]
pub trait AccountUpsert: Send + Sync {
    async fn upsert(&self, outcome: &CallbackOutcome) -> Result<UserId, Error>;
}
