//! Identity claims returned by the userinfo endpoint and their
//! normalization onto the shape the account system consumes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{identity_error, Error, IdentityErrorKind};

/// Claim fields that may ever reach the account system's storage; every
/// other claim is dropped before persistence.
pub const WHITELISTED_FIELDS: [&str; 5] = ["id", "emails", "first_name", "last_name", "name"];

/// Raw claims map from the userinfo endpoint. Unvalidated.
#[derive(Debug, Clone, Default)]
pub struct IdentityClaims(Map<String, Value>);

impl IdentityClaims {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }
}

/// Profile fields surfaced to the account system's user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Canonical identity consumed by account creation/lookup.
#[derive(Debug, Clone)]
pub struct CanonicalIdentity {
    /// Unique identifier within the provider.
    pub id: String,
    pub profile: Profile,
    /// Whitelisted claims only.
    pub claims: Map<String, Value>,
}

/// Map provider claims onto the canonical identity.
///
/// Okta's userinfo response has no `id` attribute; the `sub` (subject)
/// claim is projected onto `id` for uniqueness. A profile with no usable
/// identifier is fatal for the attempt. Missing name or email is
/// tolerated.
pub fn normalize(claims: IdentityClaims) -> Result<CanonicalIdentity, Error> {
    let mut fields = claims.0;

    if !fields.contains_key("id") {
        if let Some(sub) = fields.get("sub").cloned() {
            fields.insert("id".to_string(), sub);
        }
    }

    let claims = IdentityClaims(fields);
    let id = claims
        .get_str("id")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            identity_error(
                IdentityErrorKind::MissingIdentifier,
                "profile carries neither id nor sub",
            )
        })?
        .to_string();

    let profile = Profile {
        name: claims.get_str("name").map(str::to_string),
        email: claims.get_str("email").map(str::to_string),
    };

    let whitelisted = claims
        .0
        .into_iter()
        .filter(|(field, _)| WHITELISTED_FIELDS.contains(&field.as_str()))
        .collect();

    Ok(CanonicalIdentity {
        id,
        profile,
        claims: whitelisted,
    })
}
