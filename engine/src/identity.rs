//! Identity value types shared by the client and the remote store.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Authorization role attached to a principal.
///
/// Unknown role strings deserialize as [`Role::User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Club,
    #[default]
    #[serde(other)]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Club => "club",
            Role::User => "user",
        }
    }

    /// Parse a stored role string, falling back to [`Role::User`].
    pub fn parse(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            "club" => Role::Club,
            _ => Role::User,
        }
    }

    /// Succeeds only when this role is exactly `required`.
    pub fn require(self, required: Role) -> Result<()> {
        if self == required {
            Ok(())
        } else {
            Err(Error::InsufficientPermissions {
                required,
                actual: self,
            })
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub uid: String,
    /// Name used to sign in; player accounts use their registration number
    pub login_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Registration number for player accounts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_reg: Option<String>,
}

/// Combine a locally cached player record with the remote one.
///
/// Remote fields take priority; fields only the local copy has are kept.
pub fn merge_player_lookup(local: Option<Value>, remote: Option<Value>) -> Option<Value> {
    match (local, remote) {
        (Some(Value::Object(mut local)), Some(Value::Object(remote))) => {
            local.extend(remote);
            Some(Value::Object(local))
        }
        (_, Some(remote)) => Some(remote),
        (local, None) => local,
    }
}
