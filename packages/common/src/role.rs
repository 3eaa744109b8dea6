use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Built-in account roles.
///
/// Roles are stored as plain strings so deployments can add their own; the
/// built-in ones decide where the client lands after the auth gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Superadmin,
    Admin,
    Judge,
    Participant,
}

impl Role {
    /// The role a user has before anyone assigns one.
    pub const DEFAULT: Role = Role::Participant;

    pub const ALL: &'static [Role] = &[
        Self::Superadmin,
        Self::Admin,
        Self::Judge,
        Self::Participant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Superadmin => "superadmin",
            Self::Admin => "admin",
            Self::Judge => "judge",
            Self::Participant => "participant",
        }
    }

    /// Client route the role is sent to after `whoami`.
    pub fn landing_path(&self) -> &'static str {
        match self {
            Self::Superadmin => "/superadmin",
            Self::Admin => "/admin",
            Self::Judge => "/judge",
            Self::Participant => "/participant",
        }
    }

    /// Landing path for an arbitrary stored role name. Unknown roles are
    /// treated as participants.
    pub fn landing_path_for(role: &str) -> &'static str {
        role.parse::<Role>()
            .unwrap_or(Self::DEFAULT)
            .landing_path()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role '{0}'")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "superadmin" => Ok(Self::Superadmin),
            "admin" => Ok(Self::Admin),
            "judge" => Ok(Self::Judge),
            "participant" => Ok(Self::Participant),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}
