use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Role;

/// An access requirement attached to reading or writing a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Access {
    /// Anyone may access the field, including anonymous principals.
    Public,
    /// Only principals whose resolved roles include this role.
    Role(Role),
    /// No external principal. On the write side this marks a
    /// system-managed field.
    Nobody,
}

impl Access {
    /// Token used for [`Access::Public`] in configuration.
    pub const PUBLIC: &'static str = "*";
    /// Token used for [`Access::Nobody`] in configuration.
    pub const NOBODY: &'static str = "none";

    /// The role this requirement names, if any.
    pub fn role(&self) -> Option<&Role> {
        match self {
            Access::Role(role) => Some(role),
            Access::Public | Access::Nobody => None,
        }
    }
}

impl From<&str> for Access {
    fn from(value: &str) -> Self {
        match value.trim() {
            Self::PUBLIC => Access::Public,
            Self::NOBODY => Access::Nobody,
            role => Access::Role(Role::from(role)),
        }
    }
}

impl From<String> for Access {
    fn from(value: String) -> Self {
        Access::from(value.as_str())
    }
}

impl From<Access> for String {
    fn from(value: Access) -> Self {
        value.to_string()
    }
}

impl From<Role> for Access {
    fn from(value: Role) -> Self {
        Access::Role(value)
    }
}

impl FromStr for Access {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Access::from(s))
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Public => f.write_str(Self::PUBLIC),
            Access::Role(role) => write!(f, "{role}"),
            Access::Nobody => f.write_str(Self::NOBODY),
        }
    }
}
