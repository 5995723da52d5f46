//! Role, admin level and request status enums.
//!
//! All three are stored as lowercase snake-case text in the database and
//! serialized the same way over the API.

use serde::{Deserialize, Serialize};

/// Error returned when a stored or submitted value names no known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct UnknownVariant {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Role a principal can hold in the back-office.
///
/// A profile carries at most one role. The role only grants capabilities
/// once the profile is approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Manages the back-office; see [`AdminLevel`] for root versus regular admins.
    Admin,
    /// Manages authors and their content.
    AuthorAdmin,
    /// Writes content.
    Author,
}

impl Role {
    /// Every role, most privileged first.
    pub const ALL: [Self; 3] = [Self::Admin, Self::AuthorAdmin, Self::Author];

    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::AuthorAdmin => "author_admin",
            Self::Author => "author",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "author_admin" => Ok(Self::AuthorAdmin),
            "author" => Ok(Self::Author),
            _ => Err(UnknownVariant {
                kind: "role",
                value: s.to_owned(),
            }),
        }
    }
}

/// Level of an admin. Only meaningful when the role is [`Role::Admin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminLevel {
    /// Super-user: may grant every role, including `admin`.
    Root,
    /// Regular admin.
    Admin,
}

impl AdminLevel {
    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AdminLevel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(Self::Root),
            "admin" => Ok(Self::Admin),
            _ => Err(UnknownVariant {
                kind: "admin level",
                value: s.to_owned(),
            }),
        }
    }
}

/// Lifecycle state of an access request.
///
/// `Pending -> Approved` or `Pending -> Rejected`; both outcomes are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Returns true once the request has been reviewed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(UnknownVariant {
                kind: "request status",
                value: s.to_owned(),
            }),
        }
    }
}
