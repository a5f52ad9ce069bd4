//! Authenticated principal supplied by the identity provider

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// System-wide role, separate from the studio role hierarchy
///
/// Parsing is exact and case-sensitive. Anything other than `admin` or
/// `user` is kept verbatim as `Unrecognized` so it can be logged, but it
/// never satisfies a role check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SystemRole {
    Admin,
    User,
    Unrecognized(String),
}

impl SystemRole {
    pub fn parse(value: &str) -> Self {
        match value {
            "admin" => SystemRole::Admin,
            "user" => SystemRole::User,
            other => SystemRole::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SystemRole::Admin => "admin",
            SystemRole::User => "user",
            SystemRole::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for SystemRole {
    fn from(value: String) -> Self {
        SystemRole::parse(&value)
    }
}

impl From<SystemRole> for String {
    fn from(role: SystemRole) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for SystemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actor for whom an authorization decision is made
///
/// Immutable for the lifetime of a request and never persisted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    pub email: String,
    pub role: SystemRole,
    pub email_verified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub banned: bool,
}

impl Principal {
    /// Create a principal with an unverified email
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: SystemRole) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role,
            email_verified: None,
            banned: false,
        }
    }

    /// Shorthand for an admin principal
    pub fn admin(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self::new(id, email, SystemRole::Admin)
    }

    /// Shorthand for a regular user principal
    pub fn user(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self::new(id, email, SystemRole::User)
    }

    /// Set the email verification timestamp
    pub fn with_email_verified(mut self, verified_at: DateTime<Utc>) -> Self {
        self.email_verified = Some(verified_at);
        self
    }

    /// Mark the principal as banned
    pub fn with_banned(mut self, banned: bool) -> Self {
        self.banned = banned;
        self
    }

    pub fn is_email_verified(&self) -> bool {
        self.email_verified.is_some()
    }

    pub fn is_banned(&self) -> bool {
        self.banned
    }
}
