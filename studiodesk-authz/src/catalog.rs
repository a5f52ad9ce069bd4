//! Static permission catalog and studio role tables
//!
//! The catalog is closed: every resource, every action a resource supports,
//! and every studio role is enumerated here. Anything outside it parses as an
//! error and evaluates as a denial.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AuthzError, AuthzResult};

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]+:([a-z_]+|\*)$").expect("static token pattern"));

/// Resource kinds managed from the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Appointments,
    Customers,
    Artists,
    Services,
    Media,
    Payments,
    Analytics,
    Settings,
    Users,
    Profile,
}

impl Resource {
    pub const ALL: [Resource; 10] = [
        Resource::Appointments,
        Resource::Customers,
        Resource::Artists,
        Resource::Services,
        Resource::Media,
        Resource::Payments,
        Resource::Analytics,
        Resource::Settings,
        Resource::Users,
        Resource::Profile,
    ];

    /// Convert to string for use in permission tokens
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Appointments => "appointments",
            Resource::Customers => "customers",
            Resource::Artists => "artists",
            Resource::Services => "services",
            Resource::Media => "media",
            Resource::Payments => "payments",
            Resource::Analytics => "analytics",
            Resource::Settings => "settings",
            Resource::Users => "users",
            Resource::Profile => "profile",
        }
    }

    /// Actions this resource accepts
    pub fn actions(&self) -> &'static [Action] {
        use Action::*;
        match self {
            Resource::Appointments => &[Create, Read, Update, Delete, Manage],
            Resource::Customers => &[Create, Read, Update, Delete, Export],
            Resource::Artists => &[Create, Read, Update, Delete],
            Resource::Services => &[Create, Read, Update, Delete],
            Resource::Media => &[Upload, Read, Delete],
            Resource::Payments => &[Read, Refund, Export],
            Resource::Analytics => &[Read, Export],
            Resource::Settings => &[Read, Update, Delete],
            Resource::Users => &[Read, Update, Ban, Delete],
            Resource::Profile => &[Read, Update],
        }
    }

    pub fn supports(&self, action: Action) -> bool {
        self.actions().contains(&action)
    }

    /// Whether a principal may act on their own record without admin rights
    pub fn is_self_service(&self) -> bool {
        matches!(self, Resource::Profile)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = AuthzError;

    fn from_str(s: &str) -> AuthzResult<Self> {
        Resource::ALL
            .iter()
            .copied()
            .find(|resource| resource.as_str() == s)
            .ok_or_else(|| AuthzError::unknown_token("resource", s))
    }
}

/// Operations a permission can grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Manage,
    Export,
    Upload,
    Refund,
    Ban,
}

impl Action {
    pub const ALL: [Action; 9] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::Manage,
        Action::Export,
        Action::Upload,
        Action::Refund,
        Action::Ban,
    ];

    /// Convert to string for use in permission tokens
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Manage => "manage",
            Action::Export => "export",
            Action::Upload => "upload",
            Action::Refund => "refund",
            Action::Ban => "ban",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AuthzError;

    fn from_str(s: &str) -> AuthzResult<Self> {
        Action::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| AuthzError::unknown_token("action", s))
    }
}

/// A permission token: `resource:action`, `resource:*` or `*`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Permission {
    Grant { resource: Resource, action: Action },
    AllOf(Resource),
    All,
}

impl Permission {
    /// Build a `resource:action` grant, rejecting pairs outside the catalog
    pub fn grant(resource: Resource, action: Action) -> AuthzResult<Self> {
        if !resource.supports(action) {
            return Err(AuthzError::unknown_token(
                "permission",
                format!("{}:{}", resource, action),
            ));
        }
        Ok(Permission::Grant { resource, action })
    }

    /// Wildcard containment: does holding `self` imply holding `other`
    pub fn covers(&self, other: &Permission) -> bool {
        match (self, other) {
            (Permission::All, _) => true,
            (Permission::AllOf(own), Permission::AllOf(requested)) => own == requested,
            (Permission::AllOf(own), Permission::Grant { resource, .. }) => own == resource,
            (Permission::AllOf(_), Permission::All) => false,
            (Permission::Grant { .. }, _) => self == other,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Grant { resource, action } => write!(f, "{}:{}", resource, action),
            Permission::AllOf(resource) => write!(f, "{}:*", resource),
            Permission::All => f.write_str("*"),
        }
    }
}

impl FromStr for Permission {
    type Err = AuthzError;

    fn from_str(s: &str) -> AuthzResult<Self> {
        if s == "*" {
            return Ok(Permission::All);
        }
        if !TOKEN_PATTERN.is_match(s) {
            return Err(AuthzError::unknown_token("permission", s));
        }

        // The pattern guarantees exactly one colon
        let (resource, action) = s
            .split_once(':')
            .ok_or_else(|| AuthzError::unknown_token("permission", s))?;
        let resource: Resource = resource
            .parse()
            .map_err(|_| AuthzError::unknown_token("permission", s))?;

        if action == "*" {
            return Ok(Permission::AllOf(resource));
        }

        let action: Action = action
            .parse()
            .map_err(|_| AuthzError::unknown_token("permission", s))?;
        Permission::grant(resource, action).map_err(|_| AuthzError::unknown_token("permission", s))
    }
}

impl Serialize for Permission {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(serde::de::Error::custom)
    }
}

/// Every valid token, in catalog order
pub static ADMIN_PERMISSIONS: Lazy<Vec<Permission>> = Lazy::new(|| {
    let mut permissions = Vec::new();
    for resource in Resource::ALL {
        for action in resource.actions() {
            permissions.push(Permission::Grant {
                resource,
                action: *action,
            });
        }
        permissions.push(Permission::AllOf(resource));
    }
    permissions.push(Permission::All);
    permissions
});

/// Owned copy of the full admin permission set
pub fn admin_permissions() -> Vec<Permission> {
    ADMIN_PERMISSIONS.clone()
}

/// Whether a parsed permission is part of the admin set
pub fn is_admin_permission(permission: &Permission) -> bool {
    ADMIN_PERMISSIONS.contains(permission)
}

/// Organization-scoped roles inside a studio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudioRole {
    Owner,
    Manager,
    Artist,
    Receptionist,
}

const fn grant(resource: Resource, action: Action) -> Permission {
    Permission::Grant { resource, action }
}

const OWNER_PERMISSIONS: &[Permission] = &[Permission::All];

const MANAGER_PERMISSIONS: &[Permission] = &[
    Permission::AllOf(Resource::Appointments),
    Permission::AllOf(Resource::Customers),
    Permission::AllOf(Resource::Services),
    Permission::AllOf(Resource::Media),
    grant(Resource::Artists, Action::Read),
    grant(Resource::Artists, Action::Update),
    grant(Resource::Payments, Action::Read),
    grant(Resource::Analytics, Action::Read),
    grant(Resource::Settings, Action::Read),
    grant(Resource::Profile, Action::Read),
    grant(Resource::Profile, Action::Update),
];

const ARTIST_PERMISSIONS: &[Permission] = &[
    grant(Resource::Appointments, Action::Read),
    grant(Resource::Appointments, Action::Update),
    grant(Resource::Customers, Action::Read),
    grant(Resource::Media, Action::Upload),
    grant(Resource::Media, Action::Read),
    grant(Resource::Profile, Action::Read),
    grant(Resource::Profile, Action::Update),
];

const RECEPTIONIST_PERMISSIONS: &[Permission] = &[
    grant(Resource::Appointments, Action::Create),
    grant(Resource::Appointments, Action::Read),
    grant(Resource::Appointments, Action::Update),
    grant(Resource::Customers, Action::Create),
    grant(Resource::Customers, Action::Read),
    grant(Resource::Customers, Action::Update),
    grant(Resource::Payments, Action::Read),
    grant(Resource::Profile, Action::Read),
    grant(Resource::Profile, Action::Update),
];

impl StudioRole {
    pub const ALL: [StudioRole; 4] = [
        StudioRole::Owner,
        StudioRole::Manager,
        StudioRole::Artist,
        StudioRole::Receptionist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StudioRole::Owner => "owner",
            StudioRole::Manager => "manager",
            StudioRole::Artist => "artist",
            StudioRole::Receptionist => "receptionist",
        }
    }

    /// Check whether this role's table covers `permission`
    pub fn grants(&self, permission: &Permission) -> bool {
        role_permissions(*self)
            .iter()
            .any(|held| held.covers(permission))
    }
}

impl fmt::Display for StudioRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudioRole {
    type Err = AuthzError;

    fn from_str(s: &str) -> AuthzResult<Self> {
        StudioRole::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| AuthzError::unknown_token("studio role", s))
    }
}

/// Fixed permission table for a studio role
pub fn role_permissions(role: StudioRole) -> &'static [Permission] {
    match role {
        StudioRole::Owner => OWNER_PERMISSIONS,
        StudioRole::Manager => MANAGER_PERMISSIONS,
        StudioRole::Artist => ARTIST_PERMISSIONS,
        StudioRole::Receptionist => RECEPTIONIST_PERMISSIONS,
    }
}
