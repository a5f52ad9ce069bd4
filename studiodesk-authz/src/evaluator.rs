//! Stateless permission predicates
//!
//! Every predicate takes `Option<&Principal>` and returns `false` for an
//! absent principal. Only [`require_permission`] returns an error, for call
//! sites that prefer early-exit control flow.

use crate::{
    catalog::{is_admin_permission, Action, Permission, Resource},
    error::{AuthzError, AuthzResult},
    principal::{Principal, SystemRole},
};

/// True iff the principal exists and holds the `admin` system role
pub fn is_admin(principal: Option<&Principal>) -> bool {
    matches!(principal, Some(p) if p.role == SystemRole::Admin)
}

/// Admin with a verified email address
pub fn is_verified_admin(principal: Option<&Principal>) -> bool {
    is_admin(principal) && principal.is_some_and(Principal::is_email_verified)
}

/// Check a permission token against the admin catalog
///
/// Empty or unrecognized tokens deny. Non-admin principals always deny.
pub fn has_permission(principal: Option<&Principal>, permission: &str) -> bool {
    match permission.parse::<Permission>() {
        Ok(parsed) => has_grant(principal, &parsed),
        Err(_) => false,
    }
}

/// Typed form of [`has_permission`]
pub fn has_grant(principal: Option<&Principal>, permission: &Permission) -> bool {
    is_admin(principal) && is_admin_permission(permission)
}

/// Require a permission, failing with a typed error
pub fn require_permission(
    principal: Option<&Principal>,
    permission: &str,
    message: Option<&str>,
) -> AuthzResult<()> {
    if principal.is_none() {
        return Err(AuthzError::AuthenticationRequired);
    }

    if has_permission(principal, permission) {
        return Ok(());
    }

    Err(match message {
        Some(message) => AuthzError::insufficient_permission_with_message(permission, message),
        None => AuthzError::insufficient_permission(permission),
    })
}

/// Admins may manage any recognized resource
///
/// An action, when given, must be one the resource supports.
pub fn can_manage_resource(
    principal: Option<&Principal>,
    resource: &str,
    action: Option<&str>,
) -> bool {
    if !is_admin(principal) {
        return false;
    }

    let Ok(resource) = resource.parse::<Resource>() else {
        return false;
    };

    match action {
        None => true,
        Some(action) => action
            .parse::<Action>()
            .map(|action| resource.supports(action))
            .unwrap_or(false),
    }
}
