//! Reusable, composable permission predicates

use std::fmt;
use std::sync::Arc;

use crate::{
    catalog::Permission,
    evaluator::has_grant,
    principal::Principal,
};

/// Extra condition applied after the base permission check
pub type Guard = Arc<dyn Fn(&Principal) -> bool + Send + Sync>;

/// Named predicate built once and shared across call sites
///
/// The token is parsed at construction. Guards run only after the base
/// check passes and can only narrow the result.
#[derive(Clone)]
pub struct PermissionChecker {
    token: String,
    permission: Option<Permission>,
    guards: Vec<Guard>,
}

impl PermissionChecker {
    /// Create a checker for a permission token
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let permission = token.parse().ok();
        Self {
            token,
            permission,
            guards: Vec::new(),
        }
    }

    /// Create a checker from an already parsed permission
    pub fn for_permission(permission: Permission) -> Self {
        Self {
            token: permission.to_string(),
            permission: Some(permission),
            guards: Vec::new(),
        }
    }

    /// Add a guard, conjunctively
    pub fn and_guard<G>(mut self, guard: G) -> Self
    where
        G: Fn(&Principal) -> bool + Send + Sync + 'static,
    {
        self.guards.push(Arc::new(guard));
        self
    }

    /// Evaluate against a principal
    pub fn check(&self, principal: Option<&Principal>) -> bool {
        let Some(permission) = &self.permission else {
            return false;
        };
        let Some(principal) = principal else {
            return false;
        };

        has_grant(Some(principal), permission) && self.guards.iter().all(|guard| guard(principal))
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Whether the token parsed into the catalog
    pub fn is_recognized(&self) -> bool {
        self.permission.is_some()
    }

    /// Borrow as a plain closure
    pub fn as_fn(&self) -> impl Fn(Option<&Principal>) -> bool + '_ {
        move |principal: Option<&Principal>| self.check(principal)
    }
}

impl fmt::Debug for PermissionChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionChecker")
            .field("token", &self.token)
            .field("recognized", &self.permission.is_some())
            .field("guards", &self.guards.len())
            .finish()
    }
}

/// Build a checker equivalent to `has_permission(p, token) && guard(p)`
pub fn create_permission_checker<G>(token: &str, guard: Option<G>) -> PermissionChecker
where
    G: Fn(&Principal) -> bool + Send + Sync + 'static,
{
    let checker = PermissionChecker::new(token);
    match guard {
        Some(guard) => checker.and_guard(guard),
        None => checker,
    }
}
