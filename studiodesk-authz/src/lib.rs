//! Authorization and permission engine for the StudioDesk admin dashboard
//!
//! This crate decides whether an authenticated principal may act on a
//! dashboard resource. It provides:
//! - A closed, typed permission catalog and studio role tables
//! - Pure predicates over the system role (`is_admin`, `has_permission`, ...)
//! - Contextual validation: ownership, business hours, MFA and IP allowlists
//! - Reusable permission checkers with narrowing guards
//! - Best-effort auditing of denials to an external sink
//!
//! Identity verification, persistence and routing live elsewhere. Everything
//! here is stateless apart from the static catalog.

pub mod auditor;
pub mod catalog;
pub mod checker;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod evaluator;
#[cfg(feature = "axum")]
pub mod response;
pub mod principal;
pub mod service;
pub mod validator;

pub use auditor::{
    ChannelSink, SecurityEvent, SecurityEventType, SecuritySink, TracingSink, ViolationAuditor,
    ViolationExtra,
};
pub use catalog::{
    admin_permissions, role_permissions, Action, Permission, Resource, StudioRole,
    ADMIN_PERMISSIONS,
};
pub use checker::{create_permission_checker, PermissionChecker};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AuditConfig, AuthzConfig, AuthzConfigLoader, ClockConfig};
pub use context::{
    BusinessHours, ResourceAccessContext, ResourceAccessRequest, SecurityContext, CONTEXT_VERSION,
};
pub use error::{AuthzError, AuthzResult};
pub use evaluator::{
    can_manage_resource, has_grant, has_permission, is_admin, is_verified_admin,
    require_permission,
};
pub use principal::{Principal, SystemRole};
pub use service::AuthorizationService;
pub use validator::{AccessDecision, ContextualAccessValidator, DenialReason, GrantPath};
