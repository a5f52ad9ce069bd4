//! Contextual access validation
//!
//! Layers ownership, time-window, MFA and IP allowlist rules on top of the
//! static evaluator. Evaluation is a short-circuit AND over ordered steps:
//!
//! 1. base capability (admin resource management, or self-service on the
//!    principal's own profile)
//! 2. business hours, read from the injected [`Clock`]
//! 3. MFA
//! 4. IP allowlist (exact or CIDR)
//!
//! Absent context fields skip their step. The decision carries a reason for
//! logs and tests; callers only ever see a boolean or a bare error.

use chrono::{FixedOffset, Offset, Utc};
use ipnet::IpNet;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

use crate::{
    catalog::{Action, Resource},
    clock::{Clock, SystemClock},
    context::{ResourceAccessContext, ResourceAccessRequest},
    error::{AuthzError, AuthzResult},
    evaluator::can_manage_resource,
    principal::Principal,
};

/// How a granted request passed the base capability step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantPath {
    Admin,
    SelfService,
}

/// Why a request was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    NoPrincipal,
    NoCapability,
    OutsideBusinessHours,
    MfaRequired,
    IpNotAllowed,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::NoPrincipal => "no_principal",
            DenialReason::NoCapability => "no_capability",
            DenialReason::OutsideBusinessHours => "outside_business_hours",
            DenialReason::MfaRequired => "mfa_required",
            DenialReason::IpNotAllowed => "ip_not_allowed",
        }
    }

    /// Capability denials are permission failures, the rest are policy failures
    pub fn is_policy(&self) -> bool {
        matches!(
            self,
            DenialReason::OutsideBusinessHours
                | DenialReason::MfaRequired
                | DenialReason::IpNotAllowed
        )
    }
}

/// Outcome of a contextual access check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted { via: GrantPath },
    Denied(DenialReason),
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted { .. })
    }

    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self {
            AccessDecision::Denied(reason) => Some(*reason),
            AccessDecision::Granted { .. } => None,
        }
    }
}

/// Contextual access validator with an injected clock
#[derive(Clone)]
pub struct ContextualAccessValidator {
    clock: Arc<dyn Clock>,
    utc_offset: FixedOffset,
}

impl Default for ContextualAccessValidator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for ContextualAccessValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextualAccessValidator")
            .field("utc_offset", &self.utc_offset)
            .finish_non_exhaustive()
    }
}

impl ContextualAccessValidator {
    /// Create a validator reading hours in UTC
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            utc_offset: Utc.fix(),
        }
    }

    /// Read business hours at a fixed offset from UTC
    pub fn with_utc_offset(mut self, utc_offset: FixedOffset) -> Self {
        self.utc_offset = utc_offset;
        self
    }

    /// Boolean entry point
    ///
    /// Async so callers resolving configuration remotely can compose it; the
    /// check itself never awaits. Errors only on malformed context.
    pub async fn validate_resource_access(
        &self,
        principal: Option<&Principal>,
        resource: &str,
        action: &str,
        context: &ResourceAccessContext,
    ) -> AuthzResult<bool> {
        self.evaluate(principal, resource, action, context)
            .map(|decision| decision.is_granted())
    }

    /// Request-struct form of [`Self::validate_resource_access`]
    pub async fn validate_request(&self, request: &ResourceAccessRequest<'_>) -> AuthzResult<bool> {
        self.validate_resource_access(
            request.principal,
            request.resource,
            request.action,
            &request.context,
        )
        .await
    }

    /// Evaluate all steps and report which one decided
    pub fn evaluate(
        &self,
        principal: Option<&Principal>,
        resource: &str,
        action: &str,
        context: &ResourceAccessContext,
    ) -> AuthzResult<AccessDecision> {
        context.check_version()?;
        if let Some(hours) = &context.business_hours {
            hours.validate()?;
        }
        let allowlist = parse_allowlist(context.allowed_ips.as_deref())?;

        let decision = self.decide(principal, resource, action, context, allowlist.as_deref());
        if let AccessDecision::Denied(reason) = decision {
            debug!(
                principal_id = principal.map(|p| p.id.as_str()),
                resource,
                action,
                reason = reason.as_str(),
                "Resource access denied"
            );
        }
        Ok(decision)
    }

    fn decide(
        &self,
        principal: Option<&Principal>,
        resource: &str,
        action: &str,
        context: &ResourceAccessContext,
        allowlist: Option<&[AllowedAddress]>,
    ) -> AccessDecision {
        let Some(principal) = principal else {
            return AccessDecision::Denied(DenialReason::NoPrincipal);
        };

        let Some(via) = base_capability(principal, resource, action, context) else {
            return AccessDecision::Denied(DenialReason::NoCapability);
        };

        if !self.within_business_hours(context) {
            return AccessDecision::Denied(DenialReason::OutsideBusinessHours);
        }

        if !mfa_satisfied(context) {
            return AccessDecision::Denied(DenialReason::MfaRequired);
        }

        if let Some(allowlist) = allowlist {
            if !ip_allowed(context.ip_address(), allowlist) {
                return AccessDecision::Denied(DenialReason::IpNotAllowed);
            }
        }

        AccessDecision::Granted { via }
    }

    fn within_business_hours(&self, context: &ResourceAccessContext) -> bool {
        match &context.business_hours {
            Some(hours) => hours.contains(self.clock.hour_at(self.utc_offset)),
            None => true,
        }
    }
}

/// Admin resource management, or self-service on the principal's own record
fn base_capability(
    principal: &Principal,
    resource: &str,
    action: &str,
    context: &ResourceAccessContext,
) -> Option<GrantPath> {
    if can_manage_resource(Some(principal), resource, Some(action)) {
        return Some(GrantPath::Admin);
    }

    if context.is_owned_by(principal) && is_self_service(resource, action) {
        return Some(GrantPath::SelfService);
    }

    None
}

fn is_self_service(resource: &str, action: &str) -> bool {
    match (resource.parse::<Resource>(), action.parse::<Action>()) {
        (Ok(resource), Ok(action)) => resource.is_self_service() && resource.supports(action),
        _ => false,
    }
}

fn mfa_satisfied(context: &ResourceAccessContext) -> bool {
    match context.require_mfa {
        Some(true) => context.mfa_verified(),
        _ => true,
    }
}

/// One allowlist entry, kept both raw and parsed
#[derive(Debug, Clone)]
struct AllowedAddress {
    raw: String,
    network: IpNet,
}

fn parse_allowlist(entries: Option<&[String]>) -> AuthzResult<Option<Vec<AllowedAddress>>> {
    let Some(entries) = entries else {
        return Ok(None);
    };

    entries
        .iter()
        .map(|entry| -> AuthzResult<AllowedAddress> {
            let network = entry
                .parse::<IpNet>()
                .or_else(|_| entry.parse::<IpAddr>().map(IpNet::from))
                .map_err(|_| {
                    AuthzError::malformed(format!("invalid allowlist entry: {}", entry))
                })?;
            Ok(AllowedAddress {
                raw: entry.clone(),
                network,
            })
        })
        .collect::<AuthzResult<Vec<_>>>()
        .map(Some)
}

fn ip_allowed(ip_address: Option<&str>, allowlist: &[AllowedAddress]) -> bool {
    let Some(ip_address) = ip_address else {
        return false;
    };

    if allowlist.iter().any(|entry| entry.raw == ip_address) {
        return true;
    }

    match ip_address.parse::<IpAddr>() {
        Ok(ip) => {
            // dual-stack listeners report IPv4 peers as ::ffff:a.b.c.d
            let ip = ip.to_canonical();
            allowlist.iter().any(|entry| entry.network.contains(&ip))
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::context::SecurityContext;

    fn validator_at(hour: u32) -> ContextualAccessValidator {
        ContextualAccessValidator::new(Arc::new(FixedClock::at_hour(hour)))
    }

    fn admin() -> Principal {
        Principal::admin("admin_1", "admin@studio.test")
    }

    fn user() -> Principal {
        Principal::user("user_1", "user@studio.test")
    }

    #[test]
    fn test_admin_without_context_is_granted() {
        let decision = validator_at(12)
            .evaluate(Some(&admin()), "settings", "update", &ResourceAccessContext::new())
            .unwrap();
        assert_eq!(decision, AccessDecision::Granted { via: GrantPath::Admin });
    }

    #[test]
    fn test_missing_principal() {
        let decision = validator_at(12)
            .evaluate(None, "settings", "read", &ResourceAccessContext::new())
            .unwrap();
        assert_eq!(decision.denial_reason(), Some(DenialReason::NoPrincipal));
    }

    #[test]
    fn test_self_service_bypass() {
        let user = user();
        let validator = validator_at(12);

        let own = ResourceAccessContext::new().with_user("user_1");
        assert_eq!(
            validator.evaluate(Some(&user), "profile", "update", &own).unwrap(),
            AccessDecision::Granted { via: GrantPath::SelfService }
        );

        let other = ResourceAccessContext::new().with_user("someone-else");
        assert_eq!(
            validator
                .evaluate(Some(&user), "profile", "update", &other)
                .unwrap()
                .denial_reason(),
            Some(DenialReason::NoCapability)
        );
    }

    #[test]
    fn test_self_service_limited_to_profile() {
        let own = ResourceAccessContext::new().with_owner("user_1");
        let validator = validator_at(12);
        for (resource, action) in [("appointments", "update"), ("profile", "delete"), ("profile", "")] {
            assert!(!validator
                .evaluate(Some(&user()), resource, action, &own)
                .unwrap()
                .is_granted());
        }
    }

    #[test]
    fn test_unknown_resource_denies_admin() {
        let decision = validator_at(12)
            .evaluate(Some(&admin()), "inventory", "read", &ResourceAccessContext::new())
            .unwrap();
        assert_eq!(decision.denial_reason(), Some(DenialReason::NoCapability));
    }

    #[test]
    fn test_business_hours_apply_to_admins() {
        let context = ResourceAccessContext::new().with_business_hours(9, 17);
        assert!(validator_at(14)
            .evaluate(Some(&admin()), "appointments", "create", &context)
            .unwrap()
            .is_granted());
        assert_eq!(
            validator_at(20)
                .evaluate(Some(&admin()), "appointments", "create", &context)
                .unwrap()
                .denial_reason(),
            Some(DenialReason::OutsideBusinessHours)
        );
    }

    #[test]
    fn test_business_hours_use_configured_offset() {
        let context = ResourceAccessContext::new().with_business_hours(9, 17);
        // 07:00 UTC is 10:00 at UTC+3
        let validator = validator_at(7)
            .with_utc_offset(FixedOffset::east_opt(3 * 3600).unwrap());
        assert!(validator
            .evaluate(Some(&admin()), "appointments", "create", &context)
            .unwrap()
            .is_granted());
    }

    #[test]
    fn test_malformed_business_hours_error() {
        let context = ResourceAccessContext::new().with_business_hours(17, 9);
        let err = validator_at(12)
            .evaluate(Some(&admin()), "appointments", "create", &context)
            .unwrap_err();
        assert!(matches!(err, AuthzError::MalformedInput { .. }));
    }

    #[test]
    fn test_mfa_requirement() {
        let validator = validator_at(12);
        let unverified = ResourceAccessContext::new()
            .with_require_mfa(true)
            .with_security_context(SecurityContext::new().with_mfa_verified(false));
        assert_eq!(
            validator
                .evaluate(Some(&admin()), "settings", "delete", &unverified)
                .unwrap()
                .denial_reason(),
            Some(DenialReason::MfaRequired)
        );

        let missing = ResourceAccessContext::new().with_require_mfa(true);
        assert!(!validator
            .evaluate(Some(&admin()), "settings", "delete", &missing)
            .unwrap()
            .is_granted());

        let verified = ResourceAccessContext::new()
            .with_require_mfa(true)
            .with_security_context(SecurityContext::new().with_mfa_verified(true));
        assert!(validator
            .evaluate(Some(&admin()), "settings", "delete", &verified)
            .unwrap()
            .is_granted());

        let not_required = ResourceAccessContext::new().with_require_mfa(false);
        assert!(validator
            .evaluate(Some(&admin()), "settings", "delete", &not_required)
            .unwrap()
            .is_granted());
    }

    #[test]
    fn test_ip_allowlist() {
        let validator = validator_at(12);
        let context = |ip: &str| {
            ResourceAccessContext::new()
                .with_allowed_ips(["192.168.1.0/24", "10.0.0.7"])
                .with_security_context(SecurityContext::new().with_ip(ip))
        };

        for ip in ["192.168.1.100", "10.0.0.7"] {
            assert!(validator
                .evaluate(Some(&admin()), "settings", "update", &context(ip))
                .unwrap()
                .is_granted());
        }
        for ip in ["203.0.113.1", "10.0.0.8", "not-an-ip"] {
            assert_eq!(
                validator
                    .evaluate(Some(&admin()), "settings", "update", &context(ip))
                    .unwrap()
                    .denial_reason(),
                Some(DenialReason::IpNotAllowed)
            );
        }
    }

    #[test]
    fn test_allowlist_without_request_ip_denies() {
        let context = ResourceAccessContext::new().with_allowed_ips(["192.168.1.0/24"]);
        assert!(!validator_at(12)
            .evaluate(Some(&admin()), "settings", "update", &context)
            .unwrap()
            .is_granted());
    }

    #[test]
    fn test_empty_allowlist_denies() {
        let context = ResourceAccessContext::new()
            .with_allowed_ips(Vec::<String>::new())
            .with_security_context(SecurityContext::new().with_ip("192.168.1.1"));
        assert!(!validator_at(12)
            .evaluate(Some(&admin()), "settings", "update", &context)
            .unwrap()
            .is_granted());
    }

    #[test]
    fn test_malformed_allowlist_entry_errors() {
        let context = ResourceAccessContext::new()
            .with_allowed_ips(["192.168.1.0/33"])
            .with_security_context(SecurityContext::new().with_ip("192.168.1.1"));
        let err = validator_at(12)
            .evaluate(Some(&admin()), "settings", "update", &context)
            .unwrap_err();
        assert!(matches!(err, AuthzError::MalformedInput { .. }));
    }

    #[test]
    fn test_capability_checked_before_policy() {
        let context = ResourceAccessContext::new()
            .with_business_hours(9, 17)
            .with_require_mfa(true);
        assert_eq!(
            validator_at(20)
                .evaluate(Some(&user()), "settings", "update", &context)
                .unwrap()
                .denial_reason(),
            Some(DenialReason::NoCapability)
        );
    }

    #[test]
    fn test_ipv6_cidr() {
        let context = ResourceAccessContext::new()
            .with_allowed_ips(["2001:db8::/32"])
            .with_security_context(SecurityContext::new().with_ip("2001:db8::1"));
        assert!(validator_at(12)
            .evaluate(Some(&admin()), "settings", "read", &context)
            .unwrap()
            .is_granted());
    }

    #[test]
    fn test_ipv4_mapped_address_matches_ipv4_cidr() {
        let validator = validator_at(12);
        let allowed = ResourceAccessContext::new()
            .with_allowed_ips(["192.168.1.0/24"])
            .with_security_context(SecurityContext::new().with_ip("::ffff:192.168.1.100"));
        assert!(validator
            .evaluate(Some(&admin()), "settings", "read", &allowed)
            .unwrap()
            .is_granted());

        let outside = ResourceAccessContext::new()
            .with_allowed_ips(["192.168.1.0/24"])
            .with_security_context(SecurityContext::new().with_ip("::ffff:10.0.0.1"));
        assert_eq!(
            validator
                .evaluate(Some(&admin()), "settings", "read", &outside)
                .unwrap(),
            AccessDecision::Denied(DenialReason::IpNotAllowed)
        );
    }

    #[tokio::test]
    async fn test_async_entry_points() {
        let admin = admin();
        let validator = validator_at(14);
        let context = ResourceAccessContext::new().with_business_hours(9, 17);

        assert!(validator
            .validate_resource_access(Some(&admin), "appointments", "create", &context)
            .await
            .unwrap());

        let request = ResourceAccessRequest::new(Some(&admin), "appointments", "create")
            .with_context(context);
        assert!(validator.validate_request(&request).await.unwrap());
    }
}
