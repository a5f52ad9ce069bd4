//! Request-specific context for contextual access checks

use serde::{Deserialize, Serialize};

use crate::error::{AuthzError, AuthzResult};
use crate::principal::Principal;

/// Current layout of [`ResourceAccessContext`]
pub const CONTEXT_VERSION: u32 = 1;

fn default_version() -> u32 {
    CONTEXT_VERSION
}

/// Allowed hours of day, `start <= hour < end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    pub start: u8,
    pub end: u8,
}

impl BusinessHours {
    pub fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    /// Reject windows that can never be satisfied
    pub fn validate(&self) -> AuthzResult<()> {
        if self.start > 23 || self.end > 24 {
            return Err(AuthzError::malformed(format!(
                "business hours out of range: {}-{}",
                self.start, self.end
            )));
        }
        if self.start >= self.end {
            return Err(AuthzError::malformed(format!(
                "business hours start must precede end: {}-{}",
                self.start, self.end
            )));
        }
        Ok(())
    }

    pub fn contains(&self, hour: u32) -> bool {
        u32::from(self.start) <= hour && hour < u32::from(self.end)
    }
}

/// Caller network and session facts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityContext {
    pub ip_address: Option<String>,
    pub mfa_verified: Option<bool>,
    pub user_agent: Option<String>,
    pub session_id: Option<String>,
}

impl SecurityContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ip(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    pub fn with_mfa_verified(mut self, verified: bool) -> Self {
        self.mfa_verified = Some(verified);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Optional, independently toggled access conditions
///
/// `None` means the corresponding check is not required. `Some` means the
/// check runs and may fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAccessContext {
    #[serde(default = "default_version")]
    pub version: u32,
    pub owner_id: Option<String>,
    pub user_id: Option<String>,
    pub business_hours: Option<BusinessHours>,
    pub security_context: Option<SecurityContext>,
    #[serde(rename = "allowedIPs")]
    pub allowed_ips: Option<Vec<String>>,
    #[serde(rename = "requireMFA")]
    pub require_mfa: Option<bool>,
}

impl Default for ResourceAccessContext {
    fn default() -> Self {
        Self {
            version: CONTEXT_VERSION,
            owner_id: None,
            user_id: None,
            business_hours: None,
            security_context: None,
            allowed_ips: None,
            require_mfa: None,
        }
    }
}

impl ResourceAccessContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_business_hours(mut self, start: u8, end: u8) -> Self {
        self.business_hours = Some(BusinessHours::new(start, end));
        self
    }

    pub fn with_security_context(mut self, security_context: SecurityContext) -> Self {
        self.security_context = Some(security_context);
        self
    }

    pub fn with_allowed_ips<I, S>(mut self, allowed_ips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_ips = Some(allowed_ips.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_require_mfa(mut self, require_mfa: bool) -> Self {
        self.require_mfa = Some(require_mfa);
        self
    }

    /// Whether either ownership field names the principal
    pub fn is_owned_by(&self, principal: &Principal) -> bool {
        [self.user_id.as_deref(), self.owner_id.as_deref()]
            .into_iter()
            .flatten()
            .any(|id| id == principal.id)
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.security_context
            .as_ref()
            .and_then(|ctx| ctx.ip_address.as_deref())
    }

    pub fn mfa_verified(&self) -> bool {
        self.security_context
            .as_ref()
            .and_then(|ctx| ctx.mfa_verified)
            .unwrap_or(false)
    }

    /// Reject contexts from a newer layout than this crate understands
    pub fn check_version(&self) -> AuthzResult<()> {
        if self.version == 0 || self.version > CONTEXT_VERSION {
            return Err(AuthzError::malformed(format!(
                "unsupported context version {}",
                self.version
            )));
        }
        Ok(())
    }
}

/// One authorization question
#[derive(Debug, Clone)]
pub struct ResourceAccessRequest<'a> {
    pub principal: Option<&'a Principal>,
    pub resource: &'a str,
    pub action: &'a str,
    pub context: ResourceAccessContext,
}

impl<'a> ResourceAccessRequest<'a> {
    pub fn new(principal: Option<&'a Principal>, resource: &'a str, action: &'a str) -> Self {
        Self {
            principal,
            resource,
            action,
            context: ResourceAccessContext::default(),
        }
    }

    pub fn with_context(mut self, context: ResourceAccessContext) -> Self {
        self.context = context;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_hours_window() {
        let hours = BusinessHours::new(9, 17);
        assert!(hours.validate().is_ok());
        assert!(hours.contains(9));
        assert!(hours.contains(16));
        assert!(!hours.contains(17));
        assert!(!hours.contains(8));

        assert!(BusinessHours::new(0, 24).validate().is_ok());
        assert!(BusinessHours::new(17, 9).validate().is_err());
        assert!(BusinessHours::new(9, 9).validate().is_err());
        assert!(BusinessHours::new(9, 25).validate().is_err());
    }

    #[test]
    fn test_absent_fields_deserialize_as_none() {
        let context: ResourceAccessContext = serde_json::from_str("{}").unwrap();
        assert_eq!(context, ResourceAccessContext::default());
        assert_eq!(context.version, CONTEXT_VERSION);
    }

    #[test]
    fn test_wire_field_names() {
        let json = r#"{
            "userId": "u_1",
            "businessHours": {"start": 9, "end": 17},
            "securityContext": {"ipAddress": "10.0.0.1", "mfaVerified": false},
            "allowedIPs": ["10.0.0.0/8"],
            "requireMFA": true
        }"#;
        let context: ResourceAccessContext = serde_json::from_str(json).unwrap();
        assert_eq!(context.user_id.as_deref(), Some("u_1"));
        assert_eq!(context.business_hours, Some(BusinessHours::new(9, 17)));
        assert_eq!(context.ip_address(), Some("10.0.0.1"));
        assert_eq!(context.require_mfa, Some(true));
        assert!(!context.mfa_verified());
        assert_eq!(context.allowed_ips, Some(vec!["10.0.0.0/8".to_string()]));
    }

    #[test]
    fn test_ownership() {
        let principal = Principal::user("u_1", "user@studio.test");
        assert!(ResourceAccessContext::new().with_user("u_1").is_owned_by(&principal));
        assert!(ResourceAccessContext::new().with_owner("u_1").is_owned_by(&principal));
        assert!(!ResourceAccessContext::new().with_user("u_2").is_owned_by(&principal));
        assert!(!ResourceAccessContext::new().is_owned_by(&principal));
    }

    #[test]
    fn test_version_check() {
        assert!(ResourceAccessContext::new().check_version().is_ok());

        let mut future = ResourceAccessContext::new();
        future.version = CONTEXT_VERSION + 1;
        assert!(future.check_version().is_err());
    }
}
