//! Validator plus auditor behind one call

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::{
    auditor::{ChannelSink, SecurityEvent, SecuritySink, ViolationAuditor, ViolationExtra},
    clock::{Clock, SystemClock},
    config::AuthzConfig,
    context::ResourceAccessRequest,
    error::{AuthzError, AuthzResult},
    validator::{AccessDecision, ContextualAccessValidator, DenialReason},
};

/// Authorization facade that audits every denial it returns
#[derive(Debug, Clone)]
pub struct AuthorizationService {
    validator: ContextualAccessValidator,
    auditor: ViolationAuditor,
}

impl AuthorizationService {
    pub fn new(validator: ContextualAccessValidator, auditor: ViolationAuditor) -> Self {
        Self { validator, auditor }
    }

    /// Build from configuration using the wall clock
    pub fn from_config(config: &AuthzConfig, sink: Arc<dyn SecuritySink>) -> AuthzResult<Self> {
        Self::from_config_with_clock(config, sink, Arc::new(SystemClock))
    }

    /// Build from configuration with a channel sink sized by the audit settings
    ///
    /// The receiver is handed to whatever task forwards events off-process.
    pub fn with_channel_sink(
        config: &AuthzConfig,
        clock: Arc<dyn Clock>,
    ) -> AuthzResult<(Self, mpsc::Receiver<SecurityEvent>)> {
        config.validate()?;
        let (sink, receiver) = ChannelSink::from_config(&config.audit);
        let service = Self::from_config_with_clock(config, Arc::new(sink), clock)?;
        Ok((service, receiver))
    }

    /// Build from configuration with an injected clock
    pub fn from_config_with_clock(
        config: &AuthzConfig,
        sink: Arc<dyn SecuritySink>,
        clock: Arc<dyn Clock>,
    ) -> AuthzResult<Self> {
        config.validate()?;
        let validator = ContextualAccessValidator::new(Arc::clone(&clock))
            .with_utc_offset(config.clock.utc_offset()?);
        let auditor = ViolationAuditor::from_config(&config.audit, sink).with_clock(clock);
        Ok(Self::new(validator, auditor))
    }

    pub fn validator(&self) -> &ContextualAccessValidator {
        &self.validator
    }

    pub fn auditor(&self) -> &ViolationAuditor {
        &self.auditor
    }

    /// Authorize a request, auditing and returning a typed error on denial
    pub async fn authorize(&self, request: &ResourceAccessRequest<'_>) -> AuthzResult<()> {
        let decision = self.validator.evaluate(
            request.principal,
            request.resource,
            request.action,
            &request.context,
        )?;

        let AccessDecision::Denied(reason) = decision else {
            return Ok(());
        };

        let required = format!("{}:{}", request.resource, request.action);
        let extra = request
            .context
            .security_context
            .as_ref()
            .map(|ctx| ViolationExtra {
                ip_address: ctx.ip_address.clone(),
                user_agent: ctx.user_agent.clone(),
                session_id: ctx.session_id.clone(),
            });
        self.auditor
            .record_violation(request.principal, &required, request.resource, extra)
            .await;

        Err(if reason.is_policy() {
            AuthzError::policy_violation(request.resource, request.action)
        } else if reason == DenialReason::NoPrincipal {
            AuthzError::AuthenticationRequired
        } else {
            AuthzError::insufficient_permission(required)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::context::{ResourceAccessContext, SecurityContext};
    use crate::principal::Principal;

    fn service_at(hour: u32) -> (AuthorizationService, mpsc::Receiver<SecurityEvent>) {
        AuthorizationService::with_channel_sink(
            &AuthzConfig::default(),
            Arc::new(FixedClock::at_hour(hour)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_grant_emits_nothing() {
        let (service, mut receiver) = service_at(12);
        let admin = Principal::admin("admin_1", "admin@studio.test");
        let request = ResourceAccessRequest::new(Some(&admin), "settings", "update");

        assert!(service.authorize(&request).await.is_ok());
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_denials_map_to_errors_and_audit_once() {
        let (service, mut receiver) = service_at(20);
        let admin = Principal::admin("admin_1", "admin@studio.test");
        let user = Principal::user("user_1", "user@studio.test");

        let err = service
            .authorize(&ResourceAccessRequest::new(None, "settings", "read"))
            .await
            .unwrap_err();
        assert!(err.is_authentication_required());

        let err = service
            .authorize(&ResourceAccessRequest::new(Some(&user), "settings", "read"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::InsufficientPermission { .. }));

        let request = ResourceAccessRequest::new(Some(&admin), "appointments", "create")
            .with_context(
                ResourceAccessContext::new()
                    .with_business_hours(9, 17)
                    .with_security_context(SecurityContext::new().with_ip("10.0.0.1")),
            );
        let err = service.authorize(&request).await.unwrap_err();
        assert!(matches!(err, AuthzError::PolicyViolation { .. }));

        let events: Vec<_> = std::iter::from_fn(|| receiver.try_recv().ok()).collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].user_id, None);
        assert_eq!(events[1].user_id.as_deref(), Some("user_1"));
        assert_eq!(events[2].required_permission, "appointments:create");
        assert_eq!(events[2].ip_address.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_malformed_context_is_not_audited() {
        let (service, mut receiver) = service_at(12);
        let admin = Principal::admin("admin_1", "admin@studio.test");
        let request = ResourceAccessRequest::new(Some(&admin), "appointments", "create")
            .with_context(ResourceAccessContext::new().with_business_hours(18, 9));

        let err = service.authorize(&request).await.unwrap_err();
        assert!(matches!(err, AuthzError::MalformedInput { .. }));
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_configured_capacity_bounds_delivery() {
        let mut config = AuthzConfig::default();
        config.audit.channel_capacity = 1;
        let (service, mut receiver) =
            AuthorizationService::with_channel_sink(&config, Arc::new(FixedClock::at_hour(12)))
                .unwrap();
        let user = Principal::user("user_1", "user@studio.test");

        for action in ["read", "update"] {
            let request = ResourceAccessRequest::new(Some(&user), "settings", action);
            assert!(service.authorize(&request).await.is_err());
        }

        assert_eq!(receiver.recv().await.unwrap().required_permission, "settings:read");
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_rejects_invalid_capacity() {
        let mut config = AuthzConfig::default();
        config.audit.channel_capacity = 0;
        let result =
            AuthorizationService::with_channel_sink(&config, Arc::new(FixedClock::at_hour(12)));
        assert!(matches!(result, Err(AuthzError::InvalidConfig { .. })));
    }
}
