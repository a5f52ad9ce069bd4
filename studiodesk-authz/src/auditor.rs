//! Denial auditing
//!
//! The auditor turns a denial into one [`SecurityEvent`] and forwards it to a
//! [`SecuritySink`]. Emission is best effort: sink failures are logged and
//! swallowed, nothing is retried, and nothing is stored here.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    clock::{Clock, SystemClock},
    config::AuditConfig,
    principal::Principal,
};

/// Security event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityEventType {
    PermissionDenied,
}

/// Structured denial record handed to the sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEvent {
    #[serde(rename = "type")]
    pub event_type: SecurityEventType,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub user_role: Option<String>,
    pub required_permission: String,
    pub resource: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl SecurityEvent {
    /// Create a permission denied event, with null identity for a missing principal
    pub fn permission_denied(
        principal: Option<&Principal>,
        required_permission: impl Into<String>,
        resource: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type: SecurityEventType::PermissionDenied,
            user_id: principal.map(|p| p.id.clone()),
            user_email: principal.map(|p| p.email.clone()),
            user_role: principal.map(|p| p.role.to_string()),
            required_permission: required_permission.into(),
            resource: resource.into(),
            ip_address: None,
            user_agent: None,
            session_id: None,
            timestamp,
        }
    }

    /// Attach optional request details
    pub fn with_extra(mut self, extra: ViolationExtra) -> Self {
        self.ip_address = extra.ip_address;
        self.user_agent = extra.user_agent;
        self.session_id = extra.session_id;
        self
    }
}

/// Optional request details for a violation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationExtra {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub session_id: Option<String>,
}

impl ViolationExtra {
    pub fn with_ip(ip_address: impl Into<String>) -> Self {
        Self {
            ip_address: Some(ip_address.into()),
            ..Default::default()
        }
    }
}

/// External destination for security events
#[async_trait::async_trait]
pub trait SecuritySink: Send + Sync {
    /// Deliver one event
    async fn emit(&self, event: &SecurityEvent) -> Result<()>;
}

/// Sink that writes events to the `security` tracing target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait::async_trait]
impl SecuritySink for TracingSink {
    async fn emit(&self, event: &SecurityEvent) -> Result<()> {
        warn!(
            target: "security",
            event_type = "PERMISSION_DENIED",
            user_id = event.user_id.as_deref(),
            user_email = event.user_email.as_deref(),
            user_role = event.user_role.as_deref(),
            required_permission = %event.required_permission,
            resource = %event.resource,
            ip_address = event.ip_address.as_deref(),
            timestamp = %event.timestamp.to_rfc3339(),
            "Permission denied"
        );
        Ok(())
    }
}

/// Sink that forwards events over a bounded channel
///
/// Uses `try_send`, so a full or closed channel drops the event instead of
/// blocking the caller.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<SecurityEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving half for a forwarder task
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SecurityEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Create a sink sized by `audit.channel_capacity`
    pub fn from_config(config: &AuditConfig) -> (Self, mpsc::Receiver<SecurityEvent>) {
        Self::new(config.channel_capacity)
    }
}

#[async_trait::async_trait]
impl SecuritySink for ChannelSink {
    async fn emit(&self, event: &SecurityEvent) -> Result<()> {
        self.sender
            .try_send(event.clone())
            .map_err(|e| anyhow::anyhow!("security event channel unavailable: {}", e))
    }
}

/// Emits one structured event per denial
#[derive(Clone)]
pub struct ViolationAuditor {
    sink: Arc<dyn SecuritySink>,
    clock: Arc<dyn Clock>,
    enabled: bool,
}

impl Default for ViolationAuditor {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl std::fmt::Debug for ViolationAuditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViolationAuditor")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl ViolationAuditor {
    /// Create an enabled auditor using the wall clock
    pub fn new(sink: Arc<dyn SecuritySink>) -> Self {
        Self {
            sink,
            clock: Arc::new(SystemClock),
            enabled: true,
        }
    }

    /// Create an auditor from configuration
    pub fn from_config(config: &AuditConfig, sink: Arc<dyn SecuritySink>) -> Self {
        Self::new(sink).with_enabled(config.enabled)
    }

    /// Stamp events from an injected clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Build the event for a denial
    pub fn build_event(
        &self,
        principal: Option<&Principal>,
        required_permission: &str,
        resource: &str,
        extra: Option<ViolationExtra>,
    ) -> SecurityEvent {
        SecurityEvent::permission_denied(
            principal,
            required_permission,
            resource,
            self.clock.now(),
        )
        .with_extra(extra.unwrap_or_default())
    }

    /// Emit one event and wait for the sink, swallowing any failure
    pub async fn record_violation(
        &self,
        principal: Option<&Principal>,
        required_permission: &str,
        resource: &str,
        extra: Option<ViolationExtra>,
    ) {
        if !self.enabled {
            return;
        }

        let event = self.build_event(principal, required_permission, resource, extra);
        deliver(self.sink.as_ref(), &event).await;
    }

    /// Fire-and-forget emission
    ///
    /// Spawns delivery on the current tokio runtime and returns immediately.
    /// Without a runtime the event is dropped with a warning.
    pub fn log_permission_violation(
        &self,
        principal: Option<&Principal>,
        required_permission: &str,
        resource: &str,
        extra: Option<ViolationExtra>,
    ) {
        if !self.enabled {
            return;
        }

        let event = self.build_event(principal, required_permission, resource, extra);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let sink = Arc::clone(&self.sink);
                handle.spawn(async move {
                    deliver(sink.as_ref(), &event).await;
                });
            }
            Err(_) => {
                warn!(
                    required_permission = %event.required_permission,
                    resource = %event.resource,
                    "No async runtime available, dropping security event"
                );
            }
        }
    }
}

async fn deliver(sink: &dyn SecuritySink, event: &SecurityEvent) {
    match sink.emit(event).await {
        Ok(()) => debug!(resource = %event.resource, "Security event emitted"),
        Err(e) => warn!(
            error = %e,
            resource = %event.resource,
            "Failed to emit security event"
        ),
    }
}
