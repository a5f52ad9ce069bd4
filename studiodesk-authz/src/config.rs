//! Configuration for the authorization engine

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AuthzError, AuthzResult};

/// Upper bound for the audit channel
const MAX_CHANNEL_CAPACITY: usize = 65_536;

/// Authorization engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthzConfig {
    /// Denial auditing
    pub audit: AuditConfig,

    /// Time source settings for business-hours checks
    pub clock: ClockConfig,
}

/// Audit emission settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Emit security events for denials
    pub enabled: bool,

    /// Buffer size when forwarding events over a channel
    pub channel_capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_capacity: 1024,
        }
    }
}

/// Clock settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Offset of the studio's local time from UTC, in minutes
    pub utc_offset_minutes: i32,
}

impl ClockConfig {
    pub fn utc_offset(&self) -> AuthzResult<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            AuthzError::invalid_config(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }
}

impl AuthzConfig {
    /// Parse configuration from YAML text
    pub fn from_yaml_str(content: &str) -> AuthzResult<Self> {
        let config: AuthzConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all settings
    pub fn validate(&self) -> AuthzResult<()> {
        if self.audit.channel_capacity == 0 {
            return Err(AuthzError::invalid_config(
                "audit.channel_capacity must be greater than zero",
            ));
        }
        if self.audit.channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(AuthzError::invalid_config(format!(
                "audit.channel_capacity cannot exceed {}",
                MAX_CHANNEL_CAPACITY
            )));
        }
        self.clock.utc_offset()?;
        Ok(())
    }
}

/// Configuration loader with environment variable support
pub struct AuthzConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl Default for AuthzConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthzConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "STUDIODESK".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> AuthzResult<AuthzConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AuthzConfig = serde_yaml::from_str(&content)?;
        self.apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> AuthzResult<AuthzConfig> {
        let mut config = AuthzConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file when given, otherwise from the environment
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> AuthzResult<AuthzConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    fn apply_env_overrides(&self, config: &mut AuthzConfig) -> AuthzResult<()> {
        if let Some(enabled) = self.get_env_var("AUDIT_ENABLED") {
            config.audit.enabled = parse_bool(&enabled).ok_or_else(|| {
                AuthzError::invalid_config(format!("{} is not a boolean", self.var_name("AUDIT_ENABLED")))
            })?;
        }

        if let Some(capacity) = self.get_env_var("AUDIT_CHANNEL_CAPACITY") {
            config.audit.channel_capacity = capacity.parse().map_err(|e| {
                AuthzError::invalid_config(format!(
                    "{}: {}",
                    self.var_name("AUDIT_CHANNEL_CAPACITY"),
                    e
                ))
            })?;
        }

        if let Some(offset) = self.get_env_var("UTC_OFFSET_MINUTES") {
            config.clock.utc_offset_minutes = offset.parse().map_err(|e| {
                AuthzError::invalid_config(format!(
                    "{}: {}",
                    self.var_name("UTC_OFFSET_MINUTES"),
                    e
                ))
            })?;
        }

        Ok(())
    }

    fn var_name(&self, key: &str) -> String {
        format!("{}_{}", self.prefix, key)
    }

    fn get_env_var(&self, key: &str) -> Option<String> {
        std::env::var(self.var_name(key)).ok()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
