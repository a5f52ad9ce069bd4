//! Error types for authorization operations

use http::StatusCode;
use thiserror::Error;

/// Result type for authorization operations
pub type AuthzResult<T> = Result<T, AuthzError>;

/// Authorization errors
///
/// Predicates in this crate return `false` for expected denials. These
/// variants surface only from [`crate::evaluator::require_permission`],
/// the [`crate::service::AuthorizationService`] facade, malformed caller
/// input, and configuration loading.
#[derive(Error, Debug)]
pub enum AuthzError {
    /// No principal where one is mandatory
    #[error("User authentication required")]
    AuthenticationRequired,

    /// Authenticated but lacking the grant
    #[error("{message}")]
    InsufficientPermission { permission: String, message: String },

    /// Contextual check failed despite base capability
    #[error("Access policy denied {action} on {resource}")]
    PolicyViolation { resource: String, action: String },

    /// Caller supplied an impossible context
    #[error("Malformed input: {message}")]
    MalformedInput { message: String },

    /// Token outside the closed catalog
    #[error("Unknown {kind}: {value}")]
    UnknownToken { kind: &'static str, value: String },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// IO error reading configuration file
    #[error("Failed to read config file: {0}")]
    ConfigRead(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),
}

impl AuthzError {
    /// Create an insufficient permission error with the default message
    pub fn insufficient_permission(permission: impl Into<String>) -> Self {
        let permission = permission.into();
        let message = format!("Insufficient permissions: {} required", permission);
        Self::InsufficientPermission { permission, message }
    }

    /// Create an insufficient permission error with a caller-supplied message
    pub fn insufficient_permission_with_message(
        permission: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InsufficientPermission {
            permission: permission.into(),
            message: message.into(),
        }
    }

    /// Create a policy violation error
    pub fn policy_violation(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self::PolicyViolation {
            resource: resource.into(),
            action: action.into(),
        }
    }

    /// Create a malformed input error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }

    /// Create an unknown token error
    pub fn unknown_token(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownToken {
            kind,
            value: value.into(),
        }
    }

    /// Create a new invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Check if this error means no principal was present
    pub fn is_authentication_required(&self) -> bool {
        matches!(self, Self::AuthenticationRequired)
    }

    /// Check if this error is a 403-class denial
    pub fn is_forbidden(&self) -> bool {
        matches!(
            self,
            Self::InsufficientPermission { .. } | Self::PolicyViolation { .. }
        )
    }

    /// HTTP status an outer layer should answer with
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            Self::InsufficientPermission { .. } | Self::PolicyViolation { .. } => {
                StatusCode::FORBIDDEN
            }
            Self::MalformedInput { .. } | Self::UnknownToken { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidConfig { .. } | Self::ConfigRead(_) | Self::ConfigParse(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
