//! Axum response mapping for authorization errors
//!
//! Clients see only the status and a generic message. Policy detail stays
//! in the server logs.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::AuthzError;

impl AuthzError {
    /// Message safe to show to end users
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthzError::AuthenticationRequired => "Authentication required",
            AuthzError::InsufficientPermission { .. } | AuthzError::PolicyViolation { .. } => {
                "Forbidden"
            }
            AuthzError::MalformedInput { .. } | AuthzError::UnknownToken { .. } => "Bad request",
            AuthzError::InvalidConfig { .. }
            | AuthzError::ConfigRead(_)
            | AuthzError::ConfigParse(_) => "Internal server error",
        }
    }
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Authorization engine failure");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Authorization rejected");
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
