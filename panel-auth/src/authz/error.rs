use serde::Serialize;
use service_core::axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::services::{StoreError, TokenError};

/// Every way the authorization pipeline can refuse a request.
#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("Authorization header is required")]
    AuthHeaderMissing,

    #[error("Invalid authorization format. Use 'Bearer <token>'")]
    AuthHeaderMalformed,

    #[error("Invalid or expired token")]
    TokenInvalid,

    #[error("Invalid or expired token")]
    TokenExpired,

    #[error("Access denied. Role not found.")]
    RoleNotFound,

    #[error("Insufficient permissions")]
    RoleForbidden,

    #[error("You do not have the required permission for this action.")]
    PermissionDenied { permission: String },

    #[error("Role store unavailable")]
    StoreUnavailable(#[source] StoreError),
}

impl From<TokenError> for AuthzError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthzError::TokenExpired,
            TokenError::Malformed | TokenError::SignatureInvalid => AuthzError::TokenInvalid,
        }
    }
}

#[derive(Debug, Serialize)]
struct DenialBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    permission_needed: Option<String>,
}

impl AuthzError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthzError::AuthHeaderMissing
            | AuthzError::AuthHeaderMalformed
            | AuthzError::TokenInvalid
            | AuthzError::TokenExpired => StatusCode::UNAUTHORIZED,
            AuthzError::RoleNotFound
            | AuthzError::RoleForbidden
            | AuthzError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            AuthzError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AuthzError::StoreUnavailable(e) => {
                tracing::error!(error = %e, "Role lookup failed during authorization");
            }
            other => tracing::warn!(status = %status.as_u16(), reason = ?other, "Request denied"),
        }

        let permission_needed = match &self {
            AuthzError::PermissionDenied { permission } => Some(permission.clone()),
            _ => None,
        };

        (
            status,
            Json(DenialBody {
                error: self.to_string(),
                permission_needed,
            }),
        )
            .into_response()
    }
}
