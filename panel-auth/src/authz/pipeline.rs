//! Request authorization as a chain of typed stages.
//!
//! Each stage consumes the previous one, so a handler can only ever see an
//! [`Admitted`] value that went through authentication and every configured
//! gate in order:
//!
//! `headers -> Authenticated -> RoleChecked -> PermissionChecked -> Admitted`

use service_core::axum::http::{header, HeaderMap};
use std::time::Duration;

use super::{AccessPolicy, AuthzError};
use crate::services::{bounded, JwtService, RoleStore, SessionClaims};

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug)]
pub struct Authenticated {
    claims: SessionClaims,
}

#[derive(Debug)]
pub struct RoleChecked {
    claims: SessionClaims,
}

#[derive(Debug)]
pub struct PermissionChecked {
    claims: SessionClaims,
}

/// A request that passed every stage, with the caller's claims.
#[derive(Debug, Clone)]
pub struct Admitted {
    claims: SessionClaims,
}

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthzError> {
    let value = match headers.get(header::AUTHORIZATION) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(AuthzError::AuthHeaderMissing),
    };

    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .ok_or(AuthzError::AuthHeaderMalformed)
}

/// Authentication stage: a well-formed header carrying a token the codec accepts.
pub fn authenticate(headers: &HeaderMap, jwt: &JwtService) -> Result<Authenticated, AuthzError> {
    let token = bearer_token(headers)?;
    let claims = jwt.validate(token)?;
    Ok(Authenticated { claims })
}

impl Authenticated {
    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }

    /// Role gate: exact match of the token's role against the allow-list.
    pub fn require_role(self, allowed: Option<&[String]>) -> Result<RoleChecked, AuthzError> {
        if let Some(allowed) = allowed {
            if !allowed.iter().any(|r| *r == self.claims.role) {
                tracing::debug!(
                    username = %self.claims.username,
                    role = %self.claims.role,
                    "Role not in allow-list"
                );
                return Err(AuthzError::RoleForbidden);
            }
        }
        Ok(RoleChecked {
            claims: self.claims,
        })
    }
}

impl RoleChecked {
    /// Permission gate: resolves the token's role in the store under `limit`.
    ///
    /// The store is only consulted when a permission is required.
    pub async fn require_permission(
        self,
        permission: Option<&str>,
        roles: &dyn RoleStore,
        limit: Duration,
    ) -> Result<PermissionChecked, AuthzError> {
        let Some(permission) = permission else {
            return Ok(PermissionChecked {
                claims: self.claims,
            });
        };

        let role = bounded(limit, roles.find_role_by_name(&self.claims.role))
            .await
            .map_err(AuthzError::StoreUnavailable)?
            .ok_or(AuthzError::RoleNotFound)?;

        if !role.grants(permission) {
            tracing::debug!(
                username = %self.claims.username,
                role = %role.name,
                permission = %permission,
                "Role lacks permission"
            );
            return Err(AuthzError::PermissionDenied {
                permission: permission.to_string(),
            });
        }

        Ok(PermissionChecked {
            claims: self.claims,
        })
    }
}

impl PermissionChecked {
    pub fn admit(self) -> Admitted {
        Admitted {
            claims: self.claims,
        }
    }
}

impl Admitted {
    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }
}

/// Run every stage `policy` asks for.
pub async fn authorize_request(
    policy: &AccessPolicy,
    headers: &HeaderMap,
    jwt: &JwtService,
    roles: &dyn RoleStore,
    store_timeout: Duration,
) -> Result<Admitted, AuthzError> {
    let admitted = authenticate(headers, jwt)?
        .require_role(policy.roles.as_deref())?
        .require_permission(policy.permission.as_deref(), roles, store_timeout)
        .await?
        .admit();
    Ok(admitted)
}
