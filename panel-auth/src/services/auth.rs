use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use super::google::GoogleProfile;
use super::jwt::{JwtService, SessionClaims};
use super::store::{bounded, RoleStore, UserStore};
use crate::dtos::auth::LoginResponse;
use crate::models::{AuthProvider, RoleResponse, User, UserResponse};
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Credential checks and session issuance for local and Google identities.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    roles: Arc<dyn RoleStore>,
    jwt: JwtService,
    store_timeout: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        roles: Arc<dyn RoleStore>,
        jwt: JwtService,
        store_timeout: Duration,
    ) -> Self {
        Self {
            users,
            roles,
            jwt,
            store_timeout,
        }
    }

    /// Username/password login.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AppError> {
        let Some(user) = bounded(self.store_timeout, self.users.find_user_by_username(username))
            .await?
        else {
            // Same hashing cost as a wrong password
            let _ = verify_password(&Password::new(password.to_string()), dummy_hash());
            tracing::debug!(username = %username, "Login for unknown username");
            return Err(AppError::AuthError(anyhow::anyhow!(INVALID_CREDENTIALS)));
        };

        if !user.is_local() {
            return Err(AppError::AuthError(anyhow::anyhow!(
                "This account uses a social login. Please log in with Google."
            )));
        }

        let stored_hash = PasswordHashString::new(user.password_hash.clone().unwrap_or_default());
        if !verify_password(&Password::new(password.to_string()), &stored_hash) {
            tracing::debug!(username = %username, "Login with wrong password");
            return Err(AppError::AuthError(anyhow::anyhow!(INVALID_CREDENTIALS)));
        }

        if !user.is_active {
            return Err(AppError::Forbidden(anyhow::anyhow!("Account is disabled")));
        }

        let response = self.start_session(user).await?;
        tracing::info!(user_id = %response.user.id, role = %response.role.name, "User logged in");
        Ok(response)
    }

    /// Find or create the identity behind a Google profile and start a session.
    ///
    /// An email already owned by a local account is a conflict, never a merge.
    pub async fn google_sign_in(
        &self,
        profile: GoogleProfile,
        default_role: &str,
    ) -> Result<LoginResponse, AppError> {
        if !profile.verified_email {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Google account email not verified"
            )));
        }

        let existing = bounded(self.store_timeout, self.users.find_user_by_email(&profile.email))
            .await?;

        let user = match existing {
            Some(user) if user.provider != AuthProvider::Google => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "This email is already registered using username/password"
                )));
            }
            Some(user) => user,
            None => {
                let role = bounded(self.store_timeout, self.roles.find_role_by_name(default_role))
                    .await?
                    .ok_or_else(|| {
                        tracing::error!(role = %default_role, "Default social role missing");
                        AppError::InternalError(anyhow::anyhow!(
                            "Server is not configured correctly, default role missing"
                        ))
                    })?;

                let username = self.free_username(&profile).await?;
                let user = User::new_google(username, profile.email, profile.id, role.id);
                bounded(self.store_timeout, self.users.insert_user(&user)).await?;
                tracing::info!(user_id = %user.id.to_hex(), "Created Google identity");
                user
            }
        };

        if !user.is_active {
            return Err(AppError::Forbidden(anyhow::anyhow!("Account is disabled")));
        }

        let response = self.start_session(user).await?;
        tracing::info!(user_id = %response.user.id, "User logged in via Google");
        Ok(response)
    }

    /// First unused username for a new Google identity: the display name,
    /// then the email, then the email suffixed with the Google id.
    async fn free_username(&self, profile: &GoogleProfile) -> Result<String, AppError> {
        let candidates = profile
            .name
            .iter()
            .filter(|n| !n.trim().is_empty())
            .cloned()
            .chain([
                profile.email.clone(),
                format!("{}#{}", profile.email, profile.id),
            ]);

        for candidate in candidates {
            let taken = bounded(self.store_timeout, self.users.find_user_by_username(&candidate))
                .await?
                .is_some();
            if !taken {
                return Ok(candidate);
            }
            tracing::debug!(username = %candidate, "Username taken, trying next candidate");
        }

        Err(AppError::Conflict(anyhow::anyhow!(
            "No free username for this Google account"
        )))
    }

    /// Replace the caller's password after checking the current one.
    pub async fn change_password(
        &self,
        claims: &SessionClaims,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let user_id = session_user_id(claims)?;
        let user = bounded(self.store_timeout, self.users.find_user_by_id(&user_id))
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

        let Some(current_hash) = user.password_hash.clone().filter(|_| user.is_local()) else {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Password change is not available for social login accounts"
            )));
        };

        if !verify_password(
            &Password::new(old_password.to_string()),
            &PasswordHashString::new(current_hash),
        ) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Current password is incorrect"
            )));
        }

        let new_hash = hash_password(&Password::new(new_password.to_string()))?;
        let updated = bounded(
            self.store_timeout,
            self.users
                .update_password(&user_id, new_hash.as_str(), Some(user_id)),
        )
        .await?;
        if !updated {
            return Err(AppError::NotFound(anyhow::anyhow!("User not found")));
        }

        tracing::info!(user_id = %claims.user_id, "Password changed");
        Ok(())
    }

    /// The caller's own identity.
    pub async fn profile(&self, claims: &SessionClaims) -> Result<UserResponse, AppError> {
        let user_id = session_user_id(claims)?;
        bounded(self.store_timeout, self.users.find_user_by_id(&user_id))
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))
    }

    /// Create a local identity on behalf of an administrator.
    pub async fn create_local_user(
        &self,
        admin: &SessionClaims,
        username: String,
        email: String,
        password: &str,
        role_id: ObjectId,
    ) -> Result<UserResponse, AppError> {
        let admin_id = session_user_id(admin)?;

        if bounded(self.store_timeout, self.roles.find_role_by_id(&role_id))
            .await?
            .is_none()
        {
            return Err(AppError::BadRequest(anyhow::anyhow!("Role not found")));
        }

        let hash = hash_password(&Password::new(password.to_string()))?;
        let user = User::new_local(username, email, hash.into_string(), role_id, Some(admin_id));

        // Duplicate usernames or emails surface as 409
        bounded(self.store_timeout, self.users.insert_user(&user)).await?;

        tracing::info!(
            user_id = %user.id.to_hex(),
            created_by = %admin.user_id,
            "Admin created user"
        );
        Ok(user.sanitized())
    }

    /// Resolve the user's role, stamp the login and sign a token.
    async fn start_session(&self, mut user: User) -> Result<LoginResponse, AppError> {
        let role = bounded(self.store_timeout, self.roles.find_role_by_id(&user.role_id))
            .await?
            .ok_or_else(|| {
                tracing::warn!(
                    user_id = %user.id.to_hex(),
                    role_id = %user.role_id.to_hex(),
                    "User references a missing role"
                );
                AppError::InternalError(anyhow::anyhow!("User role configuration is invalid"))
            })?;

        let now = Utc::now();
        bounded(self.store_timeout, self.users.record_login(&user.id, now)).await?;
        user.last_login = Some(now);
        user.modified_on = now;

        let token = self
            .jwt
            .issue(&user.username, &role.name, &user.id.to_hex())?;

        Ok(LoginResponse {
            token,
            user: UserResponse::from(user),
            role: RoleResponse::from(role),
        })
    }
}

/// Hash verified against on the unknown-username path.
fn dummy_hash() -> &'static PasswordHashString {
    static DUMMY: OnceLock<PasswordHashString> = OnceLock::new();
    DUMMY.get_or_init(|| {
        hash_password(&Password::new("panel-auth-unknown-user".to_string())).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to prepare dummy password hash");
            PasswordHashString::new(String::new())
        })
    })
}

/// The identity id a token was issued for.
pub fn session_user_id(claims: &SessionClaims) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(&claims.user_id).map_err(|_| {
        tracing::warn!(user_id = %claims.user_id, "Session carries a malformed user id");
        AppError::Unauthorized(anyhow::anyhow!("Invalid or expired token"))
    })
}
