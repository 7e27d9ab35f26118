//! User model - local and federated identities.

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::opt_chrono_datetime_as_bson_datetime;

/// Where an identity's credentials live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Local,
    Google,
}

impl std::fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthProvider::Local => write!(f, "local"),
            AuthProvider::Google => write!(f, "google"),
        }
    }
}

/// Stored identity.
///
/// `password_hash` is present exactly when `provider` is [`AuthProvider::Local`];
/// the constructors are the only way this crate builds one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    pub email: String,
    #[serde(rename = "password", default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub role_id: ObjectId,
    pub is_active: bool,
    pub provider: AuthProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_on: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<ObjectId>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub modified_on: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_by: Option<ObjectId>,
}

impl User {
    /// Create a username/password identity.
    pub fn new_local(
        username: String,
        email: String,
        password_hash: String,
        role_id: ObjectId,
        created_by: Option<ObjectId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            username,
            email,
            password_hash: Some(password_hash),
            role_id,
            is_active: true,
            provider: AuthProvider::Local,
            provider_id: None,
            last_login: None,
            created_on: now,
            created_by,
            modified_on: now,
            modified_by: created_by,
        }
    }

    /// Create an identity backed by a Google account.
    pub fn new_google(username: String, email: String, google_id: String, role_id: ObjectId) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            username,
            email,
            password_hash: None,
            role_id,
            is_active: true,
            provider: AuthProvider::Google,
            provider_id: Some(google_id),
            last_login: None,
            created_on: now,
            created_by: None,
            modified_on: now,
            modified_by: None,
        }
    }

    pub fn is_local(&self) -> bool {
        self.provider == AuthProvider::Local
    }

    /// Convert to sanitized response (no credentials, no provider id).
    pub fn sanitized(&self) -> UserResponse {
        UserResponse::from(self.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role_id: String,
    pub is_active: bool,
    pub provider: AuthProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_on: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub modified_on: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_by: Option<String>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id.to_hex(),
            username: u.username,
            email: u.email,
            role_id: u.role_id.to_hex(),
            is_active: u.is_active,
            provider: u.provider,
            last_login: u.last_login,
            created_on: u.created_on,
            created_by: u.created_by.map(|id| id.to_hex()),
            modified_on: u.modified_on,
            modified_by: u.modified_by.map(|id| id.to_hex()),
        }
    }
}
