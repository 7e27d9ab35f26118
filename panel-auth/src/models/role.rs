//! Role model - a named permission set referenced by users and carried in tokens.

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Permission entry that grants every permission.
pub const WILDCARD_PERMISSION: &str = "*";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_on: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<ObjectId>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub modified_on: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_by: Option<ObjectId>,
}

impl Role {
    /// Create an active, deletable role.
    pub fn new(
        name: String,
        description: String,
        permissions: Vec<String>,
        created_by: Option<ObjectId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            name,
            description,
            permissions,
            is_active: true,
            is_default: false,
            created_on: now,
            created_by,
            modified_on: now,
            modified_by: created_by,
        }
    }

    /// Whether this role's permission set admits `permission`.
    ///
    /// `"*"` admits everything; otherwise membership is an exact string match.
    pub fn grants(&self, permission: &str) -> bool {
        self.permissions
            .iter()
            .any(|p| p == WILDCARD_PERMISSION || p == permission)
    }
}

/// Editable fields of a role.
#[derive(Debug, Clone)]
pub struct RoleUpdate {
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub is_default: bool,
    pub created_on: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub modified_on: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_by: Option<String>,
}

impl From<Role> for RoleResponse {
    fn from(r: Role) -> Self {
        Self {
            id: r.id.to_hex(),
            name: r.name,
            description: r.description,
            permissions: r.permissions,
            is_active: r.is_active,
            is_default: r.is_default,
            created_on: r.created_on,
            created_by: r.created_by.map(|id| id.to_hex()),
            modified_on: r.modified_on,
            modified_by: r.modified_by.map(|id| id.to_hex()),
        }
    }
}
