//! Storage seams for identities, roles and the permission catalog.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::models::{Role, RoleUpdate, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate {0}")]
    Duplicate(String),

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("store failure: {0}")]
    Database(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => {
                AppError::Conflict(anyhow::anyhow!("{} already exists", what))
            }
            StoreError::Timeout(limit) => {
                AppError::DatabaseError(anyhow::anyhow!("store timed out after {:?}", limit))
            }
            StoreError::Database(e) => AppError::DatabaseError(e),
        }
    }
}

/// Run a store call under a deadline. Dropping the returned future cancels
/// the call.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError>;
    async fn find_role_by_id(&self, id: &ObjectId) -> Result<Option<Role>, StoreError>;
    async fn list_roles(&self) -> Result<Vec<Role>, StoreError>;
    /// Fails with [`StoreError::Duplicate`] when the name is taken.
    async fn insert_role(&self, role: &Role) -> Result<(), StoreError>;
    /// Returns `false` when no role has this id.
    async fn update_role(
        &self,
        id: &ObjectId,
        update: &RoleUpdate,
        modified_by: Option<ObjectId>,
    ) -> Result<bool, StoreError>;
    /// Returns `false` when no role has this id.
    async fn set_role_active(
        &self,
        id: &ObjectId,
        is_active: bool,
        modified_by: Option<ObjectId>,
    ) -> Result<bool, StoreError>;
    /// Returns `false` when no role has this id.
    async fn delete_role(&self, id: &ObjectId) -> Result<bool, StoreError>;
    /// Names from the permission catalog, in storage order.
    async fn list_permission_names(&self) -> Result<Vec<String>, StoreError>;
    async fn health_check(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError>;
    /// Fails with [`StoreError::Duplicate`] when the username or email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;
    /// Returns `false` when no user has this id.
    async fn update_password(
        &self,
        id: &ObjectId,
        password_hash: &str,
        modified_by: Option<ObjectId>,
    ) -> Result<bool, StoreError>;
    async fn record_login(&self, id: &ObjectId, at: DateTime<Utc>) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_core::axum::http::StatusCode;

    #[tokio::test]
    async fn bounded_passes_results_through() {
        let value = bounded(Duration::from_millis(50), async { Ok::<_, StoreError>(7) })
            .await
            .expect("in time");
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn bounded_times_out() {
        let result = bounded(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, StoreError>(())
        })
        .await;
        assert!(matches!(result, Err(StoreError::Timeout(_))));
    }

    #[test]
    fn store_errors_map_to_http_statuses() {
        assert_eq!(
            AppError::from(StoreError::Duplicate("username or email".into())).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(StoreError::Timeout(Duration::from_secs(1))).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
