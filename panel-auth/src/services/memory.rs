use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use std::sync::{Mutex, MutexGuard};

use super::store::{RoleStore, StoreError, UserStore};
use crate::models::{Role, RoleUpdate, User};

/// Mutex-guarded store with the same uniqueness rules as the MongoDB indexes.
#[derive(Default)]
pub struct InMemoryStore {
    roles: Mutex<Vec<Role>>,
    users: Mutex<Vec<User>>,
    permissions: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|e| StoreError::Database(anyhow::anyhow!("In-memory store mutex poisoned: {}", e)))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the permission catalog.
    pub fn set_permissions<I, S>(&self, names: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *lock(&self.permissions)? = names.into_iter().map(Into::into).collect();
        Ok(())
    }
}

#[async_trait]
impl RoleStore for InMemoryStore {
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        Ok(lock(&self.roles)?.iter().find(|r| r.name == name).cloned())
    }

    async fn find_role_by_id(&self, id: &ObjectId) -> Result<Option<Role>, StoreError> {
        Ok(lock(&self.roles)?.iter().find(|r| &r.id == id).cloned())
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        Ok(lock(&self.roles)?.clone())
    }

    async fn insert_role(&self, role: &Role) -> Result<(), StoreError> {
        let mut roles = lock(&self.roles)?;
        if roles.iter().any(|r| r.name == role.name || r.id == role.id) {
            return Err(StoreError::Duplicate("Role name".to_string()));
        }
        roles.push(role.clone());
        Ok(())
    }

    async fn update_role(
        &self,
        id: &ObjectId,
        update: &RoleUpdate,
        modified_by: Option<ObjectId>,
    ) -> Result<bool, StoreError> {
        let mut roles = lock(&self.roles)?;
        if roles.iter().any(|r| &r.id != id && r.name == update.name) {
            return Err(StoreError::Duplicate("Role name".to_string()));
        }
        match roles.iter_mut().find(|r| &r.id == id) {
            Some(role) => {
                role.name = update.name.clone();
                role.description = update.description.clone();
                role.permissions = update.permissions.clone();
                role.modified_on = Utc::now();
                role.modified_by = modified_by;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_role_active(
        &self,
        id: &ObjectId,
        is_active: bool,
        modified_by: Option<ObjectId>,
    ) -> Result<bool, StoreError> {
        let mut roles = lock(&self.roles)?;
        match roles.iter_mut().find(|r| &r.id == id) {
            Some(role) => {
                role.is_active = is_active;
                role.modified_on = Utc::now();
                role.modified_by = modified_by;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_role(&self, id: &ObjectId) -> Result<bool, StoreError> {
        let mut roles = lock(&self.roles)?;
        let before = roles.len();
        roles.retain(|r| &r.id != id);
        Ok(roles.len() != before)
    }

    async fn list_permission_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(lock(&self.permissions)?.clone())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(lock(&self.users)?
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(lock(&self.users)?.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        Ok(lock(&self.users)?.iter().find(|u| &u.id == id).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut users = lock(&self.users)?;
        if users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email || u.id == user.id)
        {
            return Err(StoreError::Duplicate("Email or username".to_string()));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn update_password(
        &self,
        id: &ObjectId,
        password_hash: &str,
        modified_by: Option<ObjectId>,
    ) -> Result<bool, StoreError> {
        let mut users = lock(&self.users)?;
        match users.iter_mut().find(|u| &u.id == id) {
            Some(user) => {
                user.password_hash = Some(password_hash.to_string());
                user.modified_on = Utc::now();
                user.modified_by = modified_by;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_login(&self, id: &ObjectId, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(user) = lock(&self.users)?.iter_mut().find(|u| &u.id == id) {
            user.last_login = Some(at);
            user.modified_on = at;
        }
        Ok(())
    }
}
