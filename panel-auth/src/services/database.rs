use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document},
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

use super::store::{RoleStore, StoreError, UserStore};
use crate::models::{Role, RoleUpdate, User};

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Clone)]
pub struct MongoStore {
    client: MongoClient,
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for panel-auth");

        create_unique_index(&self.roles(), "name", "role_name_unique").await?;
        create_unique_index(&self.users(), "username", "user_username_unique").await?;
        create_unique_index(&self.users(), "email", "user_email_unique").await?;
        create_unique_index(&self.permissions(), "name", "permission_name_unique").await?;

        tracing::info!("Successfully created all MongoDB indexes");
        Ok(())
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    pub fn roles(&self) -> Collection<Role> {
        self.db.collection("roles")
    }

    pub fn permissions(&self) -> Collection<Document> {
        self.db.collection("permissions")
    }
}

async fn create_unique_index<T>(
    collection: &Collection<T>,
    field: &str,
    name: &str,
) -> Result<(), AppError> {
    let index = IndexModel::builder()
        .keys(doc! { field: 1 })
        .options(
            IndexOptions::builder()
                .name(name.to_string())
                .unique(true)
                .build(),
        )
        .build();

    collection.create_index(index, None).await.map_err(|e| {
        tracing::error!("Failed to create {} index: {}", name, e);
        AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
    })?;
    Ok(())
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY_CODE,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

fn store_error(operation: &str, err: mongodb::error::Error, duplicate_of: &str) -> StoreError {
    if is_duplicate_key(&err) {
        return StoreError::Duplicate(duplicate_of.to_string());
    }
    tracing::error!(operation = %operation, error = %err, "MongoDB operation failed");
    StoreError::Database(anyhow::anyhow!("{}: {}", operation, err))
}

fn query_error(operation: &str, err: mongodb::error::Error) -> StoreError {
    tracing::error!(operation = %operation, error = %err, "MongoDB operation failed");
    StoreError::Database(anyhow::anyhow!("{}: {}", operation, err))
}

fn audit_stamp(modified_by: Option<ObjectId>) -> Document {
    let mut stamp = doc! { "modifiedOn": BsonDateTime::now() };
    if let Some(by) = modified_by {
        stamp.insert("modifiedBy", by);
    }
    stamp
}

#[async_trait]
impl RoleStore for MongoStore {
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        self.roles()
            .find_one(doc! { "name": name }, None)
            .await
            .map_err(|e| query_error("find role by name", e))
    }

    async fn find_role_by_id(&self, id: &ObjectId) -> Result<Option<Role>, StoreError> {
        self.roles()
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| query_error("find role by id", e))
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        let cursor = self
            .roles()
            .find(doc! {}, None)
            .await
            .map_err(|e| query_error("list roles", e))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| query_error("decode roles", e))
    }

    async fn insert_role(&self, role: &Role) -> Result<(), StoreError> {
        self.roles()
            .insert_one(role, None)
            .await
            .map_err(|e| store_error("insert role", e, "Role name"))?;
        Ok(())
    }

    async fn update_role(
        &self,
        id: &ObjectId,
        update: &RoleUpdate,
        modified_by: Option<ObjectId>,
    ) -> Result<bool, StoreError> {
        let mut set = audit_stamp(modified_by);
        set.insert("name", update.name.as_str());
        set.insert("description", update.description.as_str());
        set.insert("permissions", update.permissions.clone());

        let result = self
            .roles()
            .update_one(doc! { "_id": id }, doc! { "$set": set }, None)
            .await
            .map_err(|e| store_error("update role", e, "Role name"))?;
        Ok(result.matched_count > 0)
    }

    async fn set_role_active(
        &self,
        id: &ObjectId,
        is_active: bool,
        modified_by: Option<ObjectId>,
    ) -> Result<bool, StoreError> {
        let mut set = audit_stamp(modified_by);
        set.insert("isActive", is_active);

        let result = self
            .roles()
            .update_one(doc! { "_id": id }, doc! { "$set": set }, None)
            .await
            .map_err(|e| query_error("update role status", e))?;
        Ok(result.matched_count > 0)
    }

    async fn delete_role(&self, id: &ObjectId) -> Result<bool, StoreError> {
        let result = self
            .roles()
            .delete_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| query_error("delete role", e))?;
        Ok(result.deleted_count > 0)
    }

    async fn list_permission_names(&self) -> Result<Vec<String>, StoreError> {
        let documents: Vec<Document> = self
            .permissions()
            .find(doc! {}, None)
            .await
            .map_err(|e| query_error("list permissions", e))?
            .try_collect()
            .await
            .map_err(|e| query_error("decode permissions", e))?;

        // Catalog entries without a string name are skipped
        Ok(documents
            .iter()
            .filter_map(|d| d.get_str("name").ok().map(str::to_string))
            .collect())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| query_error("ping", e))?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.users()
            .find_one(doc! { "username": username }, None)
            .await
            .map_err(|e| query_error("find user by username", e))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.users()
            .find_one(doc! { "email": email }, None)
            .await
            .map_err(|e| query_error("find user by email", e))
    }

    async fn find_user_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        self.users()
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| query_error("find user by id", e))
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.users()
            .insert_one(user, None)
            .await
            .map_err(|e| store_error("insert user", e, "Email or username"))?;
        Ok(())
    }

    async fn update_password(
        &self,
        id: &ObjectId,
        password_hash: &str,
        modified_by: Option<ObjectId>,
    ) -> Result<bool, StoreError> {
        let mut set = audit_stamp(modified_by);
        set.insert("password", password_hash);

        let result = self
            .users()
            .update_one(doc! { "_id": id }, doc! { "$set": set }, None)
            .await
            .map_err(|e| query_error("update password", e))?;
        Ok(result.matched_count > 0)
    }

    async fn record_login(&self, id: &ObjectId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let at = BsonDateTime::from_chrono(at);
        self.users()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "lastLogin": at, "modifiedOn": at } },
                None,
            )
            .await
            .map_err(|e| query_error("record login", e))?;
        Ok(())
    }
}
