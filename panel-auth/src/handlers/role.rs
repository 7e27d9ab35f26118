use service_core::{
    axum::{
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
        Json,
    },
    error::AppError,
};

use crate::{
    dtos::{
        admin::{RoleRequest, RoleStatusRequest},
        MessageResponse,
    },
    middleware::AuthUser,
    models::{Role, RoleResponse, RoleUpdate},
    services::{auth::session_user_id, bounded, StoreError},
    utils::{parse_object_id, ValidatedJson},
    AppState,
};

fn role_not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Role not found"))
}

// Role names are user input; a clash is a bad request rather than a conflict
fn name_taken(err: StoreError) -> AppError {
    match err {
        StoreError::Duplicate(_) => AppError::BadRequest(anyhow::anyhow!("Role name already in use")),
        other => other.into(),
    }
}

/// Create a role
pub async fn create_role(
    State(state): State<AppState>,
    admin: AuthUser,
    ValidatedJson(req): ValidatedJson<RoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let admin_id = session_user_id(&admin.0)?;
    let role = Role::new(req.name, req.description, req.permissions, Some(admin_id));

    bounded(state.config.store.timeout(), state.roles.insert_role(&role))
        .await
        .map_err(name_taken)?;

    tracing::info!(role = %role.name, created_by = %admin.0.user_id, "Role created");
    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

/// List all roles
pub async fn list_roles(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let roles = bounded(state.config.store.timeout(), state.roles.list_roles()).await?;
    let roles: Vec<RoleResponse> = roles.into_iter().map(RoleResponse::from).collect();
    Ok((StatusCode::OK, Json(roles)))
}

/// Get one role
pub async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_object_id(&id, "role ID")?;
    let role = bounded(state.config.store.timeout(), state.roles.find_role_by_id(&id))
        .await?
        .ok_or_else(role_not_found)?;
    Ok((StatusCode::OK, Json(RoleResponse::from(role))))
}

/// Replace a role's name, description and permissions
pub async fn update_role(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<RoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_object_id(&id, "role ID")?;
    let admin_id = session_user_id(&admin.0)?;
    let update = RoleUpdate {
        name: req.name,
        description: req.description,
        permissions: req.permissions,
    };

    let updated = bounded(
        state.config.store.timeout(),
        state.roles.update_role(&id, &update, Some(admin_id)),
    )
    .await
    .map_err(name_taken)?;
    if !updated {
        return Err(role_not_found());
    }

    tracing::info!(role_id = %id.to_hex(), modified_by = %admin.0.user_id, "Role updated");
    Ok((StatusCode::OK, Json(MessageResponse::new("Role updated successfully"))))
}

/// Delete a role; default roles are protected
pub async fn delete_role(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_object_id(&id, "role ID")?;
    let timeout = state.config.store.timeout();

    let role = bounded(timeout, state.roles.find_role_by_id(&id))
        .await?
        .ok_or_else(role_not_found)?;
    if role.is_default {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Default roles cannot be deleted"
        )));
    }

    if !bounded(timeout, state.roles.delete_role(&id)).await? {
        return Err(role_not_found());
    }

    tracing::info!(role = %role.name, deleted_by = %admin.0.user_id, "Role deleted");
    Ok((StatusCode::OK, Json(MessageResponse::new("Role deleted successfully"))))
}

/// Activate or deactivate a role
pub async fn toggle_role_status(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<RoleStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_object_id(&id, "role ID")?;
    let admin_id = session_user_id(&admin.0)?;

    let updated = bounded(
        state.config.store.timeout(),
        state.roles.set_role_active(&id, req.is_active, Some(admin_id)),
    )
    .await?;
    if !updated {
        return Err(role_not_found());
    }

    tracing::info!(role_id = %id.to_hex(), is_active = req.is_active, "Role status changed");
    Ok((
        StatusCode::OK,
        Json(MessageResponse::new("Role status updated successfully")),
    ))
}

/// List the permission catalog
pub async fn list_permissions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let names = bounded(state.config.store.timeout(), state.roles.list_permission_names()).await?;
    Ok((StatusCode::OK, Json(names)))
}
