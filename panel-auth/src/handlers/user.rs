use service_core::{
    axum::{extract::State, http::StatusCode, response::IntoResponse, Json},
    error::AppError,
};

use crate::{
    dtos::{admin::AdminCreateUserRequest, auth::ChangePasswordRequest, MessageResponse},
    middleware::AuthUser,
    utils::{parse_object_id, ValidatedJson},
    AppState,
};

/// Get the caller's own profile
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.auth_service.profile(&user.0).await?;
    Ok((StatusCode::OK, Json(profile)))
}

/// Change the caller's password
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth_service
        .change_password(&user.0, &req.old_password, &req.new_password)
        .await?;
    Ok((
        StatusCode::OK,
        Json(MessageResponse::new("Password changed successfully")),
    ))
}

/// Create a local user (admin)
pub async fn admin_create_user(
    State(state): State<AppState>,
    admin: AuthUser,
    ValidatedJson(req): ValidatedJson<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role_id = parse_object_id(&req.role_id, "Role ID")?;
    let user = state
        .auth_service
        .create_local_user(&admin.0, req.username, req.email, &req.password, role_id)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}
