use service_core::{
    axum::{extract::State, http::StatusCode, response::IntoResponse, Json},
    error::AppError,
};

use crate::{
    dtos::{auth::LoginRequest, MessageResponse},
    middleware::AuthUser,
    utils::ValidatedJson,
    AppState,
};

/// Login with username and password
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth_service.login(&req.username, &req.password).await?;
    Ok((StatusCode::OK, Json(res)))
}

/// Sessions are stateless tokens; the client discards its copy.
pub async fn logout(user: AuthUser) -> Result<impl IntoResponse, AppError> {
    tracing::info!(user_id = %user.0.user_id, "User logged out");
    Ok((
        StatusCode::OK,
        Json(MessageResponse::new("Logged out successfully")),
    ))
}
