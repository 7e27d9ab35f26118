mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, VIEWER_PASSWORD};
use mongodb::bson::oid::ObjectId;
use panel_auth::{models::User, services::UserStore};
use serde_json::json;

#[tokio::test]
async fn profile_returns_sanitized_identity() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .call(Method::GET, "/api/profile", Some(&app.viewer_token()), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], app.viewer.id.to_hex());
    assert_eq!(body["email"], "vera@example.com");
    assert_eq!(body["roleId"], app.viewer_role.id.to_hex());
    assert_eq!(body["provider"], "local");
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn profile_of_deleted_identity_is_not_found() {
    let app = TestApp::spawn().await;
    let ghost = app
        .jwt
        .issue("ghost", "viewer", &ObjectId::new().to_hex())
        .unwrap();

    let (status, body) = app
        .call(Method::GET, "/api/profile", Some(&ghost), None)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn change_password_replaces_the_credential() {
    let app = TestApp::spawn().await;
    let token = app.viewer_token();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/change-password",
            Some(&token),
            Some(json!({ "oldPassword": VIEWER_PASSWORD, "newPassword": "brand-new-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password changed successfully");

    let (old_status, _) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "vera", "password": VIEWER_PASSWORD })),
        )
        .await;
    let (new_status, _) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "vera", "password": "brand-new-pass" })),
        )
        .await;

    assert_eq!(old_status, StatusCode::UNAUTHORIZED);
    assert_eq!(new_status, StatusCode::OK);
}

#[tokio::test]
async fn change_password_checks_the_current_one() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/change-password",
            Some(&app.viewer_token()),
            Some(json!({ "oldPassword": "wrong-guess", "newPassword": "brand-new-pass" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Current password is incorrect");
}

#[tokio::test]
async fn short_new_password_fails_validation() {
    let app = TestApp::spawn().await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/change-password",
            Some(&app.viewer_token()),
            Some(json!({ "oldPassword": VIEWER_PASSWORD, "newPassword": "short" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn google_identities_cannot_change_password() {
    let app = TestApp::spawn().await;
    let google_user = User::new_google(
        "grace".to_string(),
        "grace@example.com".to_string(),
        "google-123".to_string(),
        app.viewer_role.id,
    );
    app.store.insert_user(&google_user).await.unwrap();
    let token = app.token_for(&google_user, &app.viewer_role);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/change-password",
            Some(&token),
            Some(json!({ "oldPassword": "anything", "newPassword": "brand-new-pass" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Password change is not available for social login accounts"
    );
}

#[tokio::test]
async fn logout_acknowledges_valid_sessions_only() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .call(Method::POST, "/api/logout", Some(&app.viewer_token()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out successfully");

    let (status, _) = app.call(Method::POST, "/api/logout", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_creates_local_users() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/admin/users",
            Some(&app.admin_token()),
            Some(json!({
                "username": "newbie",
                "email": "newbie@example.com",
                "password": "newbie-pass-1",
                "roleId": app.viewer_role.id.to_hex(),
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "newbie");
    assert_eq!(body["createdBy"], app.admin.id.to_hex());
    assert!(body.get("password").is_none());

    let (status, login) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "newbie", "password": "newbie-pass-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["role"]["name"], "viewer");
}

#[tokio::test]
async fn admin_create_user_rejects_duplicates() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/admin/users",
            Some(&app.admin_token()),
            Some(json!({
                "username": "vera",
                "email": "someone-else@example.com",
                "password": "another-pass-1",
                "roleId": app.viewer_role.id.to_hex(),
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email or username already exists");
}

#[tokio::test]
async fn admin_create_user_checks_the_role() {
    let app = TestApp::spawn().await;
    let request = |role_id: String| {
        json!({
            "username": "newbie",
            "email": "newbie@example.com",
            "password": "newbie-pass-1",
            "roleId": role_id,
        })
    };

    let (status, body) = app
        .call(
            Method::POST,
            "/api/admin/users",
            Some(&app.admin_token()),
            Some(request(ObjectId::new().to_hex())),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Role not found");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/admin/users",
            Some(&app.admin_token()),
            Some(request("not-an-id".to_string())),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid Role ID format");
}

#[tokio::test]
async fn viewers_cannot_create_users() {
    let app = TestApp::spawn().await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/admin/users",
            Some(&app.viewer_token()),
            Some(json!({
                "username": "newbie",
                "email": "newbie@example.com",
                "password": "newbie-pass-1",
                "roleId": app.viewer_role.id.to_hex(),
            })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}
