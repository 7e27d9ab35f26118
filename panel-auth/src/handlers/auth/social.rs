use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::Rng;
use service_core::{
    axum::{
        extract::{Query, State},
        response::{IntoResponse, Redirect, Response},
    },
    error::AppError,
};
use sha2::{Digest, Sha256};

use crate::{dtos::auth::GoogleCallbackQuery, AppState};

const STATE_COOKIE: &str = "oauth_state";
const VERIFIER_COOKIE: &str = "code_verifier";

fn not_configured() -> AppError {
    AppError::InternalError(anyhow::anyhow!("Google OAuth not configured on server"))
}

fn flow_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .max_age(time::Duration::minutes(5))
        .build()
}

fn pkce_pair() -> (String, String) {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    let verifier = URL_SAFE_NO_PAD.encode(bytes);

    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    let challenge = URL_SAFE_NO_PAD.encode(hasher.finalize());

    (verifier, challenge)
}

/// Redirect to Google's consent screen
pub async fn google_login(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Response), AppError> {
    let provider = state.google.as_ref().ok_or_else(not_configured)?;

    let state_val = uuid::Uuid::new_v4().to_string();
    let (code_verifier, code_challenge) = pkce_pair();
    let google_url = provider.authorization_url(&state_val, &code_challenge);

    let updated_jar = jar
        .add(flow_cookie(STATE_COOKIE, state_val))
        .add(flow_cookie(VERIFIER_COOKIE, code_verifier));

    Ok((updated_jar, Redirect::temporary(&google_url).into_response()))
}

/// Complete the Google flow and hand the session to the frontend
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<GoogleCallbackQuery>,
) -> Result<(CookieJar, Response), AppError> {
    let provider = state.google.as_ref().ok_or_else(not_configured)?;
    let google_config = state.config.google.as_ref().ok_or_else(not_configured)?;

    let stored_state = jar.get(STATE_COOKIE).map(|c| c.value());
    if stored_state != Some(query.state.as_str()) {
        return Err(AppError::BadRequest(anyhow::anyhow!("Invalid OAuth state")));
    }

    let code_verifier = jar
        .get(VERIFIER_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing code verifier")))?;

    let profile = provider.exchange_code(&query.code, &code_verifier).await?;

    let session = state
        .auth_service
        .google_sign_in(profile, &google_config.default_role)
        .await?;

    let user_json = serde_json::to_string(&session.user)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;
    let role_json = serde_json::to_string(&session.role)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;

    let redirect_url = format!(
        "{}/auth/callback?token={}&user={}&role={}",
        google_config.frontend_url.trim_end_matches('/'),
        urlencoding::encode(&session.token),
        urlencoding::encode(&user_json),
        urlencoding::encode(&role_json),
    );

    let updated_jar = jar
        .remove(Cookie::from(STATE_COOKIE))
        .remove(Cookie::from(VERIFIER_COOKIE));

    Ok((updated_jar, Redirect::temporary(&redirect_url).into_response()))
}
