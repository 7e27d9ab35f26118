use async_trait::async_trait;
use serde::Deserialize;
use service_core::error::AppError;
use std::sync::Mutex;

use crate::config::GoogleOAuthConfig;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const SCOPES: &str = "openid email profile";

/// Profile returned by Google's userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub verified_email: bool,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

/// The OAuth authorization-code flow against Google, with PKCE.
#[async_trait]
pub trait GoogleIdentityProvider: Send + Sync {
    /// Consent screen URL for this `state` and S256 `code_challenge`.
    fn authorization_url(&self, state: &str, code_challenge: &str) -> String;

    /// Trade an authorization code for the user's profile.
    async fn exchange_code(&self, code: &str, code_verifier: &str)
        -> Result<GoogleProfile, AppError>;
}

pub struct GoogleOAuthClient {
    config: GoogleOAuthConfig,
    http: reqwest::Client,
}

impl GoogleOAuthClient {
    pub fn new(config: GoogleOAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl GoogleIdentityProvider for GoogleOAuthClient {
    fn authorization_url(&self, state: &str, code_challenge: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&code_challenge={}&code_challenge_method=S256",
            AUTHORIZE_URL,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state),
            urlencoding::encode(code_challenge),
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<GoogleProfile, AppError> {
        let token_res = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("code_verifier", code_verifier),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to exchange Google code");
                AppError::BadGateway("Failed to exchange token with Google".to_string())
            })?;

        if !token_res.status().is_success() {
            let status = token_res.status();
            let err_body = token_res.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %err_body, "Google token exchange error");
            return Err(AppError::AuthError(anyhow::anyhow!("Authentication failed")));
        }

        let token_data: GoogleTokenResponse = token_res.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse Google token response");
            AppError::BadGateway("Unexpected token response from Google".to_string())
        })?;

        let user_info_res = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(token_data.access_token)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to fetch Google user info");
                AppError::BadGateway("Failed to get user info from Google".to_string())
            })?;

        user_info_res.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse Google user info");
            AppError::BadGateway("Unexpected user info from Google".to_string())
        })
    }
}

/// Provider that skips the network and answers with a fixed profile.
pub struct MockGoogleProvider {
    pub profile: Mutex<Option<GoogleProfile>>,
}

impl MockGoogleProvider {
    pub fn new(profile: Option<GoogleProfile>) -> Self {
        Self {
            profile: Mutex::new(profile),
        }
    }
}

#[async_trait]
impl GoogleIdentityProvider for MockGoogleProvider {
    fn authorization_url(&self, state: &str, code_challenge: &str) -> String {
        format!(
            "{}?state={}&code_challenge={}",
            AUTHORIZE_URL, state, code_challenge
        )
    }

    async fn exchange_code(
        &self,
        _code: &str,
        _code_verifier: &str,
    ) -> Result<GoogleProfile, AppError> {
        self.profile
            .lock()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Mock provider mutex poisoned: {}", e)))?
            .clone()
            .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Authentication failed")))
    }
}
