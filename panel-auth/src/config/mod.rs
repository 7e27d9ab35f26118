use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

/// Signing secret used when `JWT_SECRET_KEY` is not set outside production.
pub const FALLBACK_JWT_SECRET: &str = "default-secret-for-dev-only";

/// Longest accepted session lifetime: one year.
pub const MAX_JWT_EXPIRY_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub mongodb: MongoConfig,
    pub jwt: JwtConfig,
    pub store: StoreConfig,
    pub google: Option<GoogleOAuthConfig>,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// `None` means the fallback secret is in effect.
    pub secret: Option<String>,
    pub expiry_hours: i64,
}

impl JwtConfig {
    pub fn signing_secret(&self) -> &str {
        self.secret.as_deref().unwrap_or(FALLBACK_JWT_SECRET)
    }

    pub fn uses_fallback_secret(&self) -> bool {
        self.secret.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub timeout_seconds: u64,
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub frontend_url: String,
    /// Role assigned to identities created through Google sign-in.
    pub default_role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = AuthConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("panel-auth"), false)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("panel_auth"), is_prod)?,
            },
            jwt: JwtConfig {
                secret: resolve_jwt_secret(&environment, env::var("JWT_SECRET_KEY").ok())?,
                expiry_hours: parse_number("JWT_EXPIRY_HOURS", &get_env("JWT_EXPIRY_HOURS", Some("24"), false)?)?,
            },
            store: StoreConfig {
                timeout_seconds: parse_number(
                    "STORE_TIMEOUT_SECONDS",
                    &get_env("STORE_TIMEOUT_SECONDS", Some("10"), false)?,
                )?,
            },
            google: google_config(
                env::var("GOOGLE_CLIENT_ID").ok(),
                env::var("GOOGLE_CLIENT_SECRET").ok(),
                env::var("APP_BASE_URL").ok(),
                get_env("FRONTEND_URL", Some("http://localhost:3000"), false)?,
                get_env("DEFAULT_SOCIAL_ROLE", Some("viewer"), false)?,
            ),
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.jwt.expiry_hours <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_EXPIRY_HOURS must be positive"
            )));
        }

        if self.jwt.expiry_hours > MAX_JWT_EXPIRY_HOURS {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_EXPIRY_HOURS must be at most {}",
                MAX_JWT_EXPIRY_HOURS
            )));
        }

        if self.store.timeout_seconds == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "STORE_TIMEOUT_SECONDS must be positive"
            )));
        }

        if self.environment == Environment::Prod {
            if self.jwt.uses_fallback_secret() {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "JWT_SECRET_KEY is required in production"
                )));
            }

            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }
        }

        Ok(())
    }
}

/// An empty or missing secret falls back to [`FALLBACK_JWT_SECRET`], which
/// production refuses.
fn resolve_jwt_secret(
    environment: &Environment,
    value: Option<String>,
) -> Result<Option<String>, AppError> {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(secret) => Ok(Some(secret)),
        None if *environment == Environment::Prod => Err(AppError::ConfigError(anyhow::anyhow!(
            "JWT_SECRET_KEY is required in production but not set"
        ))),
        None => Ok(None),
    }
}

fn google_config(
    client_id: Option<String>,
    client_secret: Option<String>,
    base_url: Option<String>,
    frontend_url: String,
    default_role: String,
) -> Option<GoogleOAuthConfig> {
    match (client_id, client_secret, base_url) {
        (Some(client_id), Some(client_secret), Some(base_url))
            if !client_id.is_empty() && !client_secret.is_empty() && !base_url.is_empty() =>
        {
            Some(GoogleOAuthConfig {
                client_id,
                client_secret,
                redirect_uri: format!(
                    "{}/api/auth/google/callback",
                    base_url.trim_end_matches('/')
                ),
                frontend_url,
                default_role,
            })
        }
        _ => None,
    }
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} is not a valid number: {}", key, e))
    })
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
