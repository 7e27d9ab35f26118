use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::config::JwtConfig;

/// Session token codec: HS256 with a shared secret.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

/// Claims carried by a session token. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub username: String,
    /// Role name, resolved against the role store by permission gates.
    pub role: String,
    /// Hex id of the identity.
    pub user_id: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    SignatureInvalid,
    #[error("token has expired")]
    Expired,
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        Self::from_secret(config.signing_secret(), config.expiry_hours)
    }

    pub fn from_secret(secret: &str, lifetime_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::hours(lifetime_hours),
        }
    }

    /// Sign a session token for an identity acting under `role`.
    pub fn issue(&self, username: &str, role: &str, user_id: &str) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let claims = SessionClaims {
            username: username.to_string(),
            role: role.to_string(),
            user_id: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode session token: {}", e))
    }

    /// Decode and check a session token.
    ///
    /// Checks run in a fixed order: structure, algorithm, expiry, signature.
    /// An expired token is reported as expired even when its signature is bad.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let mut segments = token.split('.');
        let (header, _payload, _signature) =
            match (segments.next(), segments.next(), segments.next(), segments.next()) {
                (Some(h), Some(p), Some(s), None) => (h, p, s),
                _ => return Err(TokenError::Malformed),
            };

        let header: RawHeader = URL_SAFE_NO_PAD
            .decode(header)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or(TokenError::Malformed)?;

        if header.alg != "HS256" {
            tracing::debug!(alg = %header.alg, "Rejected token algorithm");
            return Err(TokenError::SignatureInvalid);
        }

        let claims = decode::<SessionClaims>(token, &self.decoding_key, &unverified_validation())
            .map_err(|e| {
                tracing::debug!(error = %e, "Token payload did not decode");
                TokenError::Malformed
            })?
            .claims;

        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        decode::<SessionClaims>(token, &self.decoding_key, &signature_validation()).map_err(|e| {
            tracing::debug!(error = %e, "Token signature rejected");
            TokenError::SignatureInvalid
        })?;

        Ok(claims)
    }
}

fn base_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();
    validation
}

// Expiry is compared by hand so it can be reported before the signature.
fn unverified_validation() -> Validation {
    let mut validation = base_validation();
    validation.insecure_disable_signature_validation();
    validation
}

fn signature_validation() -> Validation {
    base_validation()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn service() -> JwtService {
        JwtService::from_secret(SECRET, 24)
    }

    fn claims_expiring_in(seconds: i64) -> SessionClaims {
        let now = Utc::now().timestamp();
        SessionClaims {
            username: "alice".into(),
            role: "admin".into(),
            user_id: "65f1c0ffee0000000000abcd".into(),
            iat: now - 60,
            exp: now + seconds,
        }
    }

    fn sign(claims: &SessionClaims, alg: Algorithm, secret: &str) -> String {
        encode(
            &Header::new(alg),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encode test token")
    }

    #[test]
    fn issue_then_validate_round_trips_claims() {
        let jwt = service();
        let token = jwt
            .issue("alice", "admin", "65f1c0ffee0000000000abcd")
            .expect("issue");

        let claims = jwt.validate(&token).expect("valid token");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.user_id, "65f1c0ffee0000000000abcd");
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn payload_has_exactly_the_session_fields() {
        let token = service().issue("alice", "admin", "id-1").expect("issue");
        let payload = token.split('.').nth(1).expect("payload segment");
        let json: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).expect("base64")).expect("json");

        let mut keys: Vec<_> = json.as_object().expect("object").keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["exp", "iat", "role", "user_id", "username"]);
    }

    #[test]
    fn lifetime_is_configurable() {
        let jwt = JwtService::from_secret(SECRET, 2);
        let claims = jwt
            .validate(&jwt.issue("a", "b", "c").expect("issue"))
            .expect("valid");
        assert_eq!(claims.exp - claims.iat, 2 * 60 * 60);
    }

    #[test]
    fn other_secret_is_signature_invalid() {
        let token = sign(&claims_expiring_in(3600), Algorithm::HS256, "someone-else");
        assert_eq!(service().validate(&token), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn expired_wins_over_bad_signature() {
        let own = sign(&claims_expiring_in(-10), Algorithm::HS256, SECRET);
        let foreign = sign(&claims_expiring_in(-10), Algorithm::HS256, "someone-else");

        assert_eq!(service().validate(&own), Err(TokenError::Expired));
        assert_eq!(service().validate(&foreign), Err(TokenError::Expired));
    }

    #[test]
    fn exp_equal_to_now_is_expired() {
        let token = sign(&claims_expiring_in(0), Algorithm::HS256, SECRET);
        assert_eq!(service().validate(&token), Err(TokenError::Expired));
    }

    #[test]
    fn non_hs256_algorithms_are_rejected() {
        let hs512 = sign(&claims_expiring_in(3600), Algorithm::HS512, SECRET);
        assert_eq!(service().validate(&hs512), Err(TokenError::SignatureInvalid));

        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD
            .encode(serde_json::to_vec(&claims_expiring_in(3600)).expect("payload"));
        let unsigned = format!("{}.{}.", header, payload);
        assert_eq!(service().validate(&unsigned), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn structural_garbage_is_malformed() {
        let jwt = service();
        assert_eq!(jwt.validate(""), Err(TokenError::Malformed));
        assert_eq!(jwt.validate("abc"), Err(TokenError::Malformed));
        assert_eq!(jwt.validate("a.b.c.d"), Err(TokenError::Malformed));
        assert_eq!(jwt.validate("!!!.e30.sig"), Err(TokenError::Malformed));

        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let garbage = format!("{}.not-json.sig", header);
        assert_eq!(jwt.validate(&garbage), Err(TokenError::Malformed));
    }

    #[test]
    fn missing_claims_are_malformed() {
        #[derive(Serialize)]
        struct Partial {
            username: String,
            exp: i64,
        }
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Partial {
                username: "alice".into(),
                exp: Utc::now().timestamp() + 3600,
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("encode");
        assert_eq!(service().validate(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn tampered_payload_is_signature_invalid() {
        let jwt = service();
        let token = jwt.issue("viewer-user", "viewer", "id-1").expect("issue");
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();

        let mut claims = jwt.validate(&token).expect("valid");
        claims.role = "admin".into();
        parts[1] = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).expect("payload"));

        assert_eq!(jwt.validate(&parts.join(".")), Err(TokenError::SignatureInvalid));
    }
}
