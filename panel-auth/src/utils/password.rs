use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Newtype for password to prevent accidental logging
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Newtype for an Argon2 PHC string
#[derive(Debug, Clone)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Hash a password using Argon2id with a fresh random salt.
///
/// The salt and parameters are embedded in the returned PHC string.
pub fn hash_password(password: &Password) -> Result<PasswordHashString, anyhow::Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = argon2
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(PasswordHashString::new(password_hash))
}

/// Check a password against a stored hash.
///
/// The digest comparison is constant-time inside argon2. A hash that cannot be
/// parsed is a mismatch, not an error.
pub fn verify_password(password: &Password, password_hash: &PasswordHashString) -> bool {
    let parsed_hash = match PasswordHash::new(password_hash.as_str()) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is malformed");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let password = Password::new("secret123".to_string());
        let hash = hash_password(&password).expect("Failed to hash password");

        assert!(hash.as_str().starts_with("$argon2id$"));
    }

    #[test]
    fn test_verify_password_correct() {
        let password = Password::new("secret123".to_string());
        let hash = hash_password(&password).expect("Failed to hash password");

        assert!(verify_password(&password, &hash));
    }

    #[test]
    fn test_verify_password_incorrect() {
        let hash = hash_password(&Password::new("secret123".to_string()))
            .expect("Failed to hash password");

        assert!(!verify_password(&Password::new("wrong".to_string()), &hash));
    }

    #[test]
    fn test_different_hashes_for_same_password() {
        let password = Password::new("secret123".to_string());
        let hash1 = hash_password(&password).expect("Failed to hash password");
        let hash2 = hash_password(&password).expect("Failed to hash password");

        assert_ne!(hash1.as_str(), hash2.as_str());
        assert!(verify_password(&password, &hash1));
        assert!(verify_password(&password, &hash2));
    }

    #[test]
    fn test_malformed_hash_is_a_mismatch() {
        let password = Password::new("secret123".to_string());

        for garbage in ["", "not-a-hash", "$2a$10$bcryptlookingvalue", "$argon2id$v=19$broken"] {
            let hash = PasswordHashString::new(garbage.to_string());
            assert!(!verify_password(&password, &hash), "accepted {:?}", garbage);
        }
    }

    #[test]
    fn test_password_debug_is_redacted() {
        let password = Password::new("secret123".to_string());
        assert!(!format!("{:?}", password).contains("secret123"));
    }
}
