pub mod password;
pub mod validation;

pub use password::{hash_password, verify_password, Password, PasswordHashString};
pub use validation::ValidatedJson;

use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;

/// Parse a hex document id from a path or body; `what` names it in the error.
pub fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw)
        .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Invalid {} format", what)))
}
