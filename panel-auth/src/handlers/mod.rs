//! HTTP handlers for panel-auth.

pub mod auth;
pub mod role;
pub mod user;

pub use auth::*;
pub use role::*;
pub use user::*;
