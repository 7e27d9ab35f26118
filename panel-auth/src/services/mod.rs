//! Services layer for panel-auth.
//!
//! Session token codec, storage seams and their MongoDB / in-memory
//! implementations, the Google identity provider and the login flows.

pub mod auth;
mod database;
pub mod google;
mod jwt;
mod memory;
mod store;

pub use auth::AuthService;
pub use database::MongoStore;
pub use google::{GoogleIdentityProvider, GoogleOAuthClient, GoogleProfile, MockGoogleProvider};
pub use jwt::{JwtService, SessionClaims, TokenError};
pub use memory::InMemoryStore;
pub use store::{bounded, RoleStore, StoreError, UserStore};
