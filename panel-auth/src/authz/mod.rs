//! Authorization core: authentication, role gate, permission gate.

mod error;
pub mod pipeline;
mod policy;

pub use error::AuthzError;
pub use pipeline::{authorize_request, Admitted};
pub use policy::AccessPolicy;
