pub mod session;
pub mod social;

pub use session::{login, logout};
pub use social::{google_callback, google_login};
