//! Wallet session handling.
//!
//! Wallet proof checks happen in the external login provider; this module
//! only issues and verifies the signed session carrying the actor address.

pub mod errors;
pub mod session;

pub use errors::AuthError;
pub use session::{SessionClaims, SessionSigner, SESSION_COOKIE};
