//! Local social graph persisted in a single JSON document.

pub mod store;
pub mod types;

pub use store::{PostFilter, SocialStore};
pub use types::*;
