//! Service layer for the ChainSocial backend.
//! - Local social data lives in one JSON document behind `social::SocialStore`.
//! - `lens` talks to the Lens GraphQL API; `mirror` and `feed` combine the two.
//! - Content rules, rate limiting and sessions are plain building blocks the
//!   HTTP layer composes per route.

pub mod auth;
pub mod content;
pub mod errors;
pub mod feed;
pub mod lens;
pub mod media;
pub mod mirror;
pub mod observability;
pub mod pagination;
pub mod rate_limiter;
pub mod social;
pub mod storage;
#[cfg(any(test, feature = "test-util"))]
pub mod test_support;

pub use errors::ServiceError;
