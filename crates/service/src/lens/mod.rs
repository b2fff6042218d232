//! Lens Protocol GraphQL client.
//!
//! `client` owns endpoint failover and the query-variant fallback chains,
//! `queries` and `mutations` hold the hardcoded GraphQL payloads, and
//! `transport` is the seam tests replace with a scripted fake.

pub mod client;
pub mod errors;
pub mod metadata;
pub mod mutations;
pub mod queries;
pub mod transport;
pub mod types;

pub use client::{LensClient, MutationResult};
pub use errors::{LensError, TransportError};
pub use transport::{GraphqlRequest, GraphqlTransport, ReqwestTransport};
pub use types::{LensAccount, LensAuthor, LensPage, LensPost};
