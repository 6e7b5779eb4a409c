//! Directory search gateway.
//!
//! Read-only lookups used to populate candidate member lists:
//! - all users matching a query,
//! - users matching a query who are not yet members of a group,
//! - influencer and brand accounts matching a query.
//!
//! Matching is a case-insensitive substring test over display name and
//! handle. Results keep natural storage order; there is no ranking.
//! Every call takes a [`CancellationToken`] so an abandoned request stops
//! scanning early.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod error;
pub mod gateway;
pub mod query;

pub use error::DirectoryError;
pub use gateway::DirectoryGateway;
pub use query::SearchQuery;
