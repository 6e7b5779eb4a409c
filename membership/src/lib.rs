//! Group membership and follow consistency.
//!
//! A user's relation to a group is recorded in three places:
//! `User.followed_groups`, `Group.followed_by` and `Group.members`. For every
//! (user, group) pair the three must agree. The [`Reconciler`] is the only
//! writer of those fields and applies every change to both records inside
//! one storage transaction.
//!
//! Design:
//! - Follow, unfollow and add-members are read-modify-write operations run in
//!   a single serialized write transaction, so concurrent calls cannot lose
//!   updates or leave a pair half-applied.
//! - Follow status can be read with a repair pass that backfills follows for
//!   groups the user is a member of ([`Reconciler::reconcile_follow_status`]).
//! - [`audit`] reports pairs whose fields disagree without changing anything.

pub mod audit;
pub mod error;
pub mod reconciler;
pub mod types;

pub use audit::{audit, Drift};
pub use error::MembershipError;
pub use reconciler::Reconciler;
pub use types::{FollowedGroup, Reconciliation};
