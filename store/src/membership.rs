//! User and group storage traits.
//!
//! Membership fields live on two records (`User.followed_groups`,
//! `Group.members` / `Group.followed_by`). Any change that touches both must
//! go through a [`MembershipTxn`] so the pair is written atomically.

use circles_types::{Group, GroupId, User, UserId};

use crate::StoreError;

/// A read-write transaction over users and groups.
///
/// Reads observe the transaction's own staged writes. Dropping the
/// transaction without calling [`MembershipTxn::commit`] discards every
/// write made through it.
pub trait MembershipTxn {
    fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError>;
    fn get_group(&self, id: &GroupId) -> Result<Option<Group>, StoreError>;

    /// All groups, in natural storage order.
    fn iter_groups(&self) -> Result<Vec<Group>, StoreError>;

    fn put_user(&mut self, user: &User) -> Result<(), StoreError>;
    fn put_group(&mut self, group: &Group) -> Result<(), StoreError>;

    /// Make every staged write durable and visible to other readers.
    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Storage for user and group records.
///
/// Single-record reads outside a transaction are snapshot reads; callers
/// that read-modify-write must use [`MembershipStore::begin`].
pub trait MembershipStore: Send + Sync {
    fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError>;
    fn get_group(&self, id: &GroupId) -> Result<Option<Group>, StoreError>;

    /// All users, in natural storage order (ascending id).
    fn iter_users(&self) -> Result<Vec<User>, StoreError>;

    /// All groups, in natural storage order (ascending id).
    fn iter_groups(&self) -> Result<Vec<Group>, StoreError>;

    fn user_count(&self) -> Result<u64, StoreError> {
        self.iter_users().map(|v| v.len() as u64)
    }

    fn group_count(&self) -> Result<u64, StoreError> {
        self.iter_groups().map(|v| v.len() as u64)
    }

    /// Start a serialized read-write transaction.
    ///
    /// At most one write transaction is open at a time per store, so a
    /// read-modify-write inside it cannot lose updates.
    fn begin(&self) -> Result<Box<dyn MembershipTxn + '_>, StoreError>;

    /// Insert or replace records in a single transaction.
    fn import(&self, users: &[User], groups: &[Group]) -> Result<(), StoreError> {
        let mut txn = self.begin()?;
        for user in users {
            txn.put_user(user)?;
        }
        for group in groups {
            txn.put_group(group)?;
        }
        txn.commit()
    }
}
