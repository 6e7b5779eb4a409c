//! Nullable store: thread-safe in-memory storage for testing.

use circles_store::{MembershipStore, MembershipTxn, StoreError};
use circles_types::{Group, GroupId, User, UserId};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    groups: BTreeMap<GroupId, Group>,
}

/// An in-memory user + group store for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
///
/// A transaction holds the table lock for its whole lifetime, so write
/// transactions are serialized exactly like an LMDB environment.
pub struct NullStore {
    tables: Mutex<Tables>,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }

    /// Build a store pre-populated with the given records.
    pub fn with_records(users: Vec<User>, groups: Vec<Group>) -> Self {
        let store = Self::new();
        {
            let mut tables = store.tables.lock().unwrap_or_else(|e| e.into_inner());
            for user in users {
                tables.users.insert(user.id.clone(), user);
            }
            for group in groups {
                tables.groups.insert(group.id.clone(), group);
            }
        }
        store
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("null store mutex poisoned".into()))
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MembershipStore for NullStore {
    fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.get(id).cloned())
    }

    fn get_group(&self, id: &GroupId) -> Result<Option<Group>, StoreError> {
        Ok(self.lock()?.groups.get(id).cloned())
    }

    fn iter_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.lock()?.users.values().cloned().collect())
    }

    fn iter_groups(&self) -> Result<Vec<Group>, StoreError> {
        Ok(self.lock()?.groups.values().cloned().collect())
    }

    fn user_count(&self) -> Result<u64, StoreError> {
        Ok(self.lock()?.users.len() as u64)
    }

    fn group_count(&self) -> Result<u64, StoreError> {
        Ok(self.lock()?.groups.len() as u64)
    }

    fn begin(&self) -> Result<Box<dyn MembershipTxn + '_>, StoreError> {
        Ok(Box::new(NullTxn {
            tables: self.lock()?,
            staged_users: BTreeMap::new(),
            staged_groups: BTreeMap::new(),
        }))
    }
}

/// Write transaction over a [`NullStore`].
///
/// Writes are staged and only applied to the tables on commit.
struct NullTxn<'a> {
    tables: MutexGuard<'a, Tables>,
    staged_users: BTreeMap<UserId, User>,
    staged_groups: BTreeMap<GroupId, Group>,
}

impl MembershipTxn for NullTxn<'_> {
    fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self
            .staged_users
            .get(id)
            .or_else(|| self.tables.users.get(id))
            .cloned())
    }

    fn get_group(&self, id: &GroupId) -> Result<Option<Group>, StoreError> {
        Ok(self
            .staged_groups
            .get(id)
            .or_else(|| self.tables.groups.get(id))
            .cloned())
    }

    fn iter_groups(&self) -> Result<Vec<Group>, StoreError> {
        let mut merged = self.tables.groups.clone();
        merged.extend(
            self.staged_groups
                .iter()
                .map(|(id, group)| (id.clone(), group.clone())),
        );
        Ok(merged.into_values().collect())
    }

    fn put_user(&mut self, user: &User) -> Result<(), StoreError> {
        self.staged_users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    fn put_group(&mut self, group: &Group) -> Result<(), StoreError> {
        self.staged_groups.insert(group.id.clone(), group.clone());
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let NullTxn {
            mut tables,
            staged_users,
            staged_groups,
        } = *self;
        tables.users.extend(staged_users);
        tables.groups.extend(staged_groups);
        Ok(())
    }
}
