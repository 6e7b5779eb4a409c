//! LMDB implementation of MembershipStore.
//!
//! Records are bincode-encoded and keyed by their id bytes, so iteration
//! yields ascending id order.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn, RwTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use circles_store::{MembershipStore, MembershipTxn, StoreError};
use circles_types::{Group, GroupId, User, UserId};

use crate::LmdbError;

pub struct LmdbMembershipStore {
    pub(crate) env: Arc<Env>,
    pub(crate) users_db: Database<Bytes, Bytes>,
    pub(crate) groups_db: Database<Bytes, Bytes>,
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LmdbError> {
    Ok(bincode::deserialize(bytes)?)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LmdbError> {
    Ok(bincode::serialize(value)?)
}

fn read_one<T: DeserializeOwned>(
    db: Database<Bytes, Bytes>,
    txn: &RoTxn,
    key: &str,
) -> Result<Option<T>, LmdbError> {
    db.get(txn, key.as_bytes())?.map(decode).transpose()
}

fn read_all<T: DeserializeOwned>(
    db: Database<Bytes, Bytes>,
    txn: &RoTxn,
) -> Result<Vec<T>, LmdbError> {
    let mut out = Vec::new();
    for entry in db.iter(txn)? {
        let (_key, val) = entry?;
        out.push(decode(val)?);
    }
    Ok(out)
}

impl MembershipStore for LmdbMembershipStore {
    fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(read_one(self.users_db, &rtxn, id.as_str())?)
    }

    fn get_group(&self, id: &GroupId) -> Result<Option<Group>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(read_one(self.groups_db, &rtxn, id.as_str())?)
    }

    fn iter_users(&self) -> Result<Vec<User>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(read_all(self.users_db, &rtxn)?)
    }

    fn iter_groups(&self) -> Result<Vec<Group>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(read_all(self.groups_db, &rtxn)?)
    }

    fn user_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.users_db.len(&rtxn).map_err(LmdbError::from)?)
    }

    fn group_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.groups_db.len(&rtxn).map_err(LmdbError::from)?)
    }

    fn begin(&self) -> Result<Box<dyn MembershipTxn + '_>, StoreError> {
        let txn = self.env.write_txn().map_err(LmdbError::from)?;
        Ok(Box::new(LmdbTxn {
            txn,
            users_db: self.users_db,
            groups_db: self.groups_db,
        }))
    }
}

/// A membership write transaction backed by a single LMDB `RwTxn`.
///
/// LMDB admits one writer per environment; dropping without commit aborts.
struct LmdbTxn<'a> {
    txn: RwTxn<'a>,
    users_db: Database<Bytes, Bytes>,
    groups_db: Database<Bytes, Bytes>,
}

impl MembershipTxn for LmdbTxn<'_> {
    fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(read_one(self.users_db, &self.txn, id.as_str())?)
    }

    fn get_group(&self, id: &GroupId) -> Result<Option<Group>, StoreError> {
        Ok(read_one(self.groups_db, &self.txn, id.as_str())?)
    }

    fn iter_groups(&self) -> Result<Vec<Group>, StoreError> {
        Ok(read_all(self.groups_db, &self.txn)?)
    }

    fn put_user(&mut self, user: &User) -> Result<(), StoreError> {
        let bytes = encode(user)?;
        self.users_db
            .put(&mut self.txn, user.id.as_str().as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn put_group(&mut self, group: &Group) -> Result<(), StoreError> {
        let bytes = encode(group)?;
        self.groups_db
            .put(&mut self.txn, group.id.as_str().as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.txn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
