//! Group document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{GroupId, UserId};

/// A messaging group with its membership and follower sets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(rename = "_id")]
    pub id: GroupId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub members: BTreeSet<UserId>,
    #[serde(default)]
    pub followed_by: BTreeSet<UserId>,
}

impl Group {
    pub fn new(id: GroupId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            members: BTreeSet::new(),
            followed_by: BTreeSet::new(),
        }
    }

    pub fn has_member(&self, user: &UserId) -> bool {
        self.members.contains(user)
    }

    pub fn is_followed_by(&self, user: &UserId) -> bool {
        self.followed_by.contains(user)
    }

    /// Record `user` as both member and follower.
    ///
    /// Returns `true` if either set changed.
    pub fn enroll(&mut self, user: &UserId) -> bool {
        let joined = self.members.insert(user.clone());
        let followed = self.followed_by.insert(user.clone());
        joined || followed
    }

    /// Remove `user` from both the member and follower sets.
    ///
    /// Returns `true` if either set changed.
    pub fn withdraw(&mut self, user: &UserId) -> bool {
        let left = self.members.remove(user);
        let unfollowed = self.followed_by.remove(user);
        left || unfollowed
    }
}
