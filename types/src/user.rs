//! User document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{AccountType, GroupId, UserId};

/// A user account as stored and as returned by the directory search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub full_name: String,
    /// Handle.
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_type: AccountType,
    /// Groups this user follows.
    #[serde(default)]
    pub followed_groups: BTreeSet<GroupId>,
}

impl User {
    pub fn new(
        id: UserId,
        full_name: impl Into<String>,
        user_name: impl Into<String>,
        user_type: AccountType,
    ) -> Self {
        Self {
            id,
            full_name: full_name.into(),
            user_name: user_name.into(),
            user_type,
            followed_groups: BTreeSet::new(),
        }
    }

    pub fn follows(&self, group: &GroupId) -> bool {
        self.followed_groups.contains(group)
    }

    /// Case-insensitive substring match over display name and handle.
    ///
    /// `needle` must already be lowercased.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        self.full_name.to_lowercase().contains(needle)
            || self.user_name.to_lowercase().contains(needle)
    }
}
