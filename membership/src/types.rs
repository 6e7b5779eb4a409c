//! Membership result types.

use serde::{Deserialize, Serialize};

use circles_types::{Group, GroupId};

/// A group the user follows, as reported by follow status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowedGroup {
    pub id: GroupId,
    pub title: String,
}

impl From<&Group> for FollowedGroup {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id.clone(),
            title: group.title.clone(),
        }
    }
}

/// Outcome of a follow-status read with repair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Every existing group the user follows after the repair, in storage order.
    pub followed: Vec<FollowedGroup>,
    /// Groups whose follow relation had to be backfilled.
    pub repaired: Vec<GroupId>,
}
