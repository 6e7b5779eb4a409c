//! Read-only consistency audit over every user and group.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use circles_store::MembershipStore;
use circles_types::{GroupId, UserId};

use crate::error::MembershipError;

/// A (user, group) pair whose three membership fields disagree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Drift {
    pub user: UserId,
    pub group: GroupId,
    /// `group ∈ user.followed_groups`
    pub in_followed_groups: bool,
    /// `user ∈ group.followed_by`
    pub in_followed_by: bool,
    /// `user ∈ group.members`
    pub in_members: bool,
}

#[derive(Default)]
struct Flags {
    followed_groups: bool,
    followed_by: bool,
    members: bool,
}

/// Report every pair mentioned by any of the three fields where they do not
/// all agree. References to users or groups that no longer exist count as
/// drift too.
///
/// Users and groups are read in two snapshots; run it while writes are
/// quiet for an exact picture.
pub fn audit(store: &dyn MembershipStore) -> Result<Vec<Drift>, MembershipError> {
    let mut pairs: BTreeMap<(UserId, GroupId), Flags> = BTreeMap::new();

    for user in store.iter_users()? {
        for group in &user.followed_groups {
            pairs
                .entry((user.id.clone(), group.clone()))
                .or_default()
                .followed_groups = true;
        }
    }

    for group in store.iter_groups()? {
        let mentioned: BTreeSet<&UserId> =
            group.members.iter().chain(group.followed_by.iter()).collect();
        for user in mentioned {
            let flags = pairs.entry((user.clone(), group.id.clone())).or_default();
            flags.followed_by = group.is_followed_by(user);
            flags.members = group.has_member(user);
        }
    }

    let drift: Vec<Drift> = pairs
        .into_iter()
        .filter(|(_, f)| !(f.followed_groups == f.followed_by && f.followed_by == f.members))
        .map(|((user, group), f)| Drift {
            user,
            group,
            in_followed_groups: f.followed_groups,
            in_followed_by: f.followed_by,
            in_members: f.members,
        })
        .collect();

    if !drift.is_empty() {
        tracing::warn!(pairs = drift.len(), "membership drift detected");
    }
    Ok(drift)
}
