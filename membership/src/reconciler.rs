//! The membership reconciler.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use circles_store::{MembershipStore, MembershipTxn};
use circles_types::{Group, GroupId, User, UserId};

use crate::error::MembershipError;
use crate::types::{FollowedGroup, Reconciliation};

/// Applies follow, unfollow and membership changes to users and groups.
///
/// Every mutating call opens exactly one write transaction, reads both
/// records inside it and commits both together.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn MembershipStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self { store }
    }

    /// Flip the follow relation between `user_id` and `group_id`.
    ///
    /// If the user currently follows the group they are removed from all
    /// three fields, otherwise they are added to all three. Returns the new
    /// state (`true` = following).
    pub fn toggle_follow(
        &self,
        user_id: &UserId,
        group_id: &GroupId,
    ) -> Result<bool, MembershipError> {
        check_ids(user_id, group_id)?;
        let mut txn = self.store.begin()?;
        let (mut user, mut group) = load_pair(txn.as_ref(), user_id, group_id)?;

        let following = if user.follows(group_id) {
            unlink(&mut user, &mut group);
            false
        } else {
            link(&mut user, &mut group);
            true
        };

        txn.put_user(&user)?;
        txn.put_group(&group)?;
        txn.commit()?;

        debug!(user = %user_id, group = %group_id, following, "toggled follow");
        Ok(following)
    }

    /// Remove the follow relation if present.
    ///
    /// Idempotent: returns `Ok(false)` without writing when nothing changed.
    pub fn unfollow(&self, user_id: &UserId, group_id: &GroupId) -> Result<bool, MembershipError> {
        check_ids(user_id, group_id)?;
        let mut txn = self.store.begin()?;
        let (mut user, mut group) = load_pair(txn.as_ref(), user_id, group_id)?;

        if !unlink(&mut user, &mut group) {
            debug!(user = %user_id, group = %group_id, "unfollow: relation absent");
            return Ok(false);
        }

        txn.put_user(&user)?;
        txn.put_group(&group)?;
        txn.commit()?;

        debug!(user = %user_id, group = %group_id, "unfollowed");
        Ok(true)
    }

    /// Return the user's followed groups, first backfilling the follow
    /// relation for every group that lists the user as a member.
    ///
    /// Runs in one write transaction so it is serialized with concurrent
    /// toggles and unfollows. Calling it twice in a row yields the same
    /// `followed` list and an empty `repaired` list the second time.
    pub fn reconcile_follow_status(
        &self,
        user_id: &UserId,
    ) -> Result<Reconciliation, MembershipError> {
        check_user_id(user_id)?;
        let mut txn = self.store.begin()?;
        let mut user = txn
            .get_user(user_id)?
            .ok_or_else(|| MembershipError::UserNotFound(user_id.clone()))?;

        let mut outcome = Reconciliation::default();
        for mut group in txn.iter_groups()? {
            if group.has_member(user_id) {
                let followed = user.followed_groups.insert(group.id.clone());
                let recorded = group.followed_by.insert(user_id.clone());
                if followed || recorded {
                    txn.put_group(&group)?;
                    outcome.repaired.push(group.id.clone());
                }
            }
            if user.follows(&group.id) {
                outcome.followed.push(FollowedGroup::from(&group));
            }
        }

        if outcome.repaired.is_empty() {
            return Ok(outcome);
        }

        txn.put_user(&user)?;
        txn.commit()?;
        info!(
            user = %user_id,
            repaired = outcome.repaired.len(),
            "backfilled follow relations from membership"
        );
        Ok(outcome)
    }

    /// Return the user's followed groups without repairing anything.
    pub fn followed_groups(&self, user_id: &UserId) -> Result<Vec<FollowedGroup>, MembershipError> {
        check_user_id(user_id)?;
        let user = self
            .store
            .get_user(user_id)?
            .ok_or_else(|| MembershipError::UserNotFound(user_id.clone()))?;

        Ok(self
            .store
            .iter_groups()?
            .iter()
            .filter(|group| user.follows(&group.id))
            .map(FollowedGroup::from)
            .collect())
    }

    /// Add several users to a group with the full follow relation.
    ///
    /// All-or-nothing: if the group or any listed user is missing nothing is
    /// written. Returns the users that were not already fully linked.
    pub fn add_members(
        &self,
        group_id: &GroupId,
        member_ids: &[UserId],
    ) -> Result<Vec<UserId>, MembershipError> {
        check_group_id(group_id)?;
        if member_ids.is_empty() {
            return Err(MembershipError::InvalidArgument(
                "at least one member id is required".into(),
            ));
        }
        for id in member_ids {
            check_user_id(id)?;
        }

        let mut txn = self.store.begin()?;
        let mut group = txn
            .get_group(group_id)?
            .ok_or_else(|| MembershipError::GroupNotFound(group_id.clone()))?;

        let unique: BTreeSet<&UserId> = member_ids.iter().collect();
        let mut added = Vec::new();
        for id in unique {
            let mut user = txn
                .get_user(id)?
                .ok_or_else(|| MembershipError::UserNotFound(id.clone()))?;
            if link(&mut user, &mut group) {
                txn.put_user(&user)?;
                added.push(id.clone());
            }
        }

        if added.is_empty() {
            return Ok(added);
        }

        txn.put_group(&group)?;
        txn.commit()?;
        info!(group = %group_id, added = added.len(), "added group members");
        Ok(added)
    }

    /// Read a single group.
    pub fn group(&self, group_id: &GroupId) -> Result<Group, MembershipError> {
        check_group_id(group_id)?;
        self.store
            .get_group(group_id)?
            .ok_or_else(|| MembershipError::GroupNotFound(group_id.clone()))
    }
}

fn check_user_id(id: &UserId) -> Result<(), MembershipError> {
    if id.is_valid() {
        Ok(())
    } else {
        Err(MembershipError::InvalidArgument("user id is required".into()))
    }
}

fn check_group_id(id: &GroupId) -> Result<(), MembershipError> {
    if id.is_valid() {
        Ok(())
    } else {
        Err(MembershipError::InvalidArgument("group id is required".into()))
    }
}

fn check_ids(user_id: &UserId, group_id: &GroupId) -> Result<(), MembershipError> {
    check_user_id(user_id)?;
    check_group_id(group_id)
}

fn load_pair(
    txn: &dyn MembershipTxn,
    user_id: &UserId,
    group_id: &GroupId,
) -> Result<(User, Group), MembershipError> {
    let user = txn
        .get_user(user_id)?
        .ok_or_else(|| MembershipError::UserNotFound(user_id.clone()))?;
    let group = txn
        .get_group(group_id)?
        .ok_or_else(|| MembershipError::GroupNotFound(group_id.clone()))?;
    Ok((user, group))
}

/// Record the relation in all three fields. Returns `true` if anything changed.
fn link(user: &mut User, group: &mut Group) -> bool {
    let followed = user.followed_groups.insert(group.id.clone());
    let enrolled = group.enroll(&user.id);
    followed || enrolled
}

/// Clear the relation from all three fields. Returns `true` if anything changed.
fn unlink(user: &mut User, group: &mut Group) -> bool {
    let unfollowed = user.followed_groups.remove(&group.id);
    let withdrawn = group.withdraw(&user.id);
    unfollowed || withdrawn
}

#[cfg(test)]
mod tests {
    use super::*;
    use circles_nullables::NullStore;
    use circles_types::AccountType;

    fn user(id: &str) -> User {
        User::new(UserId::new(id), id, id, AccountType::Member)
    }

    fn setup(users: &[&str], groups: &[&str]) -> (Arc<NullStore>, Reconciler) {
        let store = Arc::new(NullStore::with_records(
            users.iter().map(|id| user(id)).collect(),
            groups
                .iter()
                .map(|id| Group::new(GroupId::new(*id), format!("{id} title")))
                .collect(),
        ));
        let reconciler = Reconciler::new(store.clone());
        (store, reconciler)
    }

    fn assert_consistent(store: &NullStore, user_id: &UserId, group_id: &GroupId) {
        let user = store.get_user(user_id).unwrap().unwrap();
        let group = store.get_group(group_id).unwrap().unwrap();
        let a = user.follows(group_id);
        let b = group.is_followed_by(user_id);
        let c = group.has_member(user_id);
        assert!(a == b && b == c, "fields disagree: {a} {b} {c}");
    }

    #[test]
    fn toggle_follows_then_unfollows() {
        let (store, rec) = setup(&["u-1"], &["g-1"]);
        let (u, g) = (UserId::new("u-1"), GroupId::new("g-1"));

        assert!(rec.toggle_follow(&u, &g).unwrap());
        assert_consistent(&store, &u, &g);
        assert!(store.get_group(&g).unwrap().unwrap().has_member(&u));

        assert!(!rec.toggle_follow(&u, &g).unwrap());
        assert_consistent(&store, &u, &g);
        assert!(!store.get_user(&u).unwrap().unwrap().follows(&g));
    }

    #[test]
    fn toggle_missing_user_or_group_is_not_found() {
        let (_store, rec) = setup(&["u-1"], &["g-1"]);
        assert!(matches!(
            rec.toggle_follow(&UserId::new("nobody"), &GroupId::new("g-1")),
            Err(MembershipError::UserNotFound(_))
        ));
        assert!(matches!(
            rec.toggle_follow(&UserId::new("u-1"), &GroupId::new("nothing")),
            Err(MembershipError::GroupNotFound(_))
        ));
    }

    #[test]
    fn toggle_repairs_half_linked_pair() {
        let (store, rec) = setup(&["u-1"], &[]);
        let mut group = Group::new(GroupId::new("g-1"), "Drifted");
        group.members.insert(UserId::new("u-1"));
        store.import(&[], &[group]).unwrap();

        let (u, g) = (UserId::new("u-1"), GroupId::new("g-1"));
        assert!(rec.toggle_follow(&u, &g).unwrap());
        assert_consistent(&store, &u, &g);
    }

    #[test]
    fn blank_ids_are_invalid() {
        let (_store, rec) = setup(&["u-1"], &["g-1"]);
        assert!(matches!(
            rec.toggle_follow(&UserId::new("u-1"), &GroupId::new("  ")),
            Err(MembershipError::InvalidArgument(_))
        ));
    }

    #[test]
    fn unfollow_absent_relation_is_noop() {
        let (store, rec) = setup(&["u-1"], &["g-1"]);
        let (u, g) = (UserId::new("u-1"), GroupId::new("g-1"));
        assert!(!rec.unfollow(&u, &g).unwrap());
        assert_consistent(&store, &u, &g);
    }

    #[test]
    fn unfollow_clears_all_three_fields() {
        let (store, rec) = setup(&["u-1"], &["g-1"]);
        let (u, g) = (UserId::new("u-1"), GroupId::new("g-1"));
        rec.toggle_follow(&u, &g).unwrap();
        assert!(rec.unfollow(&u, &g).unwrap());
        let group = store.get_group(&g).unwrap().unwrap();
        assert!(group.members.is_empty());
        assert!(group.followed_by.is_empty());
        assert!(store.get_user(&u).unwrap().unwrap().followed_groups.is_empty());
    }

    #[test]
    fn unfollow_still_checks_existence() {
        let (_store, rec) = setup(&["u-1"], &[]);
        assert!(matches!(
            rec.unfollow(&UserId::new("u-1"), &GroupId::new("g-9")),
            Err(MembershipError::GroupNotFound(_))
        ));
    }

    #[test]
    fn reconcile_backfills_membership_and_is_idempotent() {
        let (store, rec) = setup(&["u-1"], &["g-1"]);
        let mut member_only = Group::new(GroupId::new("g-2"), "Members only");
        member_only.members.insert(UserId::new("u-1"));
        store.import(&[], &[member_only]).unwrap();

        let u = UserId::new("u-1");
        rec.toggle_follow(&u, &GroupId::new("g-1")).unwrap();

        let first = rec.reconcile_follow_status(&u).unwrap();
        assert_eq!(first.repaired, vec![GroupId::new("g-2")]);
        let ids: Vec<_> = first.followed.iter().map(|f| f.id.to_string()).collect();
        assert_eq!(ids, vec!["g-1", "g-2"]);
        assert_consistent(&store, &u, &GroupId::new("g-2"));

        let second = rec.reconcile_follow_status(&u).unwrap();
        assert!(second.repaired.is_empty());
        assert_eq!(second.followed, first.followed);
    }

    #[test]
    fn reconcile_skips_dangling_follows() {
        let (store, rec) = setup(&[], &[]);
        let mut ghost = user("u-1");
        ghost.followed_groups.insert(GroupId::new("deleted"));
        store.import(&[ghost], &[]).unwrap();

        let outcome = rec.reconcile_follow_status(&UserId::new("u-1")).unwrap();
        assert!(outcome.followed.is_empty());
        assert!(outcome.repaired.is_empty());
    }

    #[test]
    fn reconcile_unknown_user_is_not_found() {
        let (_store, rec) = setup(&[], &["g-1"]);
        assert!(matches!(
            rec.reconcile_follow_status(&UserId::new("u-1")),
            Err(MembershipError::UserNotFound(_))
        ));
    }

    #[test]
    fn followed_groups_does_not_repair() {
        let (store, rec) = setup(&["u-1"], &[]);
        let mut member_only = Group::new(GroupId::new("g-2"), "Members only");
        member_only.members.insert(UserId::new("u-1"));
        store.import(&[], &[member_only]).unwrap();

        assert!(rec.followed_groups(&UserId::new("u-1")).unwrap().is_empty());
        let user = store.get_user(&UserId::new("u-1")).unwrap().unwrap();
        assert!(user.followed_groups.is_empty());
    }

    #[test]
    fn add_members_links_every_user() {
        let (store, rec) = setup(&["u-1", "u-2", "u-3"], &["g-1"]);
        let g = GroupId::new("g-1");
        rec.toggle_follow(&UserId::new("u-1"), &g).unwrap();

        let added = rec
            .add_members(
                &g,
                &[UserId::new("u-1"), UserId::new("u-2"), UserId::new("u-3"), UserId::new("u-2")],
            )
            .unwrap();
        assert_eq!(added, vec![UserId::new("u-2"), UserId::new("u-3")]);
        for id in ["u-1", "u-2", "u-3"] {
            assert_consistent(&store, &UserId::new(id), &g);
        }
    }

    #[test]
    fn add_members_is_all_or_nothing() {
        let (store, rec) = setup(&["u-1"], &["g-1"]);
        let g = GroupId::new("g-1");
        let err = rec
            .add_members(&g, &[UserId::new("u-1"), UserId::new("ghost")])
            .unwrap_err();
        assert!(matches!(err, MembershipError::UserNotFound(_)));
        assert!(store.get_group(&g).unwrap().unwrap().members.is_empty());
        assert!(!store.get_user(&UserId::new("u-1")).unwrap().unwrap().follows(&g));
    }

    #[test]
    fn add_members_requires_ids() {
        let (_store, rec) = setup(&[], &["g-1"]);
        assert!(matches!(
            rec.add_members(&GroupId::new("g-1"), &[]),
            Err(MembershipError::InvalidArgument(_))
        ));
    }

    #[test]
    fn concurrent_toggles_keep_pair_consistent() {
        let (store, rec) = setup(&["u-1"], &["g-1"]);
        let (u, g) = (UserId::new("u-1"), GroupId::new("g-1"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let rec = rec.clone();
                let (u, g) = (u.clone(), g.clone());
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        rec.toggle_follow(&u, &g).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 200 toggles in total: back to the starting state.
        assert_consistent(&store, &u, &g);
        assert!(!store.get_user(&u).unwrap().unwrap().follows(&g));
    }
}
