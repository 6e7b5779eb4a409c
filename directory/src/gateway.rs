//! The directory search gateway.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use circles_store::MembershipStore;
use circles_types::{GroupId, User, UserId};

use crate::query::SearchQuery;
use crate::DirectoryError;

/// How many users are matched between two cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 64;

/// Read-only user lookups over a [`MembershipStore`].
#[derive(Clone)]
pub struct DirectoryGateway {
    store: Arc<dyn MembershipStore>,
}

impl DirectoryGateway {
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self { store }
    }

    /// Users whose display name or handle contains `query`, ignoring case.
    ///
    /// An empty match set is `Ok(vec![])`.
    pub fn search_users(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<User>, DirectoryError> {
        let query = SearchQuery::parse(query)?;
        self.scan(&query, cancel, |_| true)
    }

    /// Like [`search_users`](Self::search_users), minus the current members
    /// of `group_id` and, when given, the caller themself.
    pub fn search_users_excluding_group_members(
        &self,
        query: &str,
        group_id: &GroupId,
        exclude_self: Option<&UserId>,
        cancel: &CancellationToken,
    ) -> Result<Vec<User>, DirectoryError> {
        let query = SearchQuery::parse(query)?;
        if !group_id.is_valid() {
            return Err(DirectoryError::InvalidArgument(
                "Group ID is required".into(),
            ));
        }
        let group = self
            .store
            .get_group(group_id)?
            .ok_or_else(|| DirectoryError::GroupNotFound(group_id.clone()))?;

        self.scan(&query, cancel, |user| {
            !group.has_member(&user.id) && Some(&user.id) != exclude_self
        })
    }

    /// Influencer and brand accounts matching `query`.
    pub fn search_influencers_and_brands(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<User>, DirectoryError> {
        let query = SearchQuery::parse(query)?;
        self.scan(&query, cancel, |user| user.user_type.is_promoted())
    }

    fn scan(
        &self,
        query: &SearchQuery,
        cancel: &CancellationToken,
        keep: impl Fn(&User) -> bool,
    ) -> Result<Vec<User>, DirectoryError> {
        if cancel.is_cancelled() {
            return Err(DirectoryError::Cancelled);
        }

        let users = self.store.iter_users()?;
        let scanned = users.len();
        let mut hits = Vec::new();
        for (i, user) in users.into_iter().enumerate() {
            if i % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                debug!(query = query.as_str(), scanned = i, "search cancelled mid-scan");
                return Err(DirectoryError::Cancelled);
            }
            if user.matches_lowercase(query.as_str()) && keep(&user) {
                hits.push(user);
            }
        }

        debug!(query = query.as_str(), scanned, hits = hits.len(), "directory search");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use circles_nullables::NullStore;
    use circles_types::{AccountType, Group};

    fn user(id: &str, full: &str, handle: &str, kind: AccountType) -> User {
        User::new(UserId::new(id), full, handle, kind)
    }

    fn gateway() -> DirectoryGateway {
        let users = vec![
            user("u-1", "Alice Liddell", "alice", AccountType::Influencer),
            user("u-2", "Bob Stone", "bobby", AccountType::Member),
            user("u-3", "ACME Corp", "acme_alice", AccountType::Brand),
            user("u-4", "Carol", "carol", AccountType::Member),
        ];
        let mut group = Group::new(GroupId::new("g-1"), "Readers");
        group.enroll(&UserId::new("u-1"));
        DirectoryGateway::new(Arc::new(NullStore::with_records(users, vec![group])))
    }

    fn ids(users: &[User]) -> Vec<&str> {
        users.iter().map(|u| u.id.as_str()).collect()
    }

    #[test]
    fn matches_name_or_handle_case_insensitively() {
        let hits = gateway()
            .search_users("ALICE", &CancellationToken::new())
            .unwrap();
        assert_eq!(ids(&hits), vec!["u-1", "u-3"]);
    }

    #[test]
    fn empty_query_is_invalid() {
        assert!(matches!(
            gateway().search_users("", &CancellationToken::new()),
            Err(DirectoryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn surrounding_spaces_are_part_of_the_needle() {
        let users = vec![user("u-1", "Malice", "alice", AccountType::Member)];
        let gw = DirectoryGateway::new(Arc::new(NullStore::with_records(users, vec![])));
        let cancel = CancellationToken::new();

        assert!(gw.search_users("alice ", &cancel).unwrap().is_empty());
        assert_eq!(ids(&gw.search_users("alice", &cancel).unwrap()), vec!["u-1"]);
    }

    #[test]
    fn no_match_is_empty_list() {
        let hits = gateway()
            .search_users("zzz-no-match", &CancellationToken::new())
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn excludes_members_and_self() {
        let gw = gateway();
        let cancel = CancellationToken::new();
        let hits = gw
            .search_users_excluding_group_members("a", &GroupId::new("g-1"), None, &cancel)
            .unwrap();
        assert_eq!(ids(&hits), vec!["u-3", "u-4"]);

        let me = UserId::new("u-4");
        let hits = gw
            .search_users_excluding_group_members("a", &GroupId::new("g-1"), Some(&me), &cancel)
            .unwrap();
        assert_eq!(ids(&hits), vec!["u-3"]);
    }

    #[test]
    fn missing_group_is_not_found() {
        assert!(matches!(
            gateway().search_users_excluding_group_members(
                "a",
                &GroupId::new("g-404"),
                None,
                &CancellationToken::new()
            ),
            Err(DirectoryError::GroupNotFound(_))
        ));
    }

    #[test]
    fn blank_group_id_is_invalid() {
        assert!(matches!(
            gateway().search_users_excluding_group_members(
                "a",
                &GroupId::new(""),
                None,
                &CancellationToken::new()
            ),
            Err(DirectoryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn promoted_search_keeps_influencers_and_brands() {
        let hits = gateway()
            .search_influencers_and_brands("a", &CancellationToken::new())
            .unwrap();
        assert_eq!(ids(&hits), vec!["u-1", "u-3"]);
    }

    #[test]
    fn cancelled_token_stops_search() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(
            gateway().search_users("alice", &cancel),
            Err(DirectoryError::Cancelled)
        ));
    }
}
