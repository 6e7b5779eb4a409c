use circles_store::StoreError;
use circles_types::{GroupId, UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
