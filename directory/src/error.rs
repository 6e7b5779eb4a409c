use circles_store::StoreError;
use circles_types::GroupId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    #[error("search cancelled")]
    Cancelled,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
