//! Errors raised while constructing core types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("{kind} id must not be blank")]
    BlankId { kind: &'static str },

    #[error("unknown account type: {0}")]
    UnknownAccountType(String),
}
