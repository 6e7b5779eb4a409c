//! Fundamental types for the Circles service.
//!
//! This crate defines the records shared across every other crate in the
//! workspace: user and group identifiers, the `User` and `Group` documents,
//! and account categories.

pub mod account;
pub mod error;
pub mod group;
pub mod id;
pub mod user;

pub use account::AccountType;
pub use error::TypesError;
pub use group::Group;
pub use id::{GroupId, UserId};
pub use user::User;
