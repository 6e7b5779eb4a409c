//! Abstract storage traits for the Circles service.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.

pub mod error;
pub mod membership;
pub mod meta;

pub use error::StoreError;
pub use membership::{MembershipStore, MembershipTxn};
pub use meta::MetaStore;
