//! LMDB storage backend for the Circles service.
//!
//! Implements the storage traits from `circles-store` using the `heed` LMDB
//! bindings. Users, groups and metadata each map to one named database inside
//! a single environment, so a write transaction spans all of them.

pub mod environment;
pub mod error;
pub mod membership;
pub mod meta;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use membership::LmdbMembershipStore;
pub use meta::LmdbMetaStore;
