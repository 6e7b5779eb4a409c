//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::membership::LmdbMembershipStore;
use crate::meta::{ensure_schema, LmdbMetaStore};
use crate::LmdbError;

/// Number of named databases the environment is opened with.
pub const MAX_DBS: u32 = 8;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    pub(crate) users_db: Database<Bytes, Bytes>,
    pub(crate) groups_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    ///
    /// Creates the directory if needed, opens every named database and checks
    /// the schema version.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per path by this process and
        // never through another `Env` handle concurrently.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let users_db = env.create_database(&mut wtxn, Some("users"))?;
        let groups_db = env.create_database(&mut wtxn, Some("groups"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        let environment = Self {
            env: Arc::new(env),
            users_db,
            groups_db,
            meta_db,
        };

        ensure_schema(&environment.meta_store())?;
        tracing::info!(path = %path.display(), "opened LMDB environment");
        Ok(environment)
    }

    pub fn membership_store(&self) -> LmdbMembershipStore {
        LmdbMembershipStore {
            env: Arc::clone(&self.env),
            users_db: self.users_db,
            groups_db: self.groups_db,
        }
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.meta_db,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use circles_store::MetaStore;

    #[test]
    fn open_creates_directory_and_sets_schema() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("db");
        let env = LmdbEnvironment::open(&path, MAX_DBS, 16 * 1024 * 1024).expect("open env");
        assert!(path.exists());
        assert_eq!(
            env.meta_store().get_schema_version().unwrap(),
            crate::meta::CURRENT_SCHEMA_VERSION
        );
    }
}
