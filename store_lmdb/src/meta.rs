//! LMDB implementation of MetaStore and the schema version check.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use circles_store::meta::MetaStore;
use circles_store::StoreError;

use crate::LmdbError;

/// Layout of the users/groups tables this build reads and writes:
/// bincode values keyed by the raw id.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const SCHEMA_VERSION_KEY: &str = "schema_version";

pub struct LmdbMetaStore {
    pub(crate) env: Arc<Env>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl MetaStore for LmdbMetaStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, key.as_bytes(), value)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_schema_version(&self) -> Result<u32, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, SCHEMA_VERSION_KEY.as_bytes())
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => {
                let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                    LmdbError::Serialization(
                        "schema_version has unexpected byte length".to_string(),
                    )
                })?;
                Ok(u32::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        self.put_meta(SCHEMA_VERSION_KEY, &version.to_le_bytes())
    }
}

/// Stamp a fresh database with [`CURRENT_SCHEMA_VERSION`] and refuse one
/// written by a newer build.
pub(crate) fn ensure_schema(meta: &impl MetaStore) -> Result<(), LmdbError> {
    let found = meta
        .get_schema_version()
        .map_err(|e| LmdbError::Heed(e.to_string()))?;

    if found > CURRENT_SCHEMA_VERSION {
        return Err(LmdbError::SchemaTooNew {
            found,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }
    if found < CURRENT_SCHEMA_VERSION {
        meta.set_schema_version(CURRENT_SCHEMA_VERSION)
            .map_err(|e| LmdbError::Heed(e.to_string()))?;
        tracing::info!(from = found, to = CURRENT_SCHEMA_VERSION, "stamped schema version");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::MAX_DBS;
    use crate::LmdbEnvironment;

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("temp dir");
        let env = LmdbEnvironment::open(dir.path(), MAX_DBS, 16 * 1024 * 1024).unwrap();
        (dir, env)
    }

    #[test]
    fn fresh_database_is_stamped() {
        let (_dir, env) = temp_env();
        assert_eq!(
            env.meta_store().get_schema_version().unwrap(),
            CURRENT_SCHEMA_VERSION
        );
        assert!(ensure_schema(&env.meta_store()).is_ok());
    }

    #[test]
    fn newer_schema_is_refused() {
        let (_dir, env) = temp_env();
        let meta = env.meta_store();
        meta.set_schema_version(CURRENT_SCHEMA_VERSION + 1).unwrap();
        assert!(matches!(
            ensure_schema(&meta),
            Err(LmdbError::SchemaTooNew { found, .. }) if found == CURRENT_SCHEMA_VERSION + 1
        ));
    }

    #[test]
    fn truncated_version_is_a_serialization_error() {
        let (_dir, env) = temp_env();
        let meta = env.meta_store();
        meta.put_meta(SCHEMA_VERSION_KEY, &[1, 0]).unwrap();
        assert!(matches!(
            meta.get_schema_version(),
            Err(StoreError::Serialization(_))
        ));
    }
}
