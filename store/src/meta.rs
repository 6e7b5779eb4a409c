//! Metadata storage trait (schema version and raw key/value writes).

use crate::StoreError;

pub trait MetaStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
    fn get_schema_version(&self) -> Result<u32, StoreError>;
    fn set_schema_version(&self, version: u32) -> Result<(), StoreError>;
}
