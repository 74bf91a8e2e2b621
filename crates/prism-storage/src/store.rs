use async_trait::async_trait;

use crate::error::StorageError;

/// Metadata for a single stored object, returned by [`KeyValueStore::list`].
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<jiff::Timestamp>,
}

/// A keyed blob store.
///
/// No transactional guarantees: a `set` either lands or fails, and the last
/// successful `set` for a key wins.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a blob. A missing key is `Ok(None)`, not an error.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Write a blob, replacing any previous value.
    async fn set(&self, key: &str, body: Vec<u8>) -> Result<(), StorageError>;

    /// List objects whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StorageError>;
}
