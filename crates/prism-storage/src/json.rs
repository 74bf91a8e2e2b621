use serde::{Serialize, de::DeserializeOwned};

use crate::error::StorageError;
use crate::store::KeyValueStore;

/// Load a JSON document. A missing key is `Ok(None)`.
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(body) = store.get(key).await? else {
        return Ok(None);
    };
    let value: T = serde_json::from_slice(&body)?;
    Ok(Some(value))
}

/// Save a JSON document, replacing any previous value.
pub async fn save_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let body = serde_json::to_vec_pretty(value)?;
    store.set(key, body).await
}
