use std::sync::Arc;

use prism_storage::{FileStore, KeyValueStore, S3Store};
use tracing::info;

use crate::config::{PrismConfig, StorageConfig, default_data_dir};

/// Open the session store selected in the config.
pub fn open_store(
    config: &PrismConfig,
    sdk: &aws_config::SdkConfig,
) -> eyre::Result<Arc<dyn KeyValueStore>> {
    match &config.storage {
        StorageConfig::Local { directory } => {
            let root = match directory {
                Some(dir) => dir.clone(),
                None => default_data_dir()?,
            };
            info!(root = %root.display(), "using local session storage");
            Ok(Arc::new(FileStore::new(root)))
        }
        StorageConfig::S3 { bucket, prefix } => {
            if bucket.trim().is_empty() {
                return Err(eyre::eyre!("storage.bucket must not be empty"));
            }
            info!(bucket = %bucket, prefix = %prefix, "using S3 session storage");
            let client = prism_storage::client::build_client(sdk);
            Ok(Arc::new(S3Store::new(client, bucket, prefix)))
        }
    }
}
