#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-remote")]
use crate::{RemoteCdnConfig, RemoteCdnStorage};
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use entrant_core::Config;
use std::sync::Arc;

/// Create the storage backend for `backend` from configuration
pub async fn create_storage(
    backend: StorageBackend,
    config: &Config,
) -> StorageResult<Arc<dyn Storage>> {
    match backend {
        #[cfg(feature = "storage-remote")]
        StorageBackend::Remote => {
            let remote_config = RemoteCdnConfig::from_config(config)?;
            let storage = RemoteCdnStorage::new(remote_config)?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-remote"))]
        StorageBackend::Remote => Err(StorageError::ConfigError(
            "Remote storage backend not available (storage-remote feature not enabled)"
                .to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.local_storage_path();
            if base_path.trim().is_empty() {
                return Err(StorageError::ConfigError(
                    "LOCAL_STORAGE_PATH not configured".to_string(),
                ));
            }

            let storage = LocalStorage::new(base_path).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
