//! Provider-agnostic storage facade.
//!
//! The service is built once at startup and shared through application state.
//! Backends are constructed on first use and cached for the lifetime of the
//! process. Uploads go to the configured backend; downloads, deletes and info
//! lookups go to whichever backend the file was stored with.

use crate::factory::create_storage;
use crate::traits::{DownloadedFile, FileInfo, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use bytes::Bytes;
use entrant_core::models::FileMetadata;
use entrant_core::Config;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub struct StorageService {
    /// `None` when built around a ready-made backend
    config: Option<Config>,
    selected: StorageBackend,
    local: OnceCell<Arc<dyn Storage>>,
    remote: OnceCell<Arc<dyn Storage>>,
}

impl std::fmt::Debug for StorageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageService")
            .field("selected", &self.selected)
            .field("local_ready", &self.local.initialized())
            .field("remote_ready", &self.remote.initialized())
            .finish()
    }
}

impl StorageService {
    /// Resolve the upload provider from configuration. Nothing is constructed
    /// until the first storage call.
    pub fn new(config: Config) -> Self {
        let selected = config.storage_backend();
        tracing::info!(provider = %selected, "Storage service configured");

        Self {
            config: Some(config),
            selected,
            local: OnceCell::new(),
            remote: OnceCell::new(),
        }
    }

    /// Wrap an already constructed backend. Files stored with a different
    /// provider cannot be resolved.
    pub fn with_storage(storage: Arc<dyn Storage>) -> Self {
        let selected = storage.backend_type();
        let service = Self {
            config: None,
            selected,
            local: OnceCell::new(),
            remote: OnceCell::new(),
        };
        // A fresh cell always accepts its first value
        let _ = service.cell(selected).set(storage);
        service
    }

    /// Provider new uploads are written to
    pub fn provider_name(&self) -> StorageBackend {
        self.selected
    }

    fn cell(&self, backend: StorageBackend) -> &OnceCell<Arc<dyn Storage>> {
        match backend {
            StorageBackend::Local => &self.local,
            StorageBackend::Remote => &self.remote,
        }
    }

    /// Backend for `backend`, constructing it on first use
    pub async fn storage_for(&self, backend: StorageBackend) -> StorageResult<Arc<dyn Storage>> {
        let storage = self
            .cell(backend)
            .get_or_try_init(|| async {
                let config = self.config.as_ref().ok_or_else(|| {
                    StorageError::ConfigError(format!("{} storage is not available", backend))
                })?;
                let storage = create_storage(backend, config).await?;
                tracing::info!(provider = %backend, "Storage provider initialized");
                Ok::<_, StorageError>(storage)
            })
            .await?;
        Ok(Arc::clone(storage))
    }

    /// Backend selected for uploads
    pub async fn storage(&self) -> StorageResult<Arc<dyn Storage>> {
        self.storage_for(self.selected).await
    }

    async fn storage_of(&self, metadata: &FileMetadata) -> StorageResult<Arc<dyn Storage>> {
        if let Some(url) = metadata.legacy_url() {
            return Err(StorageError::InvalidKey(format!(
                "External URL is not managed by a storage provider: {}",
                url
            )));
        }
        self.storage_for(metadata.provider).await
    }

    pub async fn upload_file(
        &self,
        data: Bytes,
        original_filename: &str,
        content_type: &str,
        size_bytes: u64,
        scope_id: &str,
    ) -> StorageResult<FileMetadata> {
        self.storage()
            .await?
            .upload(data, original_filename, content_type, size_bytes, scope_id)
            .await
    }

    pub async fn download_file(&self, metadata: &FileMetadata) -> StorageResult<DownloadedFile> {
        self.storage_of(metadata).await?.download(metadata).await
    }

    pub async fn delete_file(&self, metadata: &FileMetadata) -> StorageResult<bool> {
        self.storage_of(metadata).await?.delete(metadata).await
    }

    pub async fn get_file_info(&self, metadata: &FileMetadata) -> StorageResult<FileInfo> {
        self.storage_of(metadata).await?.get_info(metadata).await
    }
}
