use crate::keys::generate_storage_key;
use crate::traits::{DownloadedFile, FileInfo, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use entrant_core::models::{FileMetadata, ResourceKind};
use futures::StreamExt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for stored files (e.g., "./uploads/submissions")
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys that contain traversal sequences or resolve outside the
    /// base storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty()
            || storage_key.contains("..")
            || storage_key.starts_with('/')
            || storage_key.contains('\\')
        {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(storage_key);

        // Symlinks inside the tree could still point elsewhere
        if let Ok(canonical) = path.canonicalize() {
            let base_canonical = self.base_path.canonicalize().map_err(|e| {
                StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
            })?;
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Remove the now-empty scope directory. Failures are ignored: the
    /// directory may still hold other files.
    async fn remove_empty_parent(&self, path: &Path) {
        let Some(parent) = path.parent() else {
            return;
        };
        if parent == self.base_path {
            return;
        }
        if let Err(e) = fs::remove_dir(parent).await {
            tracing::debug!(
                dir = %parent.display(),
                error = %e,
                "Scope directory not removed"
            );
        }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(
        &self,
        data: Bytes,
        original_filename: &str,
        content_type: &str,
        size_bytes: u64,
        scope_id: &str,
    ) -> StorageResult<FileMetadata> {
        let uploaded_at = Utc::now();
        let (key, display_name) =
            generate_storage_key(scope_id, original_filename, uploaded_at.timestamp_millis())?;
        let path = self.key_to_path(&key)?;

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(FileMetadata {
            provider: StorageBackend::Local,
            storage_key: key,
            display_name,
            size_bytes,
            content_type: content_type.to_string(),
            uploaded_at,
            resource_kind: ResourceKind::from_content_type(content_type),
        })
    }

    async fn download(&self, metadata: &FileMetadata) -> StorageResult<DownloadedFile> {
        let storage_key = metadata.storage_key.as_str();
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        let file = fs::File::open(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(storage_key.to_string()),
            _ => StorageError::DownloadFailed(format!(
                "Failed to open file {}: {}",
                path.display(),
                e
            )),
        })?;

        let size_bytes = file.metadata().await.ok().map(|m| m.len());

        let reader = tokio_util::io::ReaderStream::new(file);

        let stream = reader.map(|result| {
            result.map_err(|e| StorageError::DownloadFailed(format!("Failed to read chunk: {}", e)))
        });

        let key = storage_key.to_string();
        let path_display = path.display().to_string();
        let logged_stream = stream.map(move |item| {
            if item.is_err() {
                tracing::error!(
                    path = %path_display,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage stream download error"
                );
            }
            item
        });

        tracing::debug!(
            path = %path.display(),
            key = %storage_key,
            size_bytes = ?size_bytes,
            "Local storage download opened"
        );

        Ok(DownloadedFile {
            stream: Box::pin(logged_stream),
            content_type: metadata.content_type.clone(),
            display_name: metadata.display_name.clone(),
            size_bytes,
        })
    }

    async fn delete(&self, metadata: &FileMetadata) -> StorageResult<bool> {
        let storage_key = metadata.storage_key.as_str();
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(key = %storage_key, "Local file already absent");
                return Ok(true);
            }
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        self.remove_empty_parent(&path).await;

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(true)
    }

    async fn get_info(&self, metadata: &FileMetadata) -> StorageResult<FileInfo> {
        let path = self.key_to_path(&metadata.storage_key)?;

        match fs::metadata(&path).await {
            Ok(meta) => {
                let created_at = meta
                    .created()
                    .or_else(|_| meta.modified())
                    .ok()
                    .map(DateTime::<Utc>::from);
                Ok(FileInfo {
                    exists: true,
                    size_bytes: Some(meta.len()),
                    created_at,
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(FileInfo::missing()),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tempfile::tempdir;

    async fn read_all(file: DownloadedFile) -> Vec<u8> {
        let mut stream = file.stream;
        let mut downloaded = Vec::new();
        while let Some(chunk_result) = stream.next().await {
            downloaded.extend_from_slice(&chunk_result.unwrap());
        }
        downloaded
    }

    #[tokio::test]
    async fn test_local_storage_upload_download() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let data = Bytes::from_static(b"%PDF-1.4 test data");
        let meta = storage
            .upload(data.clone(), "My Résumé!! v2.PDF", "application/pdf", data.len() as u64, "reg123")
            .await
            .unwrap();

        assert_eq!(meta.provider, StorageBackend::Local);
        assert!(meta.storage_key.starts_with("reg123/"));
        assert!(meta.storage_key.ends_with("_My_R_sum_v2.PDF"));
        assert_eq!(meta.display_name, "My_R_sum_v2.PDF");
        assert_eq!(meta.resource_kind, ResourceKind::Raw);
        assert!(dir.path().join(&meta.storage_key).exists());

        let file = storage.download(&meta).await.unwrap();
        assert_eq!(file.size_bytes, Some(data.len() as u64));
        assert_eq!(file.content_type, "application/pdf");
        assert_eq!(file.display_name, meta.display_name);
        assert_eq!(read_all(file).await, data.to_vec());
    }

    #[tokio::test]
    async fn test_payment_scope_nests_under_registration() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let meta = storage
            .upload(Bytes::from_static(b"\x89PNG"), "receipt.png", "image/png", 4, "reg123/payment")
            .await
            .unwrap();

        assert!(meta.storage_key.starts_with("reg123/payment/"));
        assert_eq!(meta.resource_kind, ResourceKind::Image);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let mut meta = storage
            .upload(Bytes::from_static(b"x"), "a.zip", "application/zip", 1, "reg1")
            .await
            .unwrap();

        meta.storage_key = "../../../etc/passwd".to_string();
        let result = storage.download(&meta).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        meta.storage_key = "/etc/passwd".to_string();
        let result = storage.delete(&meta).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage
            .upload(Bytes::from_static(b"x"), "a.zip", "application/zip", 1, "../escape")
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_local_storage_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let meta = storage
            .upload(Bytes::from_static(b"PK\x03\x04"), "entry.zip", "application/zip", 4, "reg9")
            .await
            .unwrap();

        assert!(storage.delete(&meta).await.unwrap());
        assert!(storage.delete(&meta).await.unwrap());
        // The emptied scope directory is cleaned up too
        assert!(!dir.path().join("reg9").exists());
    }

    #[tokio::test]
    async fn test_delete_keeps_non_empty_scope_dir() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let first = storage
            .upload(Bytes::from_static(b"one"), "one.pdf", "application/pdf", 3, "reg5")
            .await
            .unwrap();
        let second = storage
            .upload(Bytes::from_static(b"two"), "two.pdf", "application/pdf", 3, "reg5")
            .await
            .unwrap();

        assert!(storage.delete(&first).await.unwrap());
        assert!(dir.path().join("reg5").exists());
        assert!(storage.get_info(&second).await.unwrap().exists);
    }

    #[tokio::test]
    async fn test_download_after_manual_removal_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let meta = storage
            .upload(Bytes::from_static(b"%PDF"), "gone.pdf", "application/pdf", 4, "reg2")
            .await
            .unwrap();
        std::fs::remove_file(dir.path().join(&meta.storage_key)).unwrap();

        let result = storage.download(&meta).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_info() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let meta = storage
            .upload(Bytes::from_static(b"GIF89a"), "anim.gif", "image/gif", 6, "reg3")
            .await
            .unwrap();

        let info = storage.get_info(&meta).await.unwrap();
        assert!(info.exists);
        assert_eq!(info.size_bytes, Some(6));
        assert!(info.created_at.is_some());

        storage.delete(&meta).await.unwrap();
        let info = storage.get_info(&meta).await.unwrap();
        assert_eq!(info, FileInfo::missing());
    }
}
