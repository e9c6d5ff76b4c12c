//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use entrant_core::models::FileMetadata;
use futures::Stream;
use std::fmt;
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Non-success HTTP status from the remote provider
    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Chunked file body. Dropping it releases the underlying file handle or socket.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// A file opened for download
pub struct DownloadedFile {
    pub stream: ByteStream,
    pub content_type: String,
    pub display_name: String,
    /// Length when the backend knows it up front
    pub size_bytes: Option<u64>,
}

impl fmt::Debug for DownloadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadedFile")
            .field("content_type", &self.content_type)
            .field("display_name", &self.display_name)
            .field("size_bytes", &self.size_bytes)
            .finish_non_exhaustive()
    }
}

/// Existence and size of a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub exists: bool,
    pub size_bytes: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl FileInfo {
    pub fn missing() -> Self {
        Self {
            exists: false,
            size_bytes: None,
            created_at: None,
        }
    }
}

/// Storage abstraction trait
///
/// Implemented by the local filesystem and remote CDN backends. Callers keep
/// the returned [`FileMetadata`] and hand it back for every later operation,
/// so backends never need to look anything up by themselves.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` under a key derived from `scope_id` and the sanitized
    /// original filename.
    async fn upload(
        &self,
        data: Bytes,
        original_filename: &str,
        content_type: &str,
        size_bytes: u64,
        scope_id: &str,
    ) -> StorageResult<FileMetadata>;

    /// Open a stored file for streaming.
    ///
    /// Returns `StorageError::NotFound` when the object no longer exists.
    async fn download(&self, metadata: &FileMetadata) -> StorageResult<DownloadedFile>;

    /// Delete a stored file. Deleting an object that is already gone succeeds.
    async fn delete(&self, metadata: &FileMetadata) -> StorageResult<bool>;

    /// Check whether the object exists and report its size.
    async fn get_info(&self, metadata: &FileMetadata) -> StorageResult<FileInfo>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Name persisted into `FileMetadata::provider`
    fn provider_name(&self) -> String {
        self.backend_type().to_string()
    }
}
