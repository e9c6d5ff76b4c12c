//! Entrant Storage Library
//!
//! Storage abstraction for competition uploads. The [`Storage`] trait is
//! implemented by a local filesystem backend and a remote CDN backend; the
//! [`StorageService`] facade picks one from configuration and builds it lazily.
//!
//! # Storage key format
//!
//! All backends use the same key layout:
//!
//! - **Submission file**: `{registration_id}/{timestamp_ms}_{sanitized_name}`
//! - **Payment proof**: `{registration_id}/payment/{timestamp_ms}_{sanitized_name}`
//!
//! The remote backend additionally prefixes its configured folder. Keys never
//! contain `..` or a leading `/`.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-remote")]
pub mod remote;
pub mod service;
pub mod traits;

// Re-export commonly used types
pub use entrant_core::StorageBackend;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-remote")]
pub use remote::{RemoteCdnConfig, RemoteCdnStorage};
pub use service::StorageService;
pub use traits::{ByteStream, DownloadedFile, FileInfo, Storage, StorageError, StorageResult};
