//! Storage setup

use entrant_core::Config;
use entrant_storage::StorageService;
use std::sync::Arc;

/// Create the storage facade. Backends are built on first use, so this never
/// touches the network or the filesystem.
pub fn setup_storage(config: &Config) -> Arc<StorageService> {
    let service = StorageService::new(config.clone());
    tracing::info!(
        backend = %service.provider_name(),
        max_file_size_bytes = config.max_file_size_bytes(),
        "Storage service configured"
    );
    Arc::new(service)
}
