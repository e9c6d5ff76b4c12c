//! Configuration validation
//!
//! Validates critical configuration values at startup to catch misconfigurations early.

use anyhow::Result;
use entrant_core::{Config, StorageBackend};

/// Validate critical configuration values
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    let is_production = config.is_production();

    if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS_ORIGINS allows any origin");
    }

    if config.max_file_size_bytes() > 100 * 1024 * 1024 {
        tracing::warn!(
            max_file_size_bytes = config.max_file_size_bytes(),
            "MAX_FILE_SIZE_BYTES is above 100 MB; every upload is buffered in memory"
        );
    }

    if is_production && config.storage_backend() == StorageBackend::Local {
        tracing::warn!(
            path = %config.local_storage_path(),
            "Local storage in production - files are lost if the disk is not persistent"
        );
    }

    if is_production && config.public_base_url().starts_with("http://localhost") {
        tracing::warn!(
            public_base_url = %config.public_base_url(),
            "PUBLIC_BASE_URL points at localhost - links in confirmation emails will not work"
        );
    }

    if config.smtp_host().is_none() {
        tracing::warn!("SMTP_HOST not set - confirmation emails will only be logged");
    } else if config.admin_email().is_none() {
        tracing::info!("ADMIN_EMAIL not set - admin notifications disabled");
    }

    tracing::info!("Configuration validation passed");
    Ok(())
}
