//! Shared key generation for storage backends.
//!
//! Key format: `{scope_id}/{timestamp_ms}_{sanitized_filename}`.

use crate::traits::{StorageError, StorageResult};
use entrant_core::validation::sanitize_filename;

/// Reject scopes that could escape their namespace.
pub fn validate_scope(scope_id: &str) -> StorageResult<()> {
    if scope_id.is_empty()
        || scope_id.contains("..")
        || scope_id.starts_with('/')
        || scope_id.contains('\\')
    {
        return Err(StorageError::InvalidKey(format!(
            "Invalid storage scope: {:?}",
            scope_id
        )));
    }
    Ok(())
}

/// Generate a storage key for the given scope and original filename.
///
/// Returns the key together with the sanitized display name.
pub fn generate_storage_key(
    scope_id: &str,
    original_filename: &str,
    timestamp_ms: i64,
) -> StorageResult<(String, String)> {
    validate_scope(scope_id)?;
    let sanitized = sanitize_filename(original_filename);
    let key = format!(
        "{}/{}_{}",
        scope_id.trim_end_matches('/'),
        timestamp_ms,
        sanitized
    );
    Ok((key, sanitized))
}

/// Registration id a scope belongs to (`reg123/payment` -> `reg123`)
pub fn registration_of(scope_id: &str) -> &str {
    scope_id.split('/').next().unwrap_or(scope_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_storage_key() {
        let (key, name) = generate_storage_key("reg123", "My Entry.zip", 1_700_000_000_000).unwrap();
        assert_eq!(key, "reg123/1700000000000_My_Entry.zip");
        assert_eq!(name, "My_Entry.zip");

        let (key, _) = generate_storage_key("reg123/payment", "receipt.png", 42).unwrap();
        assert_eq!(key, "reg123/payment/42_receipt.png");
    }

    #[test]
    fn test_invalid_scope_rejected() {
        for scope in ["", "../etc", "/abs", "a\\b", "reg/../../x"] {
            assert!(
                matches!(
                    generate_storage_key(scope, "a.pdf", 1),
                    Err(StorageError::InvalidKey(_))
                ),
                "scope {:?} should be rejected",
                scope
            );
        }
    }

    #[test]
    fn test_registration_of() {
        assert_eq!(registration_of("reg123/payment"), "reg123");
        assert_eq!(registration_of("reg123"), "reg123");
    }
}
