use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage backend types
///
/// Persisted into every `FileMetadata` so that downloads and deletes are routed
/// to the backend that originally stored the bytes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    Remote,
}

impl StorageBackend {
    /// Resolve the `UPLOAD_PROVIDER` setting.
    ///
    /// Unrecognized values are not fatal: a warning is logged and the remote
    /// backend is used.
    pub fn from_config_value(value: &str) -> Self {
        match value.parse() {
            Ok(backend) => backend,
            Err(_) => {
                tracing::warn!(
                    upload_provider = %value,
                    fallback = %StorageBackend::Remote,
                    "Unknown UPLOAD_PROVIDER, falling back to remote storage"
                );
                StorageBackend::Remote
            }
        }
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "remote" | "cloudinary" => Ok(StorageBackend::Remote),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::Local => write!(f, "local"),
            StorageBackend::Remote => write!(f, "remote"),
        }
    }
}
