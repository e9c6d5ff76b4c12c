use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage_types::StorageBackend;

/// Coarse classification of an upload, used by the remote provider to pick
/// its upload, download and destroy endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Image,
    Video,
    Raw,
}

impl ResourceKind {
    /// Documents and archives are `Raw`.
    pub fn from_content_type(content_type: &str) -> Self {
        let ct = content_type.trim().to_lowercase();
        if ct.starts_with("image/") {
            ResourceKind::Image
        } else if ct.starts_with("video/") {
            ResourceKind::Video
        } else {
            ResourceKind::Raw
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Video => "video",
            ResourceKind::Raw => "raw",
        }
    }
}

/// Metadata persisted for a stored file. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub provider: StorageBackend,
    /// Remote asset id, path relative to the local root, or (legacy records) a full URL
    pub storage_key: String,
    /// Sanitized original filename
    pub display_name: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub resource_kind: ResourceKind,
}

impl FileMetadata {
    /// Records created before the storage abstraction stored a direct URL
    /// instead of a provider key. Only an `http://` or `https://` scheme
    /// counts; keys such as `httpdocs/...` are ordinary provider keys.
    pub fn legacy_url(&self) -> Option<&str> {
        let key = self.storage_key.as_str();
        let has_scheme = |scheme: &str| {
            key.get(..scheme.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
        };
        if has_scheme("http://") || has_scheme("https://") {
            Some(self.storage_key.as_str())
        } else {
            None
        }
    }
}

/// Attachment position on a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileSlot {
    #[default]
    Submission,
    Payment,
}

impl FileSlot {
    pub const ALL: [FileSlot; 2] = [FileSlot::Submission, FileSlot::Payment];

    /// Multipart field carrying this slot's file
    pub fn form_field(&self) -> &'static str {
        match self {
            FileSlot::Submission => "submissionFile",
            FileSlot::Payment => "paymentScreenshot",
        }
    }

    /// Human-readable name used in validation messages
    pub fn label(&self) -> &'static str {
        match self {
            FileSlot::Submission => "submission file",
            FileSlot::Payment => "payment screenshot",
        }
    }

    /// Storage namespace for a registration's file in this slot
    pub fn scope_id(&self, registration_id: &str) -> String {
        match self {
            FileSlot::Submission => registration_id.to_string(),
            FileSlot::Payment => format!("{}/payment", registration_id),
        }
    }

    /// Proxy path clients use to download the file
    pub fn download_path(&self, registration_id: &str) -> String {
        match self {
            FileSlot::Submission => format!("/api/files/{}/download", registration_id),
            FileSlot::Payment => format!("/api/files/{}/download?type=payment", registration_id),
        }
    }

    pub fn from_form_field(name: &str) -> Option<Self> {
        FileSlot::ALL.into_iter().find(|slot| slot.form_field() == name)
    }
}
