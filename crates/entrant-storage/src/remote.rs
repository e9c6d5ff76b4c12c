//! Remote CDN storage backend.
//!
//! Talks to a Cloudinary-compatible management API: signed multipart uploads,
//! basic-auth downloads through the `download` endpoint (which answers with a
//! redirect to a short-lived URL), signed destroys and admin resource lookups.

use crate::keys::{generate_storage_key, registration_of};
use crate::traits::{DownloadedFile, FileInfo, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use entrant_core::models::{FileMetadata, ResourceKind};
use entrant_core::Config;
use futures::StreamExt;
use reqwest::header::LOCATION;
use reqwest::multipart::{Form, Part};
use reqwest::{redirect, Response, StatusCode};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;

const SUBMISSION_TAG: &str = "competition-submission";

/// Credentials and endpoint settings for the remote backend
#[derive(Clone)]
pub struct RemoteCdnConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
    pub api_base_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for RemoteCdnConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCdnConfig")
            .field("cloud_name", &self.cloud_name)
            .field("folder", &self.folder)
            .field("api_base_url", &self.api_base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RemoteCdnConfig {
    pub fn from_config(config: &Config) -> StorageResult<Self> {
        let required = |value: Option<&str>, name: &str| {
            value
                .map(String::from)
                .ok_or_else(|| StorageError::ConfigError(format!("{} not configured", name)))
        };

        Ok(Self {
            cloud_name: required(config.remote_cloud_name(), "REMOTE_CLOUD_NAME")?,
            api_key: required(config.remote_api_key(), "REMOTE_API_KEY")?,
            api_secret: required(config.remote_api_secret(), "REMOTE_API_SECRET")?,
            folder: config.remote_folder().to_string(),
            api_base_url: config.remote_api_base_url().to_string(),
            timeout: Duration::from_secs(config.remote_timeout_secs()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    #[serde(default)]
    resource_type: Option<ResourceKind>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ResourceResponse {
    #[serde(default)]
    bytes: Option<u64>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Remote CDN storage implementation
#[derive(Clone, Debug)]
pub struct RemoteCdnStorage {
    client: reqwest::Client,
    config: RemoteCdnConfig,
}

impl RemoteCdnStorage {
    pub fn new(config: RemoteCdnConfig) -> StorageResult<Self> {
        // Redirects are followed by hand so credentials never reach the CDN host.
        // Downloads are streamed to the client, so the timeout bounds idle reads
        // rather than the whole transfer; other calls set a per-request deadline.
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .read_timeout(config.timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        tracing::info!(
            cloud_name = %config.cloud_name,
            folder = %config.folder,
            timeout_secs = config.timeout.as_secs(),
            "Remote CDN storage initialized"
        );

        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/v1_1/{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.cloud_name,
            path
        )
    }

    /// SHA-256 request signature over the alphabetically sorted parameters
    fn sign(&self, params: &[(&'static str, String)]) -> String {
        let mut sorted: Vec<&(&str, String)> =
            params.iter().filter(|(_, v)| !v.is_empty()).collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let to_sign = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.config.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    async fn upstream_error(response: Response) -> StorageError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or(body);
        StorageError::Upstream { status, message }
    }

    /// Follow a single redirect hop without credentials.
    async fn follow_redirect(&self, response: Response) -> StorageResult<Response> {
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                StorageError::DownloadFailed("Redirect without a Location header".to_string())
            })?;
        let target = response.url().join(location).map_err(|e| {
            StorageError::DownloadFailed(format!("Invalid redirect location: {}", e))
        })?;

        tracing::debug!(host = ?target.host_str(), "Following download redirect");

        let redirected = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| StorageError::DownloadFailed(format!("Redirect fetch failed: {}", e)))?;

        if redirected.status().is_redirection() {
            return Err(StorageError::Upstream {
                status: redirected.status().as_u16(),
                message: "Too many redirects".to_string(),
            });
        }

        Ok(redirected)
    }

    fn encoded_public_id(public_id: &str) -> String {
        public_id
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[async_trait]
impl Storage for RemoteCdnStorage {
    async fn upload(
        &self,
        data: Bytes,
        original_filename: &str,
        content_type: &str,
        size_bytes: u64,
        scope_id: &str,
    ) -> StorageResult<FileMetadata> {
        let uploaded_at = Utc::now();
        let (public_id, display_name) =
            generate_storage_key(scope_id, original_filename, uploaded_at.timestamp_millis())?;
        let kind = ResourceKind::from_content_type(content_type);
        let start = std::time::Instant::now();

        let params: Vec<(&'static str, String)> = vec![
            ("access_mode", "public".to_string()),
            ("folder", self.config.folder.clone()),
            ("public_id", public_id.clone()),
            (
                "tags",
                format!(
                    "{},registration-{}",
                    SUBMISSION_TAG,
                    registration_of(scope_id)
                ),
            ),
            ("timestamp", uploaded_at.timestamp().to_string()),
            ("type", "upload".to_string()),
        ];
        let signature = self.sign(&params);

        let part = Part::stream_with_length(data, size_bytes)
            .file_name(display_name.clone())
            .mime_str(content_type)
            .map_err(|e| StorageError::UploadFailed(format!("Invalid content type: {}", e)))?;

        let mut form = Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (name, value) in params {
            form = form.text(name, value);
        }

        let response = self
            .client
            .post(self.endpoint(&format!("{}/upload", kind.as_str())))
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Invalid upload response: {}", e)))?;

        tracing::info!(
            public_id = %body.public_id,
            resource_kind = kind.as_str(),
            size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Remote storage upload successful"
        );

        Ok(FileMetadata {
            provider: StorageBackend::Remote,
            storage_key: body.public_id,
            display_name,
            size_bytes,
            content_type: content_type.to_string(),
            uploaded_at,
            resource_kind: body.resource_type.unwrap_or(kind),
        })
    }

    async fn download(&self, metadata: &FileMetadata) -> StorageResult<DownloadedFile> {
        let public_id = metadata.storage_key.as_str();
        let start = std::time::Instant::now();

        let response = self
            .client
            .get(self.endpoint(&format!("{}/download", metadata.resource_kind.as_str())))
            .query(&[("public_id", public_id)])
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .send()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        let response = if response.status().is_redirection() {
            self.follow_redirect(response).await?
        } else {
            response
        };

        match response.status() {
            StatusCode::NOT_FOUND => return Err(StorageError::NotFound(public_id.to_string())),
            status if !status.is_success() => return Err(Self::upstream_error(response).await),
            _ => {}
        }

        let size_bytes = response.content_length();

        let key = public_id.to_string();
        let stream = response.bytes_stream().map(move |item| {
            item.map_err(|e| {
                tracing::error!(
                    public_id = %key,
                    error = %e,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Remote storage stream download error"
                );
                StorageError::DownloadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        tracing::debug!(
            public_id = %public_id,
            size_bytes = ?size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Remote storage download opened"
        );

        Ok(DownloadedFile {
            stream: Box::pin(stream),
            content_type: metadata.content_type.clone(),
            display_name: metadata.display_name.clone(),
            size_bytes,
        })
    }

    async fn delete(&self, metadata: &FileMetadata) -> StorageResult<bool> {
        let public_id = metadata.storage_key.as_str();

        let params: Vec<(&'static str, String)> = vec![
            ("public_id", public_id.to_string()),
            ("timestamp", Utc::now().timestamp().to_string()),
            ("type", "upload".to_string()),
        ];
        let signature = self.sign(&params);

        let mut form = params;
        form.push(("api_key", self.config.api_key.clone()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", "sha256".to_string()));

        let response = self
            .client
            .post(self.endpoint(&format!("{}/destroy", metadata.resource_kind.as_str())))
            .form(&form)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(true);
        }
        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }

        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| StorageError::DeleteFailed(format!("Invalid destroy response: {}", e)))?;

        match body.result.as_str() {
            "ok" => {
                tracing::info!(public_id = %public_id, "Remote storage delete successful");
                Ok(true)
            }
            "not found" => {
                tracing::debug!(public_id = %public_id, "Remote asset already absent");
                Ok(true)
            }
            other => {
                tracing::warn!(public_id = %public_id, result = %other, "Remote delete not confirmed");
                Ok(false)
            }
        }
    }

    async fn get_info(&self, metadata: &FileMetadata) -> StorageResult<FileInfo> {
        let path = format!(
            "resources/{}/upload/{}",
            metadata.resource_kind.as_str(),
            Self::encoded_public_id(&metadata.storage_key)
        );

        let response = self
            .client
            .get(self.endpoint(&path))
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(FileInfo::missing());
        }
        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }

        let body: ResourceResponse = response
            .json()
            .await
            .map_err(|e| StorageError::BackendError(format!("Invalid resource response: {}", e)))?;

        Ok(FileInfo {
            exists: true,
            size_bytes: body.bytes,
            created_at: body.created_at,
        })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Remote
    }
}
