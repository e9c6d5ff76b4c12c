//! Registration file lifecycle.
//!
//! Files are validated before anything is persisted, uploaded under the
//! registration's scope once the record exists, and later served back through
//! the proxy download routes. Each registration has two slots: the submission
//! itself and an optional payment proof.

use crate::error::{file_rejected, storage_error};
use crate::repository::RegistrationRepository;
use crate::services::notifier::Notifier;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use entrant_core::models::{FileMetadata, FileSlot, Registration, RegistrationForm};
use entrant_core::validation::FileValidator;
use entrant_core::{AppError, StorageBackend};
use entrant_storage::{DownloadedFile, StorageService};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// A file received in the registration form, held in memory until stored
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub data: Bytes,
    pub filename: String,
    pub content_type: String,
}

impl UploadedFile {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// How a slot's file is served
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedFile {
    /// Record predates provider keys; the client is sent straight to the URL
    LegacyUrl(String),
    Stored(FileMetadata),
}

#[derive(Debug)]
pub struct FileDownload {
    pub file: DownloadedFile,
    /// Quoted entity tag derived from registration id and upload time
    pub etag: String,
}

#[derive(Debug)]
pub enum DownloadOutcome {
    Redirect(String),
    Stream(FileDownload),
}

/// Slot metadata as returned by the info route
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileInfoView {
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub upload_provider: StorageBackend,
    pub download_url: String,
}

pub fn etag_for(registration_id: Uuid, uploaded_at: DateTime<Utc>) -> String {
    format!("\"{}-{}\"", registration_id, uploaded_at.timestamp_millis())
}

#[derive(Clone)]
pub struct SubmissionService {
    storage: Arc<StorageService>,
    repository: Arc<dyn RegistrationRepository>,
    notifier: Arc<dyn Notifier>,
    validator: FileValidator,
}

impl SubmissionService {
    pub fn new(
        storage: Arc<StorageService>,
        repository: Arc<dyn RegistrationRepository>,
        notifier: Arc<dyn Notifier>,
        validator: FileValidator,
    ) -> Self {
        Self {
            storage,
            repository,
            notifier,
            validator,
        }
    }

    /// Validate every provided file before touching storage or the repository.
    fn validate_files(&self, files: &HashMap<FileSlot, UploadedFile>) -> Result<(), AppError> {
        for slot in FileSlot::ALL {
            let Some(file) = files.get(&slot) else {
                continue;
            };
            self.validator
                .validate(&file.data, &file.filename, &file.content_type, file.size())
                .map_err(|e| {
                    tracing::debug!(
                        slot = ?slot,
                        filename = %file.filename,
                        content_type = %file.content_type,
                        size_bytes = file.size(),
                        error = %e,
                        "Upload rejected"
                    );
                    file_rejected(slot.form_field(), e)
                })?;
        }
        Ok(())
    }

    /// Store a new registration and its files.
    ///
    /// A provider failure leaves the slot empty and is only logged; the
    /// registration itself is already saved at that point.
    #[tracing::instrument(skip_all, fields(email = %form.email))]
    pub async fn create_submission(
        &self,
        form: RegistrationForm,
        mut files: HashMap<FileSlot, UploadedFile>,
    ) -> Result<Registration, AppError> {
        self.validate_files(&files)?;

        let mut registration = Registration::from_form(form);
        self.repository.save(&registration).await?;
        tracing::info!(registration_id = %registration.id, "Registration created");

        let registration_id = registration.id.to_string();
        let mut attached = false;
        for slot in FileSlot::ALL {
            let Some(file) = files.remove(&slot) else {
                continue;
            };
            let size_bytes = file.size();
            let result = self
                .storage
                .upload_file(
                    file.data,
                    &file.filename,
                    &file.content_type,
                    size_bytes,
                    &slot.scope_id(&registration_id),
                )
                .await;

            match result {
                Ok(metadata) => {
                    tracing::info!(
                        registration_id = %registration_id,
                        slot = ?slot,
                        provider = %metadata.provider,
                        size_bytes,
                        "File stored"
                    );
                    registration.attach_file(slot, metadata);
                    attached = true;
                }
                Err(e) => {
                    tracing::error!(
                        registration_id = %registration_id,
                        slot = ?slot,
                        filename = %file.filename,
                        error = %e,
                        "File upload failed, continuing without it"
                    );
                }
            }
        }

        if attached {
            self.repository.save(&registration).await?;
        }

        let notifier = Arc::clone(&self.notifier);
        let snapshot = registration.clone();
        tokio::spawn(async move {
            let report = notifier.notify(&snapshot).await;
            tracing::info!(
                registration_id = %snapshot.id,
                student = report.student,
                parent = report.parent,
                admin = report.admin,
                "Confirmation emails processed"
            );
        });

        Ok(registration)
    }

    async fn find_registration(&self, registration_id: Uuid) -> Result<Registration, AppError> {
        self.repository
            .find_by_id(registration_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Registration not found".to_string()))
    }

    fn slot_metadata(registration: &Registration, slot: FileSlot) -> Result<FileMetadata, AppError> {
        registration
            .file(slot)
            .cloned()
            .ok_or_else(|| AppError::NotFound("No file attached to this registration".to_string()))
    }

    pub async fn resolve_file(
        &self,
        registration_id: Uuid,
        slot: FileSlot,
    ) -> Result<ResolvedFile, AppError> {
        let registration = self.find_registration(registration_id).await?;
        let metadata = Self::slot_metadata(&registration, slot)?;

        Ok(match metadata.legacy_url() {
            Some(url) => ResolvedFile::LegacyUrl(url.to_string()),
            None => ResolvedFile::Stored(metadata),
        })
    }

    /// Open a slot's file for streaming, or point at its legacy URL.
    pub async fn download_submission_file(
        &self,
        registration_id: Uuid,
        slot: FileSlot,
    ) -> Result<DownloadOutcome, AppError> {
        let metadata = match self.resolve_file(registration_id, slot).await? {
            ResolvedFile::LegacyUrl(url) => {
                tracing::info!(
                    registration_id = %registration_id,
                    slot = ?slot,
                    "Redirecting to legacy file URL"
                );
                return Ok(DownloadOutcome::Redirect(url));
            }
            ResolvedFile::Stored(metadata) => metadata,
        };

        let file = self
            .storage
            .download_file(&metadata)
            .await
            .map_err(storage_error)?;

        Ok(DownloadOutcome::Stream(FileDownload {
            file,
            etag: etag_for(registration_id, metadata.uploaded_at),
        }))
    }

    pub async fn file_info(
        &self,
        registration_id: Uuid,
        slot: FileSlot,
    ) -> Result<FileInfoView, AppError> {
        let registration = self.find_registration(registration_id).await?;
        let metadata = Self::slot_metadata(&registration, slot)?;

        Ok(FileInfoView {
            file_name: metadata.display_name,
            file_size: metadata.size_bytes,
            file_type: metadata.content_type,
            uploaded_at: metadata.uploaded_at,
            upload_provider: metadata.provider,
            download_url: slot.download_path(&registration_id.to_string()),
        })
    }
}
