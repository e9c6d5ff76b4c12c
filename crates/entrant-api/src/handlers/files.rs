use crate::constants::FILE_CACHE_CONTROL;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::submission::{DownloadOutcome, FileDownload, FileInfoView};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, Response, StatusCode},
    response::IntoResponse,
    Json,
};
use entrant_core::models::FileSlot;
use entrant_core::AppError;
use entrant_storage::DownloadedFile;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// `?type=payment` selects the payment proof; anything else the submission
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SlotQuery {
    #[serde(rename = "type")]
    #[param(rename = "type")]
    pub kind: Option<String>,
}

impl SlotQuery {
    pub fn slot(&self) -> FileSlot {
        match self.kind.as_deref().map(str::trim) {
            Some(kind) if kind.eq_ignore_ascii_case("payment") => FileSlot::Payment,
            _ => FileSlot::Submission,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Inline,
    Attachment,
}

impl Disposition {
    fn as_str(&self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileInfoResponse {
    pub success: bool,
    pub data: FileInfoView,
}

fn redirect(url: &str) -> Result<Response<Body>, AppError> {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, url)
        .body(Body::empty())
        .map_err(|e| AppError::Internal(format!("Failed to build redirect: {}", e)))
}

/// Stream a stored file. Errors after this point can only be logged; the
/// status line and headers are already on the wire.
fn file_response(
    registration_id: Uuid,
    download: FileDownload,
    disposition: Disposition,
) -> Result<Response<Body>, AppError> {
    let FileDownload { file, etag } = download;
    let DownloadedFile {
        stream,
        content_type,
        display_name,
        size_bytes,
    } = file;

    let body_stream = stream.map(move |result| {
        result.map_err(|e| {
            tracing::error!(
                registration_id = %registration_id,
                error = %e,
                "File stream error after headers were sent"
            );
            std::io::Error::other(format!("Storage stream error: {}", e))
        })
    });

    let content_disposition = format!(
        "{}; filename=\"{}\"",
        disposition.as_str(),
        urlencoding::encode(&display_name)
    );

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_str())
        .header(header::CONTENT_DISPOSITION, content_disposition.as_str())
        .header(header::CACHE_CONTROL, FILE_CACHE_CONTROL)
        .header(header::ETAG, etag.as_str());
    if let Some(len) = size_bytes {
        builder = builder.header(header::CONTENT_LENGTH, len);
    }

    tracing::info!(
        registration_id = %registration_id,
        file_name = %display_name,
        size_bytes = ?size_bytes,
        disposition = disposition.as_str(),
        "Serving file"
    );

    builder
        .body(Body::from_stream(body_stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}

async fn serve_file(
    state: &AppState,
    id: Uuid,
    slot: FileSlot,
    disposition: Disposition,
) -> Result<Response<Body>, HttpAppError> {
    let response = match state.submissions.download_submission_file(id, slot).await? {
        DownloadOutcome::Redirect(url) => redirect(&url)?,
        DownloadOutcome::Stream(download) => file_response(id, download, disposition)?,
    };
    Ok(response)
}

#[utoipa::path(
    get,
    path = "/api/files/{id}/download",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "Registration ID"),
        SlotQuery
    ),
    responses(
        (status = 200, description = "File content, displayed inline", content_type = "application/octet-stream"),
        (status = 302, description = "Legacy record; redirect to its original URL"),
        (status = 404, description = "Registration or file not found", body = ErrorResponse),
        (status = 500, description = "Storage provider error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(registration_id = %id, operation = "download_file"))]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    serve_file(&state, id, query.slot(), Disposition::Inline).await
}

#[utoipa::path(
    get,
    path = "/api/files/{id}/download-attachment",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "Registration ID"),
        SlotQuery
    ),
    responses(
        (status = 200, description = "File content as an attachment", content_type = "application/octet-stream"),
        (status = 302, description = "Legacy record; redirect to its original URL"),
        (status = 404, description = "Registration or file not found", body = ErrorResponse),
        (status = 500, description = "Storage provider error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(registration_id = %id, operation = "download_attachment"))]
pub async fn download_attachment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    serve_file(&state, id, query.slot(), Disposition::Attachment).await
}

#[utoipa::path(
    get,
    path = "/api/files/{id}/info",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "Registration ID"),
        SlotQuery
    ),
    responses(
        (status = 200, description = "File metadata", body = FileInfoResponse),
        (status = 404, description = "Registration or file not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(registration_id = %id))]
pub async fn file_info(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let data = state.submissions.file_info(id, query.slot()).await?;
    Ok(Json(FileInfoResponse {
        success: true,
        data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_query() {
        assert_eq!(SlotQuery::default().slot(), FileSlot::Submission);
        let payment = SlotQuery {
            kind: Some("payment".to_string()),
        };
        assert_eq!(payment.slot(), FileSlot::Payment);
        let other = SlotQuery {
            kind: Some("receipt".to_string()),
        };
        assert_eq!(other.slot(), FileSlot::Submission);
    }

    #[tokio::test]
    async fn test_file_response_headers() {
        let stream = futures::stream::iter(vec![Ok::<_, entrant_storage::StorageError>(
            bytes::Bytes::from_static(b"hello"),
        )]);
        let id = Uuid::new_v4();
        let download = FileDownload {
            file: DownloadedFile {
                stream: Box::pin(stream),
                content_type: "application/pdf".to_string(),
                display_name: "My Entry.pdf".to_string(),
                size_bytes: Some(5),
            },
            etag: format!("\"{}-1\"", id),
        };

        let response = file_response(id, download, Disposition::Attachment).unwrap();
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"My%20Entry.pdf\""
        );
        assert_eq!(headers[header::CONTENT_LENGTH], "5");
        assert_eq!(headers[header::CACHE_CONTROL], FILE_CACHE_CONTROL);
        assert_eq!(headers[header::ETAG], format!("\"{}-1\"", id).as_str());
    }
}
