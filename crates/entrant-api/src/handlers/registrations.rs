use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::error::{multipart_error, ErrorResponse, HttpAppError};
use crate::services::UploadedFile;
use crate::state::AppState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use entrant_core::models::{AgeGroup, Experience, FileSlot, Registration, RegistrationForm};
use entrant_core::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

const CREATED_MESSAGE: &str = "Registration successful! Confirmation emails are being sent.";

/// Public view of a registration, used in creation responses and listings
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: AgeGroup,
    pub school: String,
    pub category: AgeGroup,
    pub experience: Experience,
    pub submission_file_url: Option<String>,
    pub submission_file_name: Option<String>,
    pub payment_proof_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Registration> for RegistrationSummary {
    fn from(r: &Registration) -> Self {
        Self {
            id: r.id,
            first_name: r.first_name.clone(),
            last_name: r.last_name.clone(),
            email: r.email.clone(),
            age: r.age,
            school: r.school.clone(),
            category: r.category,
            experience: r.experience,
            submission_file_url: r.submission_file_url.clone(),
            submission_file_name: r.submission_file.as_ref().map(|f| f.display_name.clone()),
            payment_proof_url: r.payment_proof_url.clone(),
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateRegistrationResponse {
    pub success: bool,
    pub data: RegistrationSummary,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub pages: usize,
}

impl Pagination {
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        Self {
            page,
            limit,
            total,
            pages: total.div_ceil(limit),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationListResponse {
    pub success: bool,
    /// Storage keys and providers stay server-side; files are reachable
    /// through the proxy URLs only
    pub data: Vec<RegistrationSummary>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmailExistsResponse {
    pub exists: bool,
}

/// Unparseable values fall back to the defaults
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListQuery {
    /// 1-based page number (default 1)
    pub page: Option<String>,
    /// Page size (default 20, at most 100)
    pub limit: Option<String>,
}

impl ListQuery {
    pub(crate) fn page(&self) -> usize {
        parse_positive(self.page.as_deref()).unwrap_or(1)
    }

    pub(crate) fn limit(&self) -> usize {
        parse_positive(self.limit.as_deref())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE)
    }
}

fn parse_positive(value: Option<&str>) -> Option<usize> {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&v| v > 0)
}

/// Split the registration form into text fields and uploaded files.
///
/// File inputs left empty by the browser (no filename, no bytes) count as absent.
async fn read_registration_form(
    mut multipart: Multipart,
) -> Result<(HashMap<String, String>, HashMap<FileSlot, UploadedFile>), AppError> {
    let mut fields = HashMap::new();
    let mut files = HashMap::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(|s| s.to_string()).unwrap_or_default();

        if let Some(slot) = FileSlot::from_form_field(&name) {
            let filename = field.file_name().map(|s| s.to_string()).unwrap_or_default();
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let data = field.bytes().await.map_err(multipart_error)?;

            if filename.is_empty() && data.is_empty() {
                continue;
            }
            if files.contains_key(&slot) {
                return Err(AppError::InvalidInput(format!(
                    "Only one file is allowed in '{}'",
                    name
                )));
            }
            files.insert(
                slot,
                UploadedFile {
                    data,
                    filename,
                    content_type,
                },
            );
        } else if field.file_name().is_some() {
            tracing::debug!(field = %name, "Ignoring unexpected file field");
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            fields.insert(name, value);
        }
    }

    Ok((fields, files))
}

#[utoipa::path(
    post,
    path = "/api/registrations",
    tag = "registrations",
    request_body(content = inline(Object), content_type = "multipart/form-data",
        description = "Registration fields plus optional `submissionFile` and `paymentScreenshot` files"),
    responses(
        (status = 201, description = "Registration stored", body = CreateRegistrationResponse),
        (status = 400, description = "Invalid form field or rejected file", body = ErrorResponse),
        (status = 413, description = "Request body too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "create_registration"))]
pub async fn create_registration(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let (fields, files) = read_registration_form(multipart?).await?;
    let form = RegistrationForm::from_fields(&fields)?;

    tracing::info!(
        email = %form.email,
        files = files.len(),
        "Processing registration"
    );

    let registration = state.submissions.create_submission(form, files).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateRegistrationResponse {
            success: true,
            data: RegistrationSummary::from(&registration),
            message: CREATED_MESSAGE.to_string(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/registrations/check-email/{email}",
    tag = "registrations",
    params(("email" = String, Path, description = "Email address to look up")),
    responses(
        (status = 200, description = "Whether a registration uses this email", body = EmailExistsResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn check_email(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let exists = state.registrations.exists_by_email(&email).await?;
    Ok(Json(EmailExistsResponse { exists }))
}

#[utoipa::path(
    get,
    path = "/api/registrations",
    tag = "registrations",
    params(ListQuery),
    responses(
        (status = 200, description = "Registrations, newest first", body = RegistrationListResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn list_registrations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let page = query.page();
    let limit = query.limit();
    let offset = (page - 1).saturating_mul(limit);

    let registrations = state.registrations.find_page(offset, limit).await?;
    let total = state.registrations.count().await?;

    Ok(Json(RegistrationListResponse {
        success: true,
        data: registrations.iter().map(RegistrationSummary::from).collect(),
        pagination: Pagination::new(page, limit, total),
    }))
}
