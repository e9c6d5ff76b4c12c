use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::registrations::{ListQuery, Pagination};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use entrant_core::models::{ContactForm, ContactRequest, ContactSubject, ContactSubmission};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

const CREATED_MESSAGE: &str = "Contact form submitted successfully! We will respond soon.";

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: ContactSubject,
    pub created_at: DateTime<Utc>,
}

impl From<&ContactSubmission> for ContactSummary {
    fn from(c: &ContactSubmission) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            email: c.email.clone(),
            subject: c.subject,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateContactResponse {
    pub success: bool,
    pub data: ContactSummary,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContactListResponse {
    pub success: bool,
    pub data: Vec<ContactSubmission>,
    pub pagination: Pagination,
}

#[utoipa::path(
    post,
    path = "/api/contact",
    tag = "contact",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Message stored; the admin is notified in the background", body = CreateContactResponse),
        (status = 400, description = "Missing or invalid field", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(operation = "submit_contact"))]
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let Json(request) = payload?;
    let form = ContactForm::from_request(request)?;

    let submission = state.contacts.submit(form).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateContactResponse {
            success: true,
            data: ContactSummary::from(&submission),
            message: CREATED_MESSAGE.to_string(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/contact",
    tag = "contact",
    params(ListQuery),
    responses(
        (status = 200, description = "Contact messages, newest first", body = ContactListResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let page = query.page();
    let limit = query.limit();
    let offset = (page - 1).saturating_mul(limit);

    let (data, total) = state.contacts.list(offset, limit).await?;

    Ok(Json(ContactListResponse {
        success: true,
        data,
        pagination: Pagination::new(page, limit, total),
    }))
}
