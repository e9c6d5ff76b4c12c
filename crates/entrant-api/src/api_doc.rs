//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crate::services::submission;
use entrant_core::{models, StorageBackend};

/// Returns the OpenAPI spec served at `/api/openapi.json`.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Entrant API",
        version = "0.1.0",
        description = "Competition registration API. Accepts registrations with a submission file and a payment proof, stores the files on local disk or a remote CDN, and serves them back through stable proxy URLs. Also collects contact form messages for the organisers."
    ),
    paths(
        // Health
        handlers::health::health_check,
        // Registrations
        handlers::registrations::create_registration,
        handlers::registrations::list_registrations,
        handlers::registrations::check_email,
        // Files
        handlers::files::download_file,
        handlers::files::download_attachment,
        handlers::files::file_info,
        // Contact
        handlers::contact::submit_contact,
        handlers::contact::list_contacts,
    ),
    components(
        schemas(
            // Core models
            models::Registration,
            models::AgeGroup,
            models::Experience,
            models::FileMetadata,
            models::FileSlot,
            models::ResourceKind,
            models::ContactRequest,
            models::ContactSubject,
            models::ContactSubmission,
            StorageBackend,
            // Handler models
            handlers::health::HealthResponse,
            handlers::registrations::RegistrationSummary,
            handlers::registrations::CreateRegistrationResponse,
            handlers::registrations::RegistrationListResponse,
            handlers::registrations::Pagination,
            handlers::registrations::EmailExistsResponse,
            handlers::files::FileInfoResponse,
            submission::FileInfoView,
            handlers::contact::ContactSummary,
            handlers::contact::CreateContactResponse,
            handlers::contact::ContactListResponse,
            // Error
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "registrations", description = "Registration submission and listing"),
        (name = "files", description = "Proxy downloads and metadata for uploaded files"),
        (name = "contact", description = "Contact form messages for the organisers")
    )
)]
pub struct ApiDoc;
