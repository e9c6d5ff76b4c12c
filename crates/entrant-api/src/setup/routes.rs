//! Route configuration and setup

use crate::constants::{API_PREFIX, FORM_OVERHEAD_BYTES};
use crate::error::HttpAppError;
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use entrant_core::{AppError, Config};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let body_limit = request_body_limit(config);
    tracing::info!(body_limit_bytes = body_limit, "Request body limit configured");

    // Every in-flight upload is buffered, so bound how many run at once
    let concurrency_limit = config.http_concurrency_limit();
    tracing::info!(
        http_concurrency_limit = concurrency_limit,
        "HTTP concurrency limit layer enabled"
    );

    let app = Router::new()
        .nest(API_PREFIX, api_routes())
        .fallback(route_not_found)
        // Multipart bodies are bounded by RequestBodyLimitLayer instead
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(ConcurrencyLimitLayer::new(concurrency_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/registrations",
            post(handlers::registrations::create_registration)
                .get(handlers::registrations::list_registrations),
        )
        .route(
            "/registrations/check-email/{email}",
            get(handlers::registrations::check_email),
        )
        .route("/files/{id}/download", get(handlers::files::download_file))
        .route(
            "/files/{id}/download-attachment",
            get(handlers::files::download_attachment),
        )
        .route("/files/{id}/info", get(handlers::files::file_info))
        .route(
            "/contact",
            post(handlers::contact::submit_contact).get(handlers::contact::list_contacts),
        )
        .route(
            "/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
}

/// Both file slots at their maximum plus room for the text fields.
fn request_body_limit(config: &Config) -> usize {
    let per_file = usize::try_from(config.max_file_size_bytes()).unwrap_or(usize::MAX);
    per_file
        .saturating_mul(2)
        .saturating_add(FORM_OVERHEAD_BYTES)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}

async fn route_not_found() -> HttpAppError {
    HttpAppError(AppError::NotFound("Route not found".to_string()))
}
