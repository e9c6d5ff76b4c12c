//! Entrant API Library
//!
//! HTTP surface for competition registrations: multipart intake, proxy
//! downloads of stored files, and application setup.

mod api_doc;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod repository;
pub mod services;
pub mod setup;
pub mod state;
mod telemetry;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
