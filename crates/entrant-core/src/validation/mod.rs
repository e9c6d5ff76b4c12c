//! Upload validation

pub mod file;
pub mod filename;

pub use file::{FileValidationError, FileValidator, ALLOWED_CONTENT_TYPES};
pub use filename::{file_extension, sanitize_filename};
