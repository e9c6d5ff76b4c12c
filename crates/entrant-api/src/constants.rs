//! Shared constants

/// Prefix for every API route
pub const API_PREFIX: &str = "/api";

/// Cache lifetime for stored files; uploads are immutable once written
pub const FILE_CACHE_CONTROL: &str = "public, max-age=31536000";

/// Room for form fields and multipart framing on top of the two file slots
pub const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;
