//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p entrant-api`. Files are stored on
//! local disk under a temporary directory; no network access is needed.

#![allow(dead_code)]

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use entrant_api::constants;
use entrant_api::repository::{
    ContactRepository, InMemoryContactRepository, InMemoryRegistrationRepository,
    RegistrationRepository,
};
use entrant_api::services::{LogNotifier, Notifier};
use entrant_api::setup::{routes, services};
use entrant_core::Config;
use entrant_storage::StorageService;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

/// Upload limit used by the test app
pub const TEST_MAX_FILE_SIZE: u64 = 64 * 1024;

pub const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n%%EOF\n";
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52,
];

/// API path prefix for tests.
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub registrations: Arc<dyn RegistrationRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn test_config(storage_path: &str) -> Config {
    let vars: HashMap<String, String> = [
        ("UPLOAD_PROVIDER", "local"),
        ("LOCAL_STORAGE_PATH", storage_path),
        ("ENVIRONMENT", "test"),
        ("CORS_ORIGINS", "*"),
        ("PUBLIC_BASE_URL", "http://localhost:3000"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .chain(std::iter::once((
        "MAX_FILE_SIZE_BYTES".to_string(),
        TEST_MAX_FILE_SIZE.to_string(),
    )))
    .collect();

    Config::from_lookup(|key| vars.get(key).cloned()).expect("Failed to build test config")
}

/// Setup test app with local storage and an in-memory repository.
pub async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage_path = temp_dir
        .path()
        .to_str()
        .expect("Temp dir path is not UTF-8")
        .to_string();
    let config = test_config(&storage_path);
    config.validate().expect("Test config is invalid");

    let storage = Arc::new(StorageService::new(config.clone()));
    let registrations: Arc<dyn RegistrationRepository> =
        Arc::new(InMemoryRegistrationRepository::new());
    let contacts: Arc<dyn ContactRepository> = Arc::new(InMemoryContactRepository::new());
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    let state = services::build_state(
        &config,
        storage,
        registrations.clone(),
        contacts.clone(),
        notifier,
    );
    let app = routes::setup_routes(&config, state).expect("Failed to build routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        registrations,
        contacts,
        _temp_dir: temp_dir,
    }
}

/// Registration text fields that pass validation
pub fn registration_form(email: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("firstName", "Ada")
        .add_text("lastName", "Lovelace")
        .add_text("email", email)
        .add_text("age", "11-13")
        .add_text("school", "Analytical Engine Academy")
        .add_text("parentName", "Anne Byron")
        .add_text("parentEmail", "parent@example.com")
        .add_text("category", "11-13")
        .add_text("experience", "beginner")
        .add_text("agreeTerms", "true")
        .add_text("agreeNewsletter", "false")
}

pub fn file_part(data: &[u8], file_name: &str, mime_type: &str) -> Part {
    Part::bytes(bytes::Bytes::copy_from_slice(data))
        .file_name(file_name)
        .mime_type(mime_type)
}

/// Submit a registration and return the `data` object of the response.
pub async fn create_registration(client: &TestServer, form: MultipartForm) -> serde_json::Value {
    let response = client
        .post(&api_path("/registrations"))
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), 201, "body: {}", response.text());
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    body["data"].clone()
}

/// Contact form body that passes validation
pub fn contact_body(email: &str) -> serde_json::Value {
    serde_json::json!({
        "name": "Grace Hopper",
        "email": email,
        "age": 12,
        "subject": "submission-help",
        "message": "Can I submit a zip with several pages?"
    })
}
