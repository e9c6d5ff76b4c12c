//! Service initialization and application state setup

use crate::error::configure_error_details;
use crate::repository::{
    ContactRepository, InMemoryContactRepository, InMemoryRegistrationRepository,
    RegistrationRepository,
};
use crate::services::{notifier_from_config, ContactService, Notifier, SubmissionService};
use crate::state::AppState;
use entrant_core::validation::FileValidator;
use entrant_core::Config;
use entrant_storage::StorageService;
use std::sync::Arc;

/// Wire repositories and services for a running server
pub fn initialize_services(config: &Config, storage: Arc<StorageService>) -> Arc<AppState> {
    let registrations: Arc<dyn RegistrationRepository> =
        Arc::new(InMemoryRegistrationRepository::new());
    let contacts: Arc<dyn ContactRepository> = Arc::new(InMemoryContactRepository::new());
    let notifier = notifier_from_config(config);

    build_state(config, storage, registrations, contacts, notifier)
}

/// Assemble application state from already-built parts.
pub fn build_state(
    config: &Config,
    storage: Arc<StorageService>,
    registrations: Arc<dyn RegistrationRepository>,
    contacts: Arc<dyn ContactRepository>,
    notifier: Arc<dyn Notifier>,
) -> Arc<AppState> {
    configure_error_details(config);

    let validator = FileValidator::new(config.max_file_size_bytes());
    let submissions = SubmissionService::new(
        storage.clone(),
        registrations.clone(),
        notifier.clone(),
        validator,
    );
    let contacts = ContactService::new(contacts, notifier);

    Arc::new(AppState::new(
        config.clone(),
        storage,
        registrations,
        submissions,
        contacts,
    ))
}
