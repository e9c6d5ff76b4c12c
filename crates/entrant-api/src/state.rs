//! Application state shared by all handlers.

use crate::repository::RegistrationRepository;
use crate::services::contact::ContactService;
use crate::services::submission::SubmissionService;
use entrant_core::Config;
use entrant_storage::StorageService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<StorageService>,
    pub registrations: Arc<dyn RegistrationRepository>,
    pub submissions: SubmissionService,
    pub contacts: ContactService,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Arc<StorageService>,
        registrations: Arc<dyn RegistrationRepository>,
        submissions: SubmissionService,
        contacts: ContactService,
    ) -> Self {
        Self {
            config,
            storage,
            registrations,
            submissions,
            contacts,
        }
    }
}
