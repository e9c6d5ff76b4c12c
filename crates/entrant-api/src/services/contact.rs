//! Contact form messages: stored first, then forwarded to the admin inbox in
//! the background.

use crate::repository::ContactRepository;
use crate::services::notifier::Notifier;
use entrant_core::models::{ContactForm, ContactSubmission};
use entrant_core::AppError;
use std::sync::Arc;

#[derive(Clone)]
pub struct ContactService {
    repository: Arc<dyn ContactRepository>,
    notifier: Arc<dyn Notifier>,
}

impl ContactService {
    pub fn new(repository: Arc<dyn ContactRepository>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    #[tracing::instrument(skip_all, fields(email = %form.email, subject = %form.subject))]
    pub async fn submit(&self, form: ContactForm) -> Result<ContactSubmission, AppError> {
        let submission = ContactSubmission::from_form(form);
        self.repository.save(&submission).await?;
        tracing::info!(contact_id = %submission.id, "Contact submission created");

        let notifier = Arc::clone(&self.notifier);
        let snapshot = submission.clone();
        tokio::spawn(async move {
            let sent = notifier.notify_contact(&snapshot).await;
            tracing::info!(contact_id = %snapshot.id, sent, "Contact notification processed");
        });

        Ok(submission)
    }

    /// One page of messages, newest first, plus the total count
    pub async fn list(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<ContactSubmission>, usize), AppError> {
        let data = self.repository.find_page(offset, limit).await?;
        let total = self.repository.count().await?;
        Ok((data, total))
    }
}
