//! Registration and contact message persistence.
//!
//! The service only needs a handful of document-store operations, expressed by
//! [`RegistrationRepository`] and [`ContactRepository`]. The bundled
//! implementations keep records in memory for the lifetime of the process.

use async_trait::async_trait;
use entrant_core::models::{ContactSubmission, Registration};
use entrant_core::AppError;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    /// Insert or replace a registration by id
    async fn save(&self, registration: &Registration) -> Result<(), AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Registration>, AppError>;

    /// Newest first
    async fn find_page(&self, offset: usize, limit: usize) -> Result<Vec<Registration>, AppError>;

    async fn count(&self) -> Result<usize, AppError>;

    /// `email` is compared case-insensitively
    async fn exists_by_email(&self, email: &str) -> Result<bool, AppError>;
}

#[derive(Debug, Default)]
pub struct InMemoryRegistrationRepository {
    records: RwLock<HashMap<Uuid, Registration>>,
}

impl InMemoryRegistrationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistrationRepository for InMemoryRegistrationRepository {
    async fn save(&self, registration: &Registration) -> Result<(), AppError> {
        self.records
            .write()
            .await
            .insert(registration.id, registration.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Registration>, AppError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn find_page(&self, offset: usize, limit: usize) -> Result<Vec<Registration>, AppError> {
        let records = self.records.read().await;
        let mut all: Vec<&Registration> = records.values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(all.into_iter().skip(offset).take(limit).cloned().collect())
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.records.read().await.len())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, AppError> {
        let email = email.trim().to_lowercase();
        Ok(self
            .records
            .read()
            .await
            .values()
            .any(|r| r.email == email))
    }
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn save(&self, submission: &ContactSubmission) -> Result<(), AppError>;

    /// Newest first
    async fn find_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ContactSubmission>, AppError>;

    async fn count(&self) -> Result<usize, AppError>;
}

#[derive(Debug, Default)]
pub struct InMemoryContactRepository {
    records: RwLock<Vec<ContactSubmission>>,
}

impl InMemoryContactRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn save(&self, submission: &ContactSubmission) -> Result<(), AppError> {
        self.records.write().await.push(submission.clone());
        Ok(())
    }

    async fn find_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ContactSubmission>, AppError> {
        let records = self.records.read().await;
        let mut all: Vec<&ContactSubmission> = records.iter().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(all.into_iter().skip(offset).take(limit).cloned().collect())
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.records.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use entrant_core::models::{
        AgeGroup, ContactForm, ContactSubject, Experience, RegistrationForm,
    };

    fn registration(email: &str, minutes_ago: i64) -> Registration {
        let mut r = Registration::from_form(RegistrationForm {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: email.to_string(),
            age: AgeGroup::ElevenToThirteen,
            school: "Analytical Academy".to_string(),
            parent_name: "Anne".to_string(),
            parent_email: "anne@example.com".to_string(),
            category: AgeGroup::ElevenToThirteen,
            experience: Experience::Beginner,
            agree_terms: true,
            agree_newsletter: false,
        });
        r.created_at -= Duration::minutes(minutes_ago);
        r
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let repo = InMemoryRegistrationRepository::new();
        let mut r = registration("ada@example.com", 0);
        repo.save(&r).await.unwrap();

        r.school = "Updated".to_string();
        repo.save(&r).await.unwrap();

        let found = repo.find_by_id(r.id).await.unwrap().unwrap();
        assert_eq!(found.school, "Updated");
        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_page_newest_first() {
        let repo = InMemoryRegistrationRepository::new();
        let oldest = registration("a@example.com", 30);
        let middle = registration("b@example.com", 20);
        let newest = registration("c@example.com", 10);
        for r in [&middle, &oldest, &newest] {
            repo.save(r).await.unwrap();
        }

        let page = repo.find_page(0, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, newest.id);
        assert_eq!(page[1].id, middle.id);

        let page = repo.find_page(2, 2).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, oldest.id);
    }

    #[tokio::test]
    async fn test_exists_by_email_ignores_case() {
        let repo = InMemoryRegistrationRepository::new();
        repo.save(&registration("ada@example.com", 0)).await.unwrap();

        assert!(repo.exists_by_email("ADA@Example.com").await.unwrap());
        assert!(!repo.exists_by_email("grace@example.com").await.unwrap());
    }

    fn contact(minutes_ago: i64) -> ContactSubmission {
        let mut c = ContactSubmission::from_form(ContactForm {
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            age: 12,
            subject: ContactSubject::Prizes,
            message: "What are the prizes this year?".to_string(),
        });
        c.created_at -= Duration::minutes(minutes_ago);
        c
    }

    #[tokio::test]
    async fn test_contact_page_newest_first() {
        let repo = InMemoryContactRepository::new();
        let old = contact(10);
        let new = contact(1);
        repo.save(&old).await.unwrap();
        repo.save(&new).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 2);
        let page = repo.find_page(0, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, new.id);
        let page = repo.find_page(1, 5).await.unwrap();
        assert_eq!(page[0].id, old.id);
        assert!(repo.find_page(2, 5).await.unwrap().is_empty());
    }
}
