//! Registration confirmation and contact form emails.
//!
//! After a registration is stored the student, the parent and the organisers
//! each get a plain-text confirmation. Contact form messages go to the
//! organisers only. Delivery runs in a background task and its outcome never
//! reaches the HTTP response.

use async_trait::async_trait;
use entrant_core::models::{ContactSubmission, FileSlot, Registration};
use entrant_core::Config;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use std::time::Duration;

const SENDER_NAME: &str = "Kids Web Design Competition";

/// Delivery outcome per recipient group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationReport {
    pub student: bool,
    pub parent: bool,
    pub admin: bool,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, registration: &Registration) -> NotificationReport;

    /// Forward a contact message to the admin inbox. Returns whether it was sent.
    async fn notify_contact(&self, submission: &ContactSubmission) -> bool;
}

/// Used when SMTP is not configured. Logs what would have been sent.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, registration: &Registration) -> NotificationReport {
        tracing::info!(
            registration_id = %registration.id,
            email = %registration.email,
            parent_email = %registration.parent_email,
            "SMTP not configured, skipping confirmation emails"
        );
        NotificationReport::default()
    }

    async fn notify_contact(&self, submission: &ContactSubmission) -> bool {
        tracing::info!(
            contact_id = %submission.id,
            email = %submission.email,
            subject = %submission.subject,
            "SMTP not configured, skipping contact notification"
        );
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub body: String,
}

/// Human-readable byte count ("2.5 MB")
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "N/A".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

/// Text content of the three confirmation emails
#[derive(Debug, Clone)]
pub struct ConfirmationTemplates {
    pub public_base_url: String,
    pub competition_year: u16,
    pub admin_email: Option<String>,
}

impl ConfirmationTemplates {
    pub fn from_config(config: &Config) -> Self {
        Self {
            public_base_url: config.public_base_url().to_string(),
            competition_year: config.competition_year(),
            admin_email: config.admin_email().map(String::from),
        }
    }

    fn file_lines(&self, registration: &Registration) -> String {
        let mut lines = String::new();
        for slot in FileSlot::ALL {
            let (Some(file), Some(url)) = (registration.file(slot), registration.file_url(slot))
            else {
                continue;
            };
            lines.push_str(&format!(
                "{}: {} ({})\n  {}{}\n",
                capitalize(slot.label()),
                file.display_name,
                format_file_size(file.size_bytes),
                self.public_base_url,
                url
            ));
        }
        if lines.is_empty() {
            lines.push_str("No file was attached to this registration.\n");
        }
        lines
    }

    fn summary(&self, registration: &Registration) -> String {
        format!(
            "Registration ID: {}\nName: {}\nEmail: {}\nSchool: {}\nCategory: {}\nExperience: {}\nRegistered: {}\n",
            registration.id,
            registration.full_name(),
            registration.email,
            registration.school,
            registration.category,
            capitalize(&registration.experience.to_string()),
            registration.created_at.format("%B %-d, %Y %H:%M UTC"),
        )
    }

    pub fn student(&self, registration: &Registration) -> OutgoingEmail {
        OutgoingEmail {
            to: registration.email.clone(),
            reply_to: None,
            subject: format!(
                "Welcome to the Kids Web Design Competition {}!",
                self.competition_year
            ),
            body: format!(
                "Hi {},\n\nThanks for registering for the Kids Web Design Competition {}.\n\n{}\n{}",
                registration.first_name,
                self.competition_year,
                self.summary(registration),
                self.file_lines(registration)
            ),
        }
    }

    pub fn parent(&self, registration: &Registration) -> OutgoingEmail {
        OutgoingEmail {
            to: registration.parent_email.clone(),
            reply_to: None,
            subject: format!(
                "Your Child's Registration Confirmed - Kids Web Design Competition {}",
                self.competition_year
            ),
            body: format!(
                "Dear {},\n\n{} has been registered for the Kids Web Design Competition {}.\n\n{}\n{}",
                registration.parent_name,
                registration.full_name(),
                self.competition_year,
                self.summary(registration),
                self.file_lines(registration)
            ),
        }
    }

    pub fn admin(&self, registration: &Registration) -> Option<OutgoingEmail> {
        let to = self.admin_email.clone()?;
        Some(OutgoingEmail {
            to,
            reply_to: None,
            subject: format!(
                "New Registration: {} ({})",
                registration.full_name(),
                registration.category
            ),
            body: format!(
                "A new registration was received.\n\n{}Parent: {} <{}>\nNewsletter: {}\n\n{}",
                self.summary(registration),
                registration.parent_name,
                registration.parent_email,
                if registration.agree_newsletter { "yes" } else { "no" },
                self.file_lines(registration)
            ),
        })
    }

    /// Admin copy of a contact message; replies go straight to the sender
    pub fn contact_admin(&self, submission: &ContactSubmission) -> Option<OutgoingEmail> {
        let to = self.admin_email.clone()?;
        Some(OutgoingEmail {
            to,
            reply_to: Some(submission.email.clone()),
            subject: format!(
                "Contact Form: {} - {}",
                submission.subject.label(),
                submission.name
            ),
            body: format!(
                "A new contact form message was received.\n\nID: {}\nName: {}\nEmail: {}\nAge: {}\nSubject: {}\nSubmitted: {}\n\n{}\n",
                submission.id,
                submission.name,
                submission.email,
                submission.age,
                submission.subject.label(),
                submission.created_at.format("%B %-d, %Y %H:%M UTC"),
                submission.message
            ),
        })
    }
}

fn capitalize(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// SMTP delivery with retry and exponential backoff (2s, 4s, 8s, ...)
#[derive(Clone)]
pub struct EmailNotifier {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
    templates: ConfirmationTemplates,
    max_retries: u32,
}

impl EmailNotifier {
    /// Returns `None` when SMTP is not configured or the sender is invalid.
    pub fn from_config(config: &Config) -> Option<Self> {
        let host = config.smtp_host()?;
        let mut from: Mailbox = match config.smtp_from()?.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid SMTP_FROM, confirmation emails disabled");
                return None;
            }
        };
        if from.name.is_none() {
            from.name = Some(SENDER_NAME.to_string());
        }
        let port = config.smtp_port();
        let credentials = match (config.smtp_user(), config.smtp_password()) {
            (Some(u), Some(p)) => Some(Credentials::new(u.to_string(), p.to_string())),
            _ => None,
        };

        let mailer = if config.smtp_tls() {
            let b = match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host) {
                Ok(b) => b.port(port),
                Err(e) => {
                    tracing::warn!(host = %host, error = %e, "Failed to set up SMTP relay");
                    return None;
                }
            };
            let b = match credentials {
                Some(c) => b.credentials(c),
                None => b,
            };
            tracing::info!(host = %host, port = port, "Email notifier initialized (SMTP with STARTTLS)");
            b.build()
        } else {
            let b = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port);
            let b = match credentials {
                Some(c) => b.credentials(c),
                None => b,
            };
            tracing::info!(host = %host, port = port, "Email notifier initialized (SMTP)");
            b.build()
        };

        Some(Self {
            mailer: Arc::new(mailer),
            from,
            templates: ConfirmationTemplates::from_config(config),
            max_retries: config.email_max_retries().max(1),
        })
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message, String> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| format!("Invalid recipient {}: {}", email.to, e))?;
        let mut builder = Message::builder().from(self.from.clone()).to(to);
        if let Some(reply_to) = &email.reply_to {
            let reply_to: Mailbox = reply_to
                .parse()
                .map_err(|e| format!("Invalid reply-to {}: {}", reply_to, e))?;
            builder = builder.reply_to(reply_to);
        }
        builder
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| e.to_string())
    }

    async fn send_with_retry(&self, email: &OutgoingEmail) -> bool {
        let message = match self.build_message(email) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(to = %email.to, error = %e, "Failed to build email");
                return false;
            }
        };

        for attempt in 1..=self.max_retries {
            match self.mailer.send(message.clone()).await {
                Ok(_) => {
                    tracing::info!(to = %email.to, attempt, "Email sent");
                    return true;
                }
                Err(e) => {
                    tracing::warn!(
                        to = %email.to,
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "Email send attempt failed"
                    );
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                    }
                }
            }
        }

        tracing::error!(to = %email.to, "All email send attempts failed");
        false
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, registration: &Registration) -> NotificationReport {
        let student = self
            .send_with_retry(&self.templates.student(registration))
            .await;
        let parent = self
            .send_with_retry(&self.templates.parent(registration))
            .await;
        let admin = match self.templates.admin(registration) {
            Some(email) => self.send_with_retry(&email).await,
            None => {
                tracing::debug!("ADMIN_EMAIL not set, skipping admin notification");
                false
            }
        };

        NotificationReport {
            student,
            parent,
            admin,
        }
    }

    async fn notify_contact(&self, submission: &ContactSubmission) -> bool {
        match self.templates.contact_admin(submission) {
            Some(email) => self.send_with_retry(&email).await,
            None => {
                tracing::warn!(
                    contact_id = %submission.id,
                    "ADMIN_EMAIL not set, contact message was stored but not forwarded"
                );
                false
            }
        }
    }
}

/// Pick the email notifier when SMTP is configured, otherwise log only
pub fn notifier_from_config(config: &Config) -> Arc<dyn Notifier> {
    match EmailNotifier::from_config(config) {
        Some(notifier) => Arc::new(notifier),
        None => Arc::new(LogNotifier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use entrant_core::models::{
        AgeGroup, ContactForm, ContactSubject, Experience, FileMetadata, RegistrationForm,
        ResourceKind,
    };
    use entrant_core::StorageBackend;

    fn registration() -> Registration {
        Registration::from_form(RegistrationForm {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            age: AgeGroup::ElevenToThirteen,
            school: "Analytical Academy".to_string(),
            parent_name: "Anne Byron".to_string(),
            parent_email: "anne@example.com".to_string(),
            category: AgeGroup::ElevenToThirteen,
            experience: Experience::Intermediate,
            agree_terms: true,
            agree_newsletter: true,
        })
    }

    fn templates(admin: Option<&str>) -> ConfirmationTemplates {
        ConfirmationTemplates {
            public_base_url: "https://entries.example.org".to_string(),
            competition_year: 2025,
            admin_email: admin.map(String::from),
        }
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "N/A");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("intermediate"), "Intermediate");
        assert_eq!(capitalize("payment screenshot"), "Payment Screenshot");
    }

    #[test]
    fn test_emails_link_proxy_url_not_storage_key() {
        let mut r = registration();
        r.attach_file(
            FileSlot::Submission,
            FileMetadata {
                provider: StorageBackend::Remote,
                storage_key: "kids-competition/secret-asset-id".to_string(),
                display_name: "site.zip".to_string(),
                size_bytes: 2048,
                content_type: "application/zip".to_string(),
                uploaded_at: Utc::now(),
                resource_kind: ResourceKind::Raw,
            },
        );

        let email = templates(None).student(&r);
        assert_eq!(email.to, "ada@example.com");
        assert!(email.subject.contains("2025"));
        assert!(email
            .body
            .contains(&format!("https://entries.example.org/api/files/{}/download", r.id)));
        assert!(email.body.contains("site.zip (2 KB)"));
        assert!(!email.body.contains("secret-asset-id"));
    }

    #[test]
    fn test_parent_and_admin_emails() {
        let r = registration();
        let t = templates(Some("admin@example.org"));

        let parent = t.parent(&r);
        assert_eq!(parent.to, "anne@example.com");
        assert!(parent.body.contains("Ada Lovelace"));
        assert!(parent.body.contains("No file was attached"));

        let admin = t.admin(&r).unwrap();
        assert_eq!(admin.to, "admin@example.org");
        assert_eq!(admin.subject, "New Registration: Ada Lovelace (11-13)");

        assert!(templates(None).admin(&r).is_none());
    }

    fn contact() -> ContactSubmission {
        ContactSubmission::from_form(ContactForm {
            name: "Grace Hopper".to_string(),
            email: "grace@example.com".to_string(),
            age: 14,
            subject: ContactSubject::Prizes,
            message: "Are there prizes for every age group?".to_string(),
        })
    }

    #[test]
    fn test_contact_admin_email() {
        let c = contact();
        let email = templates(Some("admin@example.org")).contact_admin(&c).unwrap();
        assert_eq!(email.to, "admin@example.org");
        assert_eq!(email.reply_to.as_deref(), Some("grace@example.com"));
        assert_eq!(email.subject, "Contact Form: Prizes & Awards - Grace Hopper");
        assert!(email.body.contains("Age: 14"));
        assert!(email.body.contains("Are there prizes for every age group?"));

        assert!(templates(None).contact_admin(&c).is_none());
    }

    #[tokio::test]
    async fn test_log_notifier_reports_nothing_sent() {
        let report = LogNotifier.notify(&registration()).await;
        assert_eq!(report, NotificationReport::default());
        assert!(!LogNotifier.notify_contact(&contact()).await);
    }

    #[test]
    fn test_without_smtp_falls_back_to_log_notifier() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert!(EmailNotifier::from_config(&config).is_none());
    }
}
