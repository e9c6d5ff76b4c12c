use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ContactSubject {
    CompetitionRules,
    SubmissionHelp,
    TechnicalSupport,
    Prizes,
    GeneralQuestion,
    Other,
}

impl ContactSubject {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactSubject::CompetitionRules => "competition-rules",
            ContactSubject::SubmissionHelp => "submission-help",
            ContactSubject::TechnicalSupport => "technical-support",
            ContactSubject::Prizes => "prizes",
            ContactSubject::GeneralQuestion => "general-question",
            ContactSubject::Other => "other",
        }
    }

    /// Label used in the admin email subject line
    pub fn label(&self) -> &'static str {
        match self {
            ContactSubject::CompetitionRules => "Competition Rules",
            ContactSubject::SubmissionHelp => "Submission Help",
            ContactSubject::TechnicalSupport => "Technical Support",
            ContactSubject::Prizes => "Prizes & Awards",
            ContactSubject::GeneralQuestion => "General Question",
            ContactSubject::Other => "Other",
        }
    }
}

impl FromStr for ContactSubject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "competition-rules" => Ok(ContactSubject::CompetitionRules),
            "submission-help" => Ok(ContactSubject::SubmissionHelp),
            "technical-support" => Ok(ContactSubject::TechnicalSupport),
            "prizes" => Ok(ContactSubject::Prizes),
            "general-question" => Ok(ContactSubject::GeneralQuestion),
            "other" => Ok(ContactSubject::Other),
            other => Err(format!("{} is not a valid subject", other)),
        }
    }
}

impl fmt::Display for ContactSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw JSON body of the contact form. Every field is optional here so that
/// missing values surface as validation errors rather than body rejections.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Integer or numeric string
    #[schema(value_type = Option<u8>)]
    pub age: Option<serde_json::Value>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Validate)]
pub struct ContactForm {
    #[validate(length(min = 1, max = 100, message = "Name too long"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(range(min = 8, max = 17, message = "Age must be between 8 and 17"))]
    pub age: u64,
    pub subject: ContactSubject,
    #[validate(length(
        min = 10,
        max = 5000,
        message = "Message must be between 10 and 5000 characters"
    ))]
    pub message: String,
}

fn parse_age(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl ContactForm {
    /// Trim, normalize and validate a contact request.
    pub fn from_request(request: ContactRequest) -> Result<Self, AppError> {
        let required = |value: Option<String>, label: &str| -> Result<String, AppError> {
            let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
            if value.is_empty() {
                return Err(AppError::InvalidInput(format!("{} is required", label)));
            }
            Ok(value)
        };

        let age = match request.age {
            None | Some(serde_json::Value::Null) => {
                return Err(AppError::InvalidInput("Age is required".to_string()))
            }
            Some(value) => parse_age(&value).ok_or_else(|| {
                AppError::InvalidInput("Age must be between 8 and 17".to_string())
            })?,
        };

        let form = ContactForm {
            name: required(request.name, "Name")?,
            email: required(request.email, "Email")?.to_lowercase(),
            age,
            subject: required(request.subject, "Subject")?
                .parse()
                .map_err(AppError::InvalidInput)?,
            message: required(request.message, "Message")?,
        };

        form.validate()?;
        Ok(form)
    }
}

/// A stored contact form message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Stored as text, e.g. "12"
    pub age: String,
    pub subject: ContactSubject,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContactSubmission {
    pub fn from_form(form: ContactForm) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: form.name,
            email: form.email,
            age: form.age.to_string(),
            subject: form.subject,
            message: form.message,
            created_at: now,
            updated_at: now,
        }
    }
}
