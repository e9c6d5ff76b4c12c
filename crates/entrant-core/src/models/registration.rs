use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::file::{FileMetadata, FileSlot};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AgeGroup {
    #[serde(rename = "8-10")]
    EightToTen,
    #[serde(rename = "11-13")]
    ElevenToThirteen,
    #[serde(rename = "14-17")]
    FourteenToSeventeen,
}

impl AgeGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::EightToTen => "8-10",
            AgeGroup::ElevenToThirteen => "11-13",
            AgeGroup::FourteenToSeventeen => "14-17",
        }
    }
}

impl FromStr for AgeGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "8-10" => Ok(AgeGroup::EightToTen),
            "11-13" => Ok(AgeGroup::ElevenToThirteen),
            "14-17" => Ok(AgeGroup::FourteenToSeventeen),
            other => Err(format!("{} is not a valid age group", other)),
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Experience {
    Beginner,
    Intermediate,
    Advanced,
}

impl FromStr for Experience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Experience::Beginner),
            "intermediate" => Ok(Experience::Intermediate),
            "advanced" => Ok(Experience::Advanced),
            other => Err(format!("{} is not a valid experience level", other)),
        }
    }
}

impl fmt::Display for Experience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Experience::Beginner => "beginner",
            Experience::Intermediate => "intermediate",
            Experience::Advanced => "advanced",
        };
        f.write_str(s)
    }
}

fn must_agree(value: &bool) -> Result<(), ValidationError> {
    if *value {
        Ok(())
    } else {
        let mut err = ValidationError::new("must_agree");
        err.message = Some("Must agree to terms and conditions".into());
        Err(err)
    }
}

/// Text fields of the registration form, validated before anything is persisted.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub age: AgeGroup,
    #[validate(length(min = 1, max = 200, message = "School name must be 1-200 characters"))]
    pub school: String,
    #[validate(length(min = 1, max = 100, message = "Parent name must be 1-100 characters"))]
    pub parent_name: String,
    #[validate(email(message = "Invalid parent email address"))]
    pub parent_email: String,
    pub category: AgeGroup,
    pub experience: Experience,
    #[validate(custom(function = "must_agree"))]
    pub agree_terms: bool,
    #[serde(default)]
    pub agree_newsletter: bool,
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" | "" => Some(false),
        _ => None,
    }
}

impl RegistrationForm {
    /// Build and validate the form from multipart text fields.
    ///
    /// Strings are trimmed and email addresses lowercased.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, AppError> {
        let text = |name: &str| -> String {
            fields
                .get(name)
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        let required = |name: &str, label: &str| -> Result<String, AppError> {
            let value = text(name);
            if value.is_empty() {
                return Err(AppError::InvalidInput(format!("{} is required", label)));
            }
            Ok(value)
        };
        let flag = |name: &str, label: &str| -> Result<bool, AppError> {
            parse_bool(&text(name))
                .ok_or_else(|| AppError::InvalidInput(format!("{} must be boolean", label)))
        };

        let form = RegistrationForm {
            first_name: required("firstName", "First name")?,
            last_name: required("lastName", "Last name")?,
            email: required("email", "Email")?.to_lowercase(),
            age: required("age", "Age group")?
                .parse()
                .map_err(AppError::InvalidInput)?,
            school: required("school", "School name")?,
            parent_name: required("parentName", "Parent/Guardian name")?,
            parent_email: required("parentEmail", "Parent/Guardian email")?.to_lowercase(),
            category: required("category", "Category")?
                .parse()
                .map_err(AppError::InvalidInput)?,
            experience: required("experience", "Experience level")?
                .parse()
                .map_err(AppError::InvalidInput)?,
            agree_terms: flag("agreeTerms", "Terms agreement")?,
            agree_newsletter: flag("agreeNewsletter", "Newsletter agreement")?,
        };

        form.validate()?;
        Ok(form)
    }
}

/// A competition registration and its two optional file slots.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: AgeGroup,
    pub school: String,
    pub parent_name: String,
    pub parent_email: String,
    pub category: AgeGroup,
    pub experience: Experience,
    pub agree_terms: bool,
    pub agree_newsletter: bool,
    pub submission_file: Option<FileMetadata>,
    /// Proxy download URL for the submission file
    pub submission_file_url: Option<String>,
    pub payment_proof_file: Option<FileMetadata>,
    pub payment_proof_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    pub fn from_form(form: RegistrationForm) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            first_name: form.first_name,
            last_name: form.last_name,
            email: form.email,
            age: form.age,
            school: form.school,
            parent_name: form.parent_name,
            parent_email: form.parent_email,
            category: form.category,
            experience: form.experience,
            agree_terms: form.agree_terms,
            agree_newsletter: form.agree_newsletter,
            submission_file: None,
            submission_file_url: None,
            payment_proof_file: None,
            payment_proof_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn file(&self, slot: FileSlot) -> Option<&FileMetadata> {
        match slot {
            FileSlot::Submission => self.submission_file.as_ref(),
            FileSlot::Payment => self.payment_proof_file.as_ref(),
        }
    }

    pub fn file_url(&self, slot: FileSlot) -> Option<&str> {
        match slot {
            FileSlot::Submission => self.submission_file_url.as_deref(),
            FileSlot::Payment => self.payment_proof_url.as_deref(),
        }
    }

    /// Attach stored file metadata and its proxy URL to a slot.
    pub fn attach_file(&mut self, slot: FileSlot, metadata: FileMetadata) {
        let url = slot.download_path(&self.id.to_string());
        match slot {
            FileSlot::Submission => {
                self.submission_file = Some(metadata);
                self.submission_file_url = Some(url);
            }
            FileSlot::Payment => {
                self.payment_proof_file = Some(metadata);
                self.payment_proof_url = Some(url);
            }
        }
        self.updated_at = Utc::now();
    }
}
