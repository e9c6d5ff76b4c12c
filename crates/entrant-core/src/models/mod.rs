pub mod contact;
pub mod file;
pub mod registration;

pub use contact::{ContactForm, ContactRequest, ContactSubject, ContactSubmission};
pub use file::{FileMetadata, FileSlot, ResourceKind};
pub use registration::{AgeGroup, Experience, Registration, RegistrationForm};
