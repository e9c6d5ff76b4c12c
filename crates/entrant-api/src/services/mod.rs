pub mod contact;
pub mod notifier;
pub mod submission;

pub use contact::ContactService;
pub use notifier::{notifier_from_config, EmailNotifier, LogNotifier, Notifier};
pub use submission::{SubmissionService, UploadedFile};
