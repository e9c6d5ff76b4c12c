pub mod contact;
pub mod files;
pub mod health;
pub mod registrations;
