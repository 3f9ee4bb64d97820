//! Shared services.

pub mod email;

pub use email::{ContactMailer, EmailService};
