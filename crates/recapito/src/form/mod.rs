//! Contact form API: field definitions, anti-spam, validation,
//! rendering, and submission processing.
//!
//! The flow per request: settings supply the field list; the compiler
//! turns it (plus anti-spam settings) into rules; the engine validates
//! the submitted input; the processor branches on the outcome and runs
//! the success side effects; the renderer turns the per-field result map
//! back into markup.

pub mod antispam;
pub mod render;
pub mod service;
pub mod types;
pub mod validate;

pub use antispam::{AntiSpamConfig, HONEYPOT_FIELD, TIMESTAMP_FIELD, decode_token, encode_timestamp};
pub use render::{Attributes, FormRenderer};
pub use service::{Mailer, MessageStore, SubmissionOutcome, SubmissionProcessor, SuccessResponse};
pub use types::{FieldDefinition, FieldTypeSpec, FieldValue, SubmissionResults, ValidationRule, field_type};
pub use validate::{CompiledRules, RuleEngine, ValidationEngine, compile};
