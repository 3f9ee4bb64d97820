//! Form settings loaded from a YAML file.
//!
//! Everything the form does is driven by this read-only structure: the
//! field list, CSS classes, button text, user-facing messages, anti-spam
//! knobs, and the AJAX/asset toggles. Every optional value has a built-in
//! default so a minimal settings file only needs the field list.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::form::antispam::{HONEYPOT_FIELD, TIMESTAMP_FIELD};
use crate::form::types::{FieldDefinition, field_type};

/// Default CSS class for the form element.
pub const DEFAULT_FORM_CSS: &str = "contact-form";

/// Default CSS class for field wrapper elements.
pub const DEFAULT_WRAPPER_CSS: &str = "form-group";

/// Default CSS class for field elements.
pub const DEFAULT_FIELD_CSS: &str = "form-control";

/// Default form-level error banner.
pub const DEFAULT_ERROR_MSG: &str =
    "The form could not be sent. Please check the highlighted fields.";

/// Default success banner.
pub const DEFAULT_SUCCESS_MSG: &str = "Thank you, your message has been sent.";

/// Default submit button text.
pub const DEFAULT_SEND_BTN_TEXT: &str = "Send";

/// Default submit button CSS class.
pub const DEFAULT_SEND_BTN_CSS: &str = "btn btn-primary";

/// Default minimum seconds between form render and submission.
pub const DEFAULT_ANTISPAM_DELAY_SECS: i64 = 5;

/// Default label for the honeypot field.
pub const DEFAULT_ANTISPAM_LABEL: &str = "Leave this field empty";

/// Default message shown next to a tripped honeypot field.
pub const DEFAULT_ANTISPAM_ERROR_MSG: &str = "Anti-spam protection was triggered.";

/// Default message for submissions that arrive faster than the delay.
pub const DEFAULT_ANTISPAM_DELAY_ERROR_MSG: &str =
    "The form was submitted too quickly. Please wait a moment and try again.";

/// Default subject for the notification email.
pub const DEFAULT_NOTIFICATION_SUBJECT: &str = "New contact form message";

/// Default subject for the auto-reply email.
pub const DEFAULT_AUTOREPLY_SUBJECT: &str = "Thank you for your message";

/// Default body for the auto-reply email.
pub const DEFAULT_AUTOREPLY_TEXT: &str =
    "Thank you for your message. We will get back to you as soon as possible.";

/// Complete form configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FormSettings {
    /// Ordered field list.
    #[serde(default)]
    pub form_fields: Vec<FieldDefinition>,

    /// CSS class for the form element.
    #[serde(default)]
    pub form_css_class: Option<String>,

    /// Form-level error banner override.
    #[serde(default)]
    pub form_error_msg: Option<String>,

    /// Success banner override.
    #[serde(default)]
    pub form_success_msg: Option<String>,

    /// Allow asynchronous (non-reloading) submission.
    #[serde(default)]
    pub form_allow_ajax: bool,

    /// Allow a native confirmation prompt before submitting.
    #[serde(default)]
    pub form_allow_confirm_msg: bool,

    /// Confirmation prompt text; only used when allowed and set.
    #[serde(default)]
    pub form_send_confirm_msg: Option<String>,

    /// Submit button text override.
    #[serde(default)]
    pub send_btn_text: Option<String>,

    /// Submit button CSS class override.
    #[serde(default)]
    pub send_btn_css_class: Option<String>,

    /// Enable the honeypot + time-delay anti-spam checks.
    #[serde(default = "default_true")]
    pub add_antispam: bool,

    /// Minimum seconds between render and submission.
    #[serde(default)]
    pub antispam_delay: Option<i64>,

    /// Honeypot label override.
    #[serde(default)]
    pub antispam_label: Option<String>,

    /// Honeypot error message override.
    #[serde(default)]
    pub antispam_error_msg: Option<String>,

    /// Time-delay error message override.
    #[serde(default)]
    pub antispam_delay_error_msg: Option<String>,

    /// Master switch for injecting CSS/JS assets into the page.
    #[serde(default)]
    pub add_assets: bool,

    /// Inject CSS assets (when `add_assets` is on).
    #[serde(default)]
    pub add_css_assets: bool,

    /// Inject JS assets (when `add_assets` is on).
    #[serde(default)]
    pub add_js_assets: bool,

    /// CSS asset URLs to inject.
    #[serde(default)]
    pub css_assets: Vec<String>,

    /// JS asset URLs to inject.
    #[serde(default)]
    pub js_assets: Vec<String>,

    /// Address that receives the notification email. Notifications are
    /// skipped when unset.
    #[serde(default)]
    pub notification_address: Option<String>,

    /// Notification subject override.
    #[serde(default)]
    pub notification_subject: Option<String>,

    /// Name of the form field holding the submitter's address, used for
    /// the auto-reply. The auto-reply is skipped when the field is
    /// missing or empty.
    #[serde(default = "default_email_field")]
    pub autoreply_address_field: String,

    /// Auto-reply subject override.
    #[serde(default)]
    pub autoreply_subject: Option<String>,

    /// Auto-reply body override.
    #[serde(default)]
    pub autoreply_text: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_email_field() -> String {
    "email".to_string()
}

impl FormSettings {
    /// Load and validate settings from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read form settings from {}", path.display()))?;

        let settings: Self = serde_yml::from_str(&contents)
            .with_context(|| format!("failed to parse form settings from {}", path.display()))?;

        settings.validate()?;

        Ok(settings)
    }

    /// Check structural invariants of the field list.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for field in &self.form_fields {
            if field.name.is_empty() {
                bail!("form field with empty name");
            }

            if field.name == HONEYPOT_FIELD || field.name == TIMESTAMP_FIELD {
                bail!("form field name '{}' is reserved for anti-spam", field.name);
            }

            if !seen.insert(field.name.as_str()) {
                bail!("duplicate form field name '{}'", field.name);
            }

            if field_type(&field.field_type).is_none() {
                bail!(
                    "form field '{}' has unknown type '{}'",
                    field.name,
                    field.field_type
                );
            }
        }

        Ok(())
    }

    /// An empty settings object with defaults, useful as a base in tests.
    pub fn empty() -> Self {
        Self {
            form_fields: Vec::new(),
            form_css_class: None,
            form_error_msg: None,
            form_success_msg: None,
            form_allow_ajax: false,
            form_allow_confirm_msg: false,
            form_send_confirm_msg: None,
            send_btn_text: None,
            send_btn_css_class: None,
            add_antispam: true,
            antispam_delay: None,
            antispam_label: None,
            antispam_error_msg: None,
            antispam_delay_error_msg: None,
            add_assets: false,
            add_css_assets: false,
            add_js_assets: false,
            css_assets: Vec::new(),
            js_assets: Vec::new(),
            notification_address: None,
            notification_subject: None,
            autoreply_address_field: default_email_field(),
            autoreply_subject: None,
            autoreply_text: None,
        }
    }

    /// Form element CSS class, configured or default.
    pub fn form_css(&self) -> &str {
        self.form_css_class.as_deref().unwrap_or(DEFAULT_FORM_CSS)
    }

    /// Form-level error banner, configured or default.
    pub fn error_msg(&self) -> &str {
        self.form_error_msg.as_deref().unwrap_or(DEFAULT_ERROR_MSG)
    }

    /// Success banner, configured or default.
    pub fn success_msg(&self) -> &str {
        self.form_success_msg
            .as_deref()
            .unwrap_or(DEFAULT_SUCCESS_MSG)
    }

    /// Submit button text, configured or default.
    pub fn send_btn_text(&self) -> &str {
        self.send_btn_text
            .as_deref()
            .unwrap_or(DEFAULT_SEND_BTN_TEXT)
    }

    /// Submit button CSS class, configured or default.
    pub fn send_btn_css(&self) -> &str {
        self.send_btn_css_class
            .as_deref()
            .unwrap_or(DEFAULT_SEND_BTN_CSS)
    }

    /// Anti-spam delay in seconds, configured or default.
    pub fn antispam_delay_seconds(&self) -> i64 {
        self.antispam_delay.unwrap_or(DEFAULT_ANTISPAM_DELAY_SECS)
    }

    /// Honeypot label, configured or default.
    pub fn antispam_label(&self) -> &str {
        self.antispam_label
            .as_deref()
            .unwrap_or(DEFAULT_ANTISPAM_LABEL)
    }

    /// Honeypot error message, configured or default.
    pub fn antispam_error_msg(&self) -> &str {
        self.antispam_error_msg
            .as_deref()
            .unwrap_or(DEFAULT_ANTISPAM_ERROR_MSG)
    }

    /// Time-delay error message, configured or default.
    pub fn antispam_delay_error_msg(&self) -> &str {
        self.antispam_delay_error_msg
            .as_deref()
            .unwrap_or(DEFAULT_ANTISPAM_DELAY_ERROR_MSG)
    }

    /// Notification subject, configured or default.
    pub fn notification_subject(&self) -> &str {
        self.notification_subject
            .as_deref()
            .unwrap_or(DEFAULT_NOTIFICATION_SUBJECT)
    }

    /// Auto-reply subject, configured or default.
    pub fn autoreply_subject(&self) -> &str {
        self.autoreply_subject
            .as_deref()
            .unwrap_or(DEFAULT_AUTOREPLY_SUBJECT)
    }

    /// Auto-reply body, configured or default.
    pub fn autoreply_text(&self) -> &str {
        self.autoreply_text
            .as_deref()
            .unwrap_or(DEFAULT_AUTOREPLY_TEXT)
    }
}
