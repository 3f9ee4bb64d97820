//! Submission processing: rule compilation, validation, branching, and
//! the post-success side effects.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::error;

use crate::settings::FormSettings;

use super::antispam::{AntiSpamConfig, HONEYPOT_FIELD, TIMESTAMP_FIELD, decode_token};
use super::types::{FieldValue, SubmissionResults};
use super::validate::{ValidationEngine, compile};

/// Persists accepted submissions.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Store one accepted submission.
    async fn store(&self, data: &SubmissionResults) -> Result<()>;
}

/// Sends the two post-success emails.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send the auto-reply to the submitter.
    async fn send_autoreply(&self, data: &SubmissionResults) -> Result<()>;

    /// Send the notification to the site owner.
    async fn send_notification(&self, data: &SubmissionResults) -> Result<()>;
}

/// How the caller should answer an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessResponse {
    /// Full-page redirect, for standard submissions.
    Redirect,

    /// In-place empty-form response, for asynchronous submissions.
    ClearForm,
}

/// Terminal outcome of one submission.
#[derive(Debug)]
pub enum SubmissionOutcome {
    /// Validation failed; re-render with the result map and banner errors.
    Invalid {
        /// Ordered user-facing error lines: the form-level message, plus
        /// the delay-specific message when only the time-delay check
        /// tripped.
        errors: Vec<String>,

        /// Per-field escaped values and first error messages.
        results: SubmissionResults,
    },

    /// Validation passed and side effects ran.
    Accepted {
        /// User-facing success message.
        message: String,

        /// Per-field escaped values (no errors).
        results: SubmissionResults,

        /// Redirect or clear-form, by submission style.
        response: SuccessResponse,

        /// How many of the three side effects failed. Failures are logged
        /// and do not downgrade the outcome.
        side_effect_failures: usize,
    },
}

/// Processes one form submission per call; stateless across requests.
pub struct SubmissionProcessor {
    settings: Arc<FormSettings>,
    engine: Arc<dyn ValidationEngine>,
    store: Arc<dyn MessageStore>,
    mailer: Arc<dyn Mailer>,
}

impl SubmissionProcessor {
    /// Create a processor over the given collaborators.
    pub fn new(
        settings: Arc<FormSettings>,
        engine: Arc<dyn ValidationEngine>,
        store: Arc<dyn MessageStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            settings,
            engine,
            store,
            mailer,
        }
    }

    /// Run one full submission cycle.
    ///
    /// `asynchronous` selects the success response style; `now` is the
    /// wall-clock timestamp read once for this request.
    pub async fn process(
        &self,
        input: &BTreeMap<String, String>,
        asynchronous: bool,
        now: i64,
    ) -> SubmissionOutcome {
        let antispam = AntiSpamConfig::from_settings(&self.settings);
        let compiled = compile(&self.settings.form_fields, &antispam, now);

        // The timestamp field is validated as decoded-plus-delay against
        // `max:now`; an undecodable token is left in place so it fails
        // the numeric rule instead.
        let mut working = input.clone();
        if antispam.enabled
            && let Some(token) = input.get(TIMESTAMP_FIELD)
            && let Some(created) = decode_token(token)
        {
            working.insert(
                TIMESTAMP_FIELD.to_string(),
                (created + antispam.delay_seconds).to_string(),
            );
        }

        let errors_by_field = self.engine.validate(&working, &compiled);

        // Result map keys are exactly the submitted input keys. Built from
        // the raw input, so the decoded timestamp never reaches re-rendered
        // markup.
        let results: SubmissionResults = input
            .iter()
            .map(|(name, value)| {
                (
                    name.clone(),
                    FieldValue::new(value, errors_by_field.get(name).cloned()),
                )
            })
            .collect();

        if !errors_by_field.is_empty() {
            let mut errors = vec![self.settings.error_msg().to_string()];

            // Only surface the delay message when the honeypot passed:
            // a bot that filled the hidden field gets no guidance, while a
            // too-fast human submission gets an actionable explanation.
            let honeypot_clean = !errors_by_field.contains_key(HONEYPOT_FIELD);
            let delay_tripped = errors_by_field.contains_key(TIMESTAMP_FIELD);
            if honeypot_clean && delay_tripped {
                errors.push(self.settings.antispam_delay_error_msg().to_string());
            }

            return SubmissionOutcome::Invalid { errors, results };
        }

        // Side effects run sequentially in a fixed order with no rollback;
        // a failure is logged and counted but the outcome stays accepted.
        let mut side_effect_failures = 0;

        if let Err(e) = self.store.store(&results).await {
            error!(error = %e, "failed to store contact message");
            side_effect_failures += 1;
        }

        if let Err(e) = self.mailer.send_autoreply(&results).await {
            error!(error = %e, "failed to send auto-reply email");
            side_effect_failures += 1;
        }

        if let Err(e) = self.mailer.send_notification(&results).await {
            error!(error = %e, "failed to send notification email");
            side_effect_failures += 1;
        }

        SubmissionOutcome::Accepted {
            message: self.settings.success_msg().to_string(),
            results,
            response: if asynchronous {
                SuccessResponse::ClearForm
            } else {
                SuccessResponse::Redirect
            },
            side_effect_failures,
        }
    }
}

impl std::fmt::Debug for SubmissionProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionProcessor").finish()
    }
}
