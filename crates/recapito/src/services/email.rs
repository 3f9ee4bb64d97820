//! Email delivery service using lettre/SMTP.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::form::{HONEYPOT_FIELD, Mailer, SubmissionResults, TIMESTAMP_FIELD};
use crate::settings::FormSettings;

/// Email delivery service.
pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
    site_url: String,
}

impl EmailService {
    /// Create a new email service.
    ///
    /// `encryption` controls the SMTP transport mode:
    /// - `"starttls"` (default): Opportunistic STARTTLS on port 587
    /// - `"tls"`: Implicit TLS (SMTPS) on port 465
    /// - `"none"`: Unencrypted (for local dev only)
    pub fn new(
        smtp_host: &str,
        smtp_port: u16,
        smtp_username: Option<&str>,
        smtp_password: Option<&str>,
        encryption: &str,
        from_email: String,
        site_url: String,
    ) -> Result<Self> {
        let mut builder = match encryption {
            "tls" => AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)
                .context("failed to create SMTP relay transport")?
                .port(smtp_port),
            "none" => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host).port(smtp_port)
            }
            _ => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)
                .context("failed to create SMTP STARTTLS transport")?
                .port(smtp_port),
        };

        if let (Some(user), Some(pass)) = (smtp_username, smtp_password) {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }

        let transport = builder.build();

        Ok(Self {
            transport,
            from_email,
            site_url,
        })
    }

    /// Send a plain-text email.
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .context("invalid from email address")?,
            )
            .to(to.parse().context("invalid recipient email address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("failed to build email message")?;

        self.transport
            .send(email)
            .await
            .context("failed to send email")?;

        Ok(())
    }
}

/// [`Mailer`] over an optional [`EmailService`].
///
/// When SMTP is not configured the service is `None` and both senders
/// are no-ops, so a form without email still accepts submissions.
pub struct ContactMailer {
    service: Option<EmailService>,
    settings: Arc<FormSettings>,
}

impl ContactMailer {
    /// Create a mailer; pass `None` when SMTP is not configured.
    pub fn new(service: Option<EmailService>, settings: Arc<FormSettings>) -> Self {
        Self { service, settings }
    }

    /// Format the submitted fields as plain-text lines, skipping the
    /// anti-spam fields.
    fn format_fields(data: &SubmissionResults) -> String {
        data.iter()
            .filter(|(name, _)| name.as_str() != HONEYPOT_FIELD && name.as_str() != TIMESTAMP_FIELD)
            .map(|(name, field)| format!("{name}: {}", field.value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl Mailer for ContactMailer {
    async fn send_autoreply(&self, data: &SubmissionResults) -> Result<()> {
        let Some(service) = &self.service else {
            debug!("email disabled, skipping auto-reply");
            return Ok(());
        };

        let address_field = &self.settings.autoreply_address_field;
        let Some(to) = data.get(address_field).filter(|f| !f.value.is_empty()) else {
            debug!(field = %address_field, "no submitter address, skipping auto-reply");
            return Ok(());
        };

        service
            .send(
                &to.value,
                self.settings.autoreply_subject(),
                self.settings.autoreply_text(),
            )
            .await
    }

    async fn send_notification(&self, data: &SubmissionResults) -> Result<()> {
        let Some(service) = &self.service else {
            debug!("email disabled, skipping notification");
            return Ok(());
        };

        let Some(to) = &self.settings.notification_address else {
            debug!("no notification address configured, skipping notification");
            return Ok(());
        };

        let body = format!(
            "A new message was received at {}:\n\n{}",
            service.site_url,
            Self::format_fields(data)
        );

        service
            .send(to, self.settings.notification_subject(), &body)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FieldValue;

    #[test]
    fn email_service_construction_is_lazy() {
        // Construction succeeds even for an unreachable host; the
        // connection is only opened on send.
        let result = EmailService::new(
            "nonexistent.invalid",
            587,
            None,
            None,
            "starttls",
            "test@example.com".to_string(),
            "http://localhost:3000".to_string(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn email_service_supports_tls_mode() {
        let result = EmailService::new(
            "nonexistent.invalid",
            465,
            None,
            None,
            "tls",
            "test@example.com".to_string(),
            "http://localhost:3000".to_string(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn email_service_supports_none_mode() {
        let result = EmailService::new(
            "localhost",
            25,
            None,
            None,
            "none",
            "test@example.com".to_string(),
            "http://localhost:3000".to_string(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn format_fields_skips_antispam() {
        let mut data = SubmissionResults::new();
        data.insert("name".to_string(), FieldValue::new("Ada", None));
        data.insert(HONEYPOT_FIELD.to_string(), FieldValue::new("", None));
        data.insert(TIMESTAMP_FIELD.to_string(), FieldValue::new("jihg", None));

        let body = ContactMailer::format_fields(&data);
        assert_eq!(body, "name: Ada");
    }
}
