//! Application state shared across all handlers.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tera::Tera;
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::form::{Mailer, MessageStore, RuleEngine, SubmissionProcessor, ValidationEngine};
use crate::models::SqlMessageStore;
use crate::services::{ContactMailer, EmailService};
use crate::settings::FormSettings;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    db: PgPool,
    settings: Arc<FormSettings>,
    tera: Arc<Tera>,
    engine: Arc<dyn ValidationEngine>,
    store: Arc<dyn MessageStore>,
    mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Initialize state from configuration: database pool and schema,
    /// form settings, email transport, and templates.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = db::create_pool(config).await?;
        db::ensure_schema(&pool).await?;

        let settings = Arc::new(
            FormSettings::load(&config.form_config).context("failed to load form settings")?,
        );
        info!(fields = settings.form_fields.len(), "form settings loaded");

        let email = match &config.smtp_host {
            Some(host) => Some(
                EmailService::new(
                    host,
                    config.smtp_port,
                    config.smtp_username.as_deref(),
                    config.smtp_password.as_deref(),
                    &config.smtp_encryption,
                    config.smtp_from_email.clone(),
                    config.site_url.clone(),
                )
                .context("failed to create email service")?,
            ),
            None => {
                info!("SMTP not configured, email delivery disabled");
                None
            }
        };

        let tera = build_tera(config.templates_dir.as_deref())?;
        let store = Arc::new(SqlMessageStore::new(pool.clone()));
        let mailer = Arc::new(ContactMailer::new(email, Arc::clone(&settings)));

        Ok(Self::from_parts(pool, settings, tera, store, mailer))
    }

    /// Assemble state from already-built parts. Used by `new` and by
    /// integration tests that substitute collaborators.
    pub fn from_parts(
        db: PgPool,
        settings: Arc<FormSettings>,
        tera: Tera,
        store: Arc<dyn MessageStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            db,
            settings,
            tera: Arc::new(tera),
            engine: Arc::new(RuleEngine::new()),
            store,
            mailer,
        }
    }

    /// Database pool.
    pub fn db(&self) -> &PgPool {
        &self.db
    }

    /// Form settings.
    pub fn settings(&self) -> &FormSettings {
        &self.settings
    }

    /// Template engine.
    pub fn tera(&self) -> &Tera {
        &self.tera
    }

    /// Build a submission processor over the shared collaborators.
    pub fn processor(&self) -> SubmissionProcessor {
        SubmissionProcessor::new(
            Arc::clone(&self.settings),
            Arc::clone(&self.engine),
            Arc::clone(&self.store),
            Arc::clone(&self.mailer),
        )
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish()
    }
}

/// Build the Tera instance, loading templates when a directory is
/// configured and falling back to an empty engine (inline rendering)
/// otherwise.
fn build_tera(templates_dir: Option<&Path>) -> Result<Tera> {
    let Some(dir) = templates_dir else {
        return Ok(Tera::default());
    };

    let pattern = dir.join("**/*.html");
    let pattern_str = pattern.to_str().context("invalid template directory path")?;

    Tera::new(pattern_str).context("failed to initialize Tera templates")
}
