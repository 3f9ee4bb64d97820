//! Session layer and post-redirect flash handling.

use anyhow::Result;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

/// Session key marking a just-accepted submission.
const FLASH_SUCCESS_KEY: &str = "flash_success";

/// Session expiry (1 hour); the session only carries flash state.
const SESSION_EXPIRY_HOURS: i64 = 1;

/// Create the in-memory session layer.
pub fn create_session_layer(same_site: SameSite) -> SessionManagerLayer<MemoryStore> {
    let store = MemoryStore::default();

    SessionManagerLayer::new(store)
        .with_secure(false) // Must work on plain HTTP behind a proxy
        .with_http_only(true) // Cookie not accessible via JavaScript
        .with_same_site(same_site)
        .with_expiry(Expiry::OnInactivity(Duration::hours(SESSION_EXPIRY_HOURS)))
}

/// Mark the session with a success message.
///
/// The post-redirect GET consumes the mark, so a page refresh shows the
/// banner at most once and cannot re-trigger the submission.
pub async fn flash_success(session: &Session, message: &str) -> Result<()> {
    session
        .insert(FLASH_SUCCESS_KEY, message.to_string())
        .await
        .map_err(|e| anyhow::anyhow!("failed to store flash message: {e}"))?;

    Ok(())
}

/// Take the success message out of the session, if present.
pub async fn take_success(session: &Session) -> Option<String> {
    session
        .remove::<String>(FLASH_SUCCESS_KEY)
        .await
        .unwrap_or(None)
}
