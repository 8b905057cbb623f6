//! Session middleware configuration.
//!
//! Sessions carry only an opaque checkout session id; everything else lives
//! in the server-side session registry keyed by that id.

use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};
use uuid::Uuid;

use crate::error::AppError;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "taraba_session";

/// Session key holding the checkout session id.
pub const CHECKOUT_SESSION_ID_KEY: &str = "checkout_session_id";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with an in-memory store.
///
/// The secure flag follows the public base URL scheme.
#[must_use]
pub fn create_session_layer(base_url: &str) -> SessionManagerLayer<MemoryStore> {
    let store = MemoryStore::default();
    let is_secure = base_url.starts_with("https://");

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Get the checkout session id from the session, creating one on first use.
///
/// # Errors
///
/// Returns [`AppError::Internal`] when the session store cannot be read or
/// written.
pub async fn checkout_session_id(session: &Session) -> Result<String, AppError> {
    let existing = session
        .get::<String>(CHECKOUT_SESSION_ID_KEY)
        .await
        .map_err(|e| AppError::Internal(format!("session read failed: {e}")))?;

    if let Some(id) = existing {
        return Ok(id);
    }

    let id = Uuid::new_v4().to_string();
    session
        .insert(CHECKOUT_SESSION_ID_KEY, &id)
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;
    Ok(id)
}
