//! Session middleware configuration.
//!
//! Cookie sessions via tower-sessions, signed with a key derived from the
//! configured session secret. Production uses the `PostgreSQL` store; tests
//! pass a `MemoryStore`.

use axum::Router;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha512};
use tower_sessions::cookie::{Key, SameSite, time::Duration};
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

use crate::config::ServerConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "techmart_session";

/// Session expiry time in seconds (1 day of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Derive the 64-byte cookie signing key from the session secret.
fn signing_key(config: &ServerConfig) -> Key {
    let digest = Sha512::digest(config.session_secret.expose_secret().as_bytes());
    Key::from(digest.as_slice())
}

/// Wrap `router` in a signed-cookie session layer backed by `store`.
///
/// Applied as the outermost session-aware layer, so every route sees the
/// `Session` extension.
pub fn with_sessions<Store>(router: Router, store: Store, config: &ServerConfig) -> Router
where
    Store: SessionStore + Clone,
{
    let layer = SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(SESSION_EXPIRY_SECONDS)))
        .with_secure(config.secure_cookies())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(signing_key(config));
    router.layer(layer)
}
