//! The auth session: bearer token + cached user, set and cleared together.
//!
//! Shared as `Arc<AuthSession>` by the API client (which reads the token
//! for every request and clears the session on 401) and the auth service.
//! UI shells subscribe to [`AuthEvent`]s to route to the login screen.

use chrono::{TimeDelta, Utc};
use tokio::sync::watch;

use super::store::{CookieStore, FileCookieStore, MemoryCookieStore, StoreError, StoredCookie};
use crate::models::User;

pub const TOKEN_KEY: &str = "access_token";
pub const USER_KEY: &str = "user_data";

/// Cookie lifetime. There is no refresh flow; expiry forces a new login.
pub fn default_session_ttl() -> TimeDelta {
    TimeDelta::days(1)
}

/// Session transitions published to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    /// The backend rejected the token; the UI must show the login screen.
    LoginRequired,
}

pub struct AuthSession {
    store: Box<dyn CookieStore>,
    ttl: TimeDelta,
    events: watch::Sender<AuthEvent>,
}

impl AuthSession {
    pub fn new(store: impl CookieStore + 'static) -> Self {
        let (events, _) = watch::channel(AuthEvent::SignedOut);
        let session = Self {
            store: Box::new(store),
            ttl: default_session_ttl(),
            events,
        };
        if session.is_authenticated() {
            session.events.send_replace(AuthEvent::SignedIn);
        }
        session
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryCookieStore::new())
    }

    /// Session persisted in a JSON file.
    pub fn persistent(path: impl Into<std::path::PathBuf>) -> Self {
        Self::new(FileCookieStore::new(path))
    }

    pub fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    // ── Token ────────────────────────────────────────────

    pub fn set_token(&self, token: &str) -> Result<(), StoreError> {
        self.write(TOKEN_KEY, token)
    }

    pub fn token(&self) -> Option<String> {
        self.read(TOKEN_KEY)
    }

    pub fn remove_token(&self) -> Result<(), StoreError> {
        self.store.remove(TOKEN_KEY)
    }

    /// `Authorization` header value, when signed in.
    pub fn bearer(&self) -> Option<String> {
        self.token().map(|t| format!("Bearer {t}"))
    }

    // ── User ─────────────────────────────────────────────

    pub fn set_user(&self, user: &User) -> Result<(), StoreError> {
        let json = serde_json::to_string(user).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        self.write(USER_KEY, &json)
    }

    pub fn user(&self) -> Option<User> {
        let raw = self.read(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "Cached user is unreadable, dropping it");
                let _ = self.store.remove(USER_KEY);
                None
            }
        }
    }

    pub fn remove_user(&self) -> Result<(), StoreError> {
        self.store.remove(USER_KEY)
    }

    // ── Session as a whole ───────────────────────────────

    /// True only when both token and user are present and unexpired.
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some() && self.user().is_some()
    }

    /// Store token and user together. If the second write fails the first
    /// is rolled back so the pair never goes out of sync.
    pub fn establish(&self, token: &str, user: &User) -> Result<(), StoreError> {
        self.set_token(token)?;
        if let Err(e) = self.set_user(user) {
            let _ = self.remove_token();
            return Err(e);
        }
        self.events.send_replace(AuthEvent::SignedIn);
        Ok(())
    }

    /// Remove token and user.
    pub fn clear(&self) -> Result<(), StoreError> {
        let token = self.remove_token();
        let user = self.remove_user();
        self.events.send_replace(AuthEvent::SignedOut);
        token.and(user)
    }

    /// Called by the API client on HTTP 401.
    pub fn handle_unauthorized(&self) {
        if let Err(e) = self.clear() {
            tracing::error!(error = %e, "Failed to clear auth session after 401");
        }
        tracing::info!("Auth session rejected by backend, login required");
        self.events.send_replace(AuthEvent::LoginRequired);
    }

    // ── Internal ─────────────────────────────────────────

    fn write(&self, name: &str, value: &str) -> Result<(), StoreError> {
        self.store.set(
            name,
            StoredCookie {
                value: value.to_string(),
                expires_at: Utc::now() + self.ttl,
            },
        )
    }

    fn read(&self, name: &str) -> Option<String> {
        match self.store.get(name) {
            Ok(Some(cookie)) if cookie.is_expired(Utc::now()) => {
                let _ = self.store.remove(name);
                None
            }
            Ok(Some(cookie)) => Some(cookie.value),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(cookie = name, error = %e, "Failed to read session cookie");
                None
            }
        }
    }
}
