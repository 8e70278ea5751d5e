//! Typed sessions and the in-memory session store.
//!
//! The raw token only ever lives in the client cookie; the store is keyed by
//! its SHA-256 hash.

use anyhow::{Context, Result};
use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tracing::debug;

use super::credentials::Identity;

pub const SESSION_COOKIE_NAME: &str = "portal_session";
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct Session {
    authenticated: bool,
    identity: Option<Identity>,
    created_at: Instant,
}

impl Session {
    /// A session bound to a successfully authenticated identity.
    #[must_use]
    pub fn authenticated(identity: Identity) -> Self {
        Self {
            authenticated: true,
            identity: Some(identity),
            created_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated && self.identity.is_some()
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }
}

#[derive(Debug)]
pub enum SessionLookup {
    Active(Session),
    Expired,
    Missing,
}

#[derive(Debug)]
pub struct SessionStore {
    timeout: Duration,
    sessions: Mutex<HashMap<Vec<u8>, Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TIMEOUT)
    }
}

impl SessionStore {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Store `session` under a fresh random token and return the raw token.
    ///
    /// # Errors
    /// Returns an error if the OS random source fails.
    pub async fn create(&self, session: Session) -> Result<String> {
        let token = generate_session_token()?;
        let mut sessions = self.sessions.lock().await;
        let timeout = self.timeout;
        sessions.retain(|_, existing| existing.age_at(Instant::now()) <= timeout);
        sessions.insert(hash_session_token(&token), session);
        Ok(token)
    }

    /// Destroy `previous` (if any) and store `session` under a new token.
    ///
    /// # Errors
    /// Returns an error if the OS random source fails.
    pub async fn rotate(&self, previous: Option<&str>, session: Session) -> Result<String> {
        if let Some(previous) = previous {
            self.destroy(previous).await;
        }
        self.create(session).await
    }

    pub async fn lookup(&self, token: &str) -> SessionLookup {
        self.lookup_at(token, Instant::now()).await
    }

    pub(crate) async fn lookup_at(&self, token: &str, now: Instant) -> SessionLookup {
        let key = hash_session_token(token);
        let mut sessions = self.sessions.lock().await;
        match sessions.get(&key) {
            None => SessionLookup::Missing,
            Some(session) if session.age_at(now) > self.timeout => {
                sessions.remove(&key);
                debug!("session expired");
                SessionLookup::Expired
            }
            Some(session) => SessionLookup::Active(session.clone()),
        }
    }

    pub async fn destroy(&self, token: &str) {
        self.sessions.lock().await.remove(&hash_session_token(token));
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// 32 random bytes, URL-safe base64 without padding.
///
/// # Errors
/// Returns an error if the OS random source fails.
pub fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

#[must_use]
pub fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Build the `HttpOnly; Secure` session cookie.
pub fn session_cookie(token: &str, timeout: Duration) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age={}",
        timeout.as_secs()
    ))
}

pub fn clear_session_cookie() -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age=0"
    ))
}

/// Read the session token from the `Cookie` header only.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            if key.trim() == SESSION_COOKIE_NAME && !val.trim().is_empty() {
                return Some(val.trim().to_string());
            }
        }
    }
    None
}
