//! Login orchestration.
//!
//! A login attempt moves through `validate -> rate check -> credential check`
//! in that order: malformed input never reaches the rate limiter, and a locked
//! identifier never reaches the credential store.

use secrecy::{ExposeSecret, SecretString};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use super::{
    credentials::{normalize_email, CredentialStore, Identity},
    error::ApiError,
    rate_limit::{RateLimitDecision, RateLimiter},
    session::{Session, SessionLookup, SessionStore},
    validation::{self, join_messages, sanitize, FieldError, Violation, LOGIN_PASSWORD_MIN_LEN},
};

#[derive(Debug)]
pub enum LoginOutcome {
    /// A fresh session was issued; `token` goes into the cookie.
    Authenticated { token: String, identity: Identity },
    /// The presented cookie already belongs to an authenticated session.
    AlreadyAuthenticated,
}

#[derive(Clone)]
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    limiter: Arc<dyn RateLimiter>,
    sessions: Arc<SessionStore>,
}

impl AuthService {
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        limiter: Arc<dyn RateLimiter>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            credentials,
            limiter,
            sessions,
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Run one login attempt.
    ///
    /// # Errors
    /// `Validation` for malformed input, `RateLimited` while the identifier is
    /// locked out, `Authentication` for unknown emails and wrong passwords
    /// alike, `Internal` when the credential store or RNG fails.
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
        presented_token: Option<&str>,
    ) -> Result<LoginOutcome, ApiError> {
        if let Some(token) = presented_token {
            if let SessionLookup::Active(session) = self.sessions.lookup(token).await {
                if session.is_authenticated() {
                    return Ok(LoginOutcome::AlreadyAuthenticated);
                }
            }
        }

        let email = sanitize(email);
        let errors = validate_login(&email, password.expose_secret());
        if !errors.is_empty() {
            return Err(ApiError::validation(join_messages(&errors), errors));
        }

        let identifier = normalize_email(&email);

        let attempt = match Attempt::begin(self.limiter.as_ref(), &identifier) {
            Ok(attempt) => attempt,
            Err(retry_after) => {
                debug!("login rejected while identifier is locked out");
                return Err(ApiError::RateLimited {
                    retry_after_seconds: retry_after.as_secs().max(1),
                });
            }
        };

        let verified = self
            .credentials
            .verify(&identifier, password.expose_secret())
            .await?;

        let Some(identity) = verified else {
            if let RateLimitDecision::Locked { .. } = attempt.failed() {
                warn!("login identifier reached the failure threshold");
            }
            return Err(ApiError::Authentication);
        };

        attempt.succeeded();

        let token = self
            .sessions
            .rotate(presented_token, Session::authenticated(identity.clone()))
            .await?;

        info!(patient_id = %identity.profile.patient_id, "login successful");

        Ok(LoginOutcome::Authenticated { token, identity })
    }

    /// Resolve the presented cookie into an authenticated session.
    ///
    /// # Errors
    /// `SessionExpired` when the session outlived its timeout (it is destroyed),
    /// `AccessDenied` when there is no authenticated session.
    pub async fn current(&self, presented_token: Option<&str>) -> Result<Session, ApiError> {
        let Some(token) = presented_token else {
            return Err(ApiError::AccessDenied);
        };
        match self.sessions.lookup(token).await {
            SessionLookup::Active(session) if session.is_authenticated() => Ok(session),
            SessionLookup::Active(_) | SessionLookup::Missing => Err(ApiError::AccessDenied),
            SessionLookup::Expired => Err(ApiError::SessionExpired),
        }
    }

    pub async fn logout(&self, presented_token: Option<&str>) {
        if let Some(token) = presented_token {
            self.sessions.destroy(token).await;
        }
    }
}

/// A reserved login attempt. Dropping it unsettled, on a store error or a
/// cancelled request, hands the reservation back uncharged.
struct Attempt<'a> {
    limiter: &'a dyn RateLimiter,
    identifier: &'a str,
    settled: bool,
}

impl<'a> Attempt<'a> {
    fn begin(limiter: &'a dyn RateLimiter, identifier: &'a str) -> Result<Self, Duration> {
        match limiter.try_begin(identifier) {
            RateLimitDecision::Allowed => Ok(Self {
                limiter,
                identifier,
                settled: false,
            }),
            RateLimitDecision::Locked { retry_after } => Err(retry_after),
        }
    }

    fn failed(mut self) -> RateLimitDecision {
        self.settled = true;
        self.limiter.record_failure(self.identifier)
    }

    fn succeeded(mut self) {
        self.settled = true;
        self.limiter.clear(self.identifier);
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.limiter.release(self.identifier);
        }
    }
}

fn validate_login(email: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();

    match validation::email(email) {
        Ok(()) => {}
        Err(Violation::Required) => errors.push(FieldError::new("email", "Email is required")),
        Err(_) => errors.push(FieldError::new("email", "Invalid email format")),
    }

    match validation::login_password(password) {
        Ok(()) => {}
        Err(Violation::Required) => {
            errors.push(FieldError::new("password", "Password is required"));
        }
        Err(_) => errors.push(FieldError::new(
            "password",
            format!("Password must be at least {LOGIN_PASSWORD_MIN_LEN} characters"),
        )),
    }

    errors
}
