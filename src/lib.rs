//! # Patient Portal
//!
//! `patient-portal` serves the authenticated half of the hospital patient
//! website: the login endpoint, the session-gated dashboard and the two
//! multi-step forms (appointment booking and patient enrollment).
//!
//! ## Authentication
//!
//! Identities are loaded once from configuration and never change at runtime.
//! Secrets are stored as Argon2id hashes. A login attempt is validated first,
//! then checked against the per-identifier rate limiter, and only then compared
//! against the credential store. Unknown identities and wrong secrets produce
//! the same generic message.
//!
//! ## Sessions
//!
//! Sessions live in memory, keyed by the SHA-256 hash of a random cookie token.
//! The cookie is `HttpOnly` and `Secure`; tokens are never accepted from URLs.
//! A successful login always issues a fresh token.
//!
//! ## Submissions
//!
//! Both forms collect every field error in a single pass. Appointments are
//! journaled to a monthly append-only log regardless of whether the database
//! write succeeded. Enrollments are written in a single transaction and fail
//! the request when the transaction does not commit.

pub mod cli;
pub mod portal;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
