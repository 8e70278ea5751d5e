//! Credential store: identity records keyed by email with Argon2id secrets.
//!
//! The portal ships with a static table loaded from the identities file, but
//! callers only see the [`CredentialStore`] capability so a database-backed
//! store can replace it.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path};
use tracing::{debug, error};
use utoipa::ToSchema;

/// Profile attributes shown on the dashboard.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Profile {
    pub name: String,
    pub patient_id: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub dob: String,
    #[serde(default)]
    pub medicare: String,
    #[serde(default)]
    pub emergency_contact: String,
    #[serde(default)]
    pub emergency_phone: String,
}

/// An identity as returned to callers; never carries the secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub profile: Profile,
}

/// One entry of the identities file.
#[derive(Deserialize, Debug)]
struct IdentityRecord {
    email: String,
    password_hash: String,
    #[serde(flatten)]
    profile: Profile,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Return the identity registered under `email`, if any.
    async fn lookup(&self, email: &str) -> Result<Option<Identity>>;

    /// Return the identity only when `candidate` matches its stored secret.
    async fn verify(&self, email: &str, candidate: &str) -> Result<Option<Identity>>;
}

struct StoredIdentity {
    identity: Identity,
    password_hash: String,
}

pub struct StaticCredentialStore {
    identities: HashMap<String, StoredIdentity>,
    // Verified against for unknown emails so both failure paths cost the same.
    dummy_hash: String,
}

impl StaticCredentialStore {
    /// Load the identities file (a JSON array of records).
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or holds a malformed hash.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read identities file: {}", path.display()))?;
        Self::from_json(&raw)
    }

    /// # Errors
    /// Returns an error if the JSON is invalid or a hash is not a PHC string.
    pub fn from_json(raw: &str) -> Result<Self> {
        let records: Vec<IdentityRecord> =
            serde_json::from_str(raw).context("Invalid identities JSON")?;

        let mut identities = HashMap::with_capacity(records.len());
        for record in records {
            PasswordHash::new(&record.password_hash)
                .map_err(|e| anyhow::anyhow!("invalid hash for {}: {e}", record.email))?;
            let email = normalize_email(&record.email);
            identities.insert(
                email.clone(),
                StoredIdentity {
                    identity: Identity {
                        email,
                        profile: record.profile,
                    },
                    password_hash: record.password_hash,
                },
            );
        }

        debug!("loaded {} identities", identities.len());

        Ok(Self {
            identities,
            dummy_hash: hash_password("portal-dummy-secret")?,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

#[async_trait]
impl CredentialStore for StaticCredentialStore {
    async fn lookup(&self, email: &str) -> Result<Option<Identity>> {
        Ok(self
            .identities
            .get(&normalize_email(email))
            .map(|stored| stored.identity.clone()))
    }

    async fn verify(&self, email: &str, candidate: &str) -> Result<Option<Identity>> {
        match self.identities.get(&normalize_email(email)) {
            Some(stored) => {
                if verify_password(candidate, &stored.password_hash)? {
                    Ok(Some(stored.identity.clone()))
                } else {
                    Ok(None)
                }
            }
            None => {
                let _ = verify_password(candidate, &self.dummy_hash)?;
                Ok(None)
            }
        }
    }
}

/// Lookup key for identities and rate-limit counters.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash a secret into an Argon2id PHC string.
///
/// # Errors
/// Returns an error if hashing fails.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))
}

/// Constant-time comparison of `password` against a PHC hash.
///
/// # Errors
/// Returns an error if the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("invalid hash: {e}"))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => {
            error!("password verification failed: {e}");
            Err(anyhow::anyhow!("password verification failed"))
        }
    }
}
