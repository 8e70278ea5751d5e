//! Persistence capabilities for submissions and their PostgreSQL backends.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::Instrument;

use super::{appointment::AppointmentRecord, enrollment::NewPatient};

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, record: &AppointmentRecord) -> Result<()>;
}

/// Outcome of inserting a patient; unique violations are not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientInsert {
    Created,
    DuplicateEmail,
    DuplicateUsername,
}

#[async_trait]
pub trait PatientStore: Send + Sync {
    async fn email_exists(&self, email: &str) -> Result<bool>;
    async fn username_exists(&self, username: &str) -> Result<bool>;
    /// Insert the patient atomically.
    async fn insert(&self, patient: &NewPatient) -> Result<PatientInsert>;
}

pub struct PgAppointmentStore {
    pool: PgPool,
}

impl PgAppointmentStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AppointmentStore for PgAppointmentStore {
    async fn insert(&self, record: &AppointmentRecord) -> Result<()> {
        let query = r"
            INSERT INTO appointments (
                appointment_id, doctor_id, doctor_name, appointment_date,
                appointment_time, reason, patient_name, patient_phone,
                patient_email, notes, status, created_at
            ) VALUES ($1, $2, $3, $4::date, $5, $6, $7, $8, $9, $10, $11, $12::timestamp)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(&record.appointment_id)
            .bind(&record.doctor_id)
            .bind(&record.doctor_name)
            .bind(&record.appointment_date)
            .bind(&record.appointment_time)
            .bind(&record.reason)
            .bind(&record.patient_name)
            .bind(&record.patient_phone)
            .bind(&record.patient_email)
            .bind(&record.notes)
            .bind(&record.status)
            .bind(&record.created_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert appointment")?;
        Ok(())
    }
}

pub struct PgPatientStore {
    pool: PgPool,
}

impl PgPatientStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, query: &'static str, value: &str) -> Result<bool> {
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(value)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to check patient uniqueness")?;
        Ok(row.get::<bool, _>("found"))
    }
}

#[async_trait]
impl PatientStore for PgPatientStore {
    async fn email_exists(&self, email: &str) -> Result<bool> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM patients WHERE lower(email) = lower($1)) AS found",
            email,
        )
        .await
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM patients WHERE username = $1) AS found",
            username,
        )
        .await
    }

    async fn insert(&self, patient: &NewPatient) -> Result<PatientInsert> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("begin enrollment transaction")?;

        let query = r"
            INSERT INTO patients (
                first_name, last_name, date_of_birth, gender, email, phone,
                address, city, state, postcode, medicare,
                emergency_name1, emergency_relationship1, emergency_phone1,
                username, password_hash, security_question, security_answer_hash,
                terms_consent, health_consent, created_at
            ) VALUES (
                $1, $2, $3::date, $4, $5, $6,
                $7, $8, $9, $10, $11,
                $12, $13, $14,
                $15, $16, $17, $18,
                $19, $20, $21::timestamp
            )
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(&patient.first_name)
            .bind(&patient.last_name)
            .bind(&patient.date_of_birth)
            .bind(&patient.gender)
            .bind(&patient.email)
            .bind(&patient.phone)
            .bind(&patient.address)
            .bind(&patient.city)
            .bind(&patient.state)
            .bind(&patient.postcode)
            .bind(patient.medicare.as_deref())
            .bind(&patient.emergency_name1)
            .bind(&patient.emergency_relationship1)
            .bind(&patient.emergency_phone1)
            .bind(&patient.username)
            .bind(&patient.password_hash)
            .bind(&patient.security_question)
            .bind(&patient.security_answer_hash)
            .bind(patient.terms_consent)
            .bind(patient.health_consent)
            .bind(&patient.created_at)
            .execute(&mut *tx)
            .instrument(span)
            .await;

        if let Err(err) = result {
            if let Some(duplicate) = duplicate_kind(&err) {
                let _ = tx.rollback().await;
                return Ok(duplicate);
            }
            return Err(err).context("failed to insert patient");
        }

        tx.commit().await.context("commit enrollment transaction")?;

        Ok(PatientInsert::Created)
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Map a unique violation on `patients` to the column it hit.
fn duplicate_kind(err: &sqlx::Error) -> Option<PatientInsert> {
    if !is_unique_violation(err) {
        return None;
    }
    let constraint = match err {
        sqlx::Error::Database(db_err) => db_err.constraint().unwrap_or_default(),
        _ => "",
    };
    if constraint.contains("username") {
        Some(PatientInsert::DuplicateUsername)
    } else {
        Some(PatientInsert::DuplicateEmail)
    }
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-process stores for tests.

    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct MemoryAppointmentStore {
        pub(crate) records: Mutex<Vec<AppointmentRecord>>,
        pub(crate) unavailable: bool,
    }

    impl MemoryAppointmentStore {
        pub(crate) fn unavailable() -> Self {
            Self {
                unavailable: true,
                ..Self::default()
            }
        }

        pub(crate) fn count(&self) -> usize {
            self.records.lock().map(|records| records.len()).unwrap_or(0)
        }
    }

    #[async_trait]
    impl AppointmentStore for MemoryAppointmentStore {
        async fn insert(&self, record: &AppointmentRecord) -> Result<()> {
            if self.unavailable {
                anyhow::bail!("connection refused");
            }
            self.records
                .lock()
                .map_err(|_| anyhow::anyhow!("poisoned"))?
                .push(record.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    pub(crate) struct MemoryPatientStore {
        pub(crate) patients: Mutex<Vec<NewPatient>>,
        pub(crate) fail_insert: bool,
    }

    impl MemoryPatientStore {
        pub(crate) fn with_patient(email: &str, username: &str) -> Self {
            let store = Self::default();
            if let Ok(mut patients) = store.patients.lock() {
                patients.push(NewPatient {
                    email: email.to_string(),
                    username: username.to_string(),
                    ..NewPatient::default()
                });
            }
            store
        }

        pub(crate) fn failing() -> Self {
            Self {
                fail_insert: true,
                ..Self::default()
            }
        }

        pub(crate) fn count(&self) -> usize {
            self.patients.lock().map(|p| p.len()).unwrap_or(0)
        }
    }

    #[async_trait]
    impl PatientStore for MemoryPatientStore {
        async fn email_exists(&self, email: &str) -> Result<bool> {
            let patients = self.patients.lock().map_err(|_| anyhow::anyhow!("poisoned"))?;
            Ok(patients.iter().any(|p| p.email.eq_ignore_ascii_case(email)))
        }

        async fn username_exists(&self, username: &str) -> Result<bool> {
            let patients = self.patients.lock().map_err(|_| anyhow::anyhow!("poisoned"))?;
            Ok(patients.iter().any(|p| p.username == username))
        }

        async fn insert(&self, patient: &NewPatient) -> Result<PatientInsert> {
            if self.fail_insert {
                anyhow::bail!("transaction aborted");
            }
            let mut patients = self.patients.lock().map_err(|_| anyhow::anyhow!("poisoned"))?;
            if patients.iter().any(|p| p.email.eq_ignore_ascii_case(&patient.email)) {
                return Ok(PatientInsert::DuplicateEmail);
            }
            if patients.iter().any(|p| p.username == patient.username) {
                return Ok(PatientInsert::DuplicateUsername);
            }
            patients.push(patient.clone());
            Ok(PatientInsert::Created)
        }
    }
}
