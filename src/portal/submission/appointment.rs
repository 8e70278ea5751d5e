//! Appointment booking.
//!
//! A valid booking is always confirmed to the patient. The database insert is
//! best effort; the monthly journal is written whether or not it succeeded.

use chrono::{Local, NaiveDate, NaiveDateTime};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use super::{check, journal::AppointmentJournal, store::AppointmentStore};
use crate::portal::{
    error::ApiError,
    form::FormFields,
    validation::{self, join_messages, FieldError, Violation, APPOINTMENT_PHONE_MIN_LEN},
    wizard::{FormWizard, Step},
};

pub const STATUS_CONFIRMED: &str = "confirmed";
pub const MSG_BOOKED: &str = "Appointment booked successfully";
const PATIENT_NAME_MIN_LEN: usize = 2;

const STEPS: &[Step] = &[
    Step::new("doctor", &["doctor"], validate_doctor),
    Step::new("schedule", &["date", "time"], validate_schedule),
    Step::new(
        "details",
        &["reason", "patient_name", "patient_phone", "patient_email"],
        validate_details,
    ),
];

pub const APPOINTMENT_WIZARD: FormWizard = FormWizard::new("appointment", STEPS);

/// The booking as persisted, journaled and echoed back.
#[derive(ToSchema, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentRecord {
    pub appointment_id: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub reason: String,
    pub patient_name: String,
    pub patient_phone: String,
    pub patient_email: String,
    pub notes: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct AppointmentConfirmation {
    pub record: AppointmentRecord,
    pub saved_to_database: bool,
}

fn validate_doctor(fields: &FormFields, _today: NaiveDate) -> Vec<FieldError> {
    let mut errors = Vec::new();
    check(
        &mut errors,
        "doctor",
        validation::required(&fields.sanitized("doctor")),
        |_| "Doctor selection is required",
    );
    errors
}

fn validate_schedule(fields: &FormFields, _today: NaiveDate) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let date = fields.sanitized("date");
    check(
        &mut errors,
        "date",
        validation::required(&date).and_then(|()| validation::iso_date(&date)),
        |violation| match violation {
            Violation::Required => "Date selection is required",
            _ => "Invalid date format",
        },
    );
    check(
        &mut errors,
        "time",
        validation::required(&fields.sanitized("time")),
        |_| "Time selection is required",
    );
    errors
}

fn validate_details(fields: &FormFields, _today: NaiveDate) -> Vec<FieldError> {
    let mut errors = Vec::new();
    check(
        &mut errors,
        "reason",
        validation::required(&fields.sanitized("reason")),
        |_| "Reason for visit is required",
    );

    let name = fields.sanitized("patient_name");
    check(
        &mut errors,
        "patient_name",
        validation::required(&name)
            .and_then(|()| validation::min_len(&name, PATIENT_NAME_MIN_LEN)),
        |violation| match violation {
            Violation::Required => "Patient name is required",
            _ => "Patient name must be at least 2 characters",
        },
    );

    let phone = fields.sanitized("patient_phone");
    check(
        &mut errors,
        "patient_phone",
        validation::required(&phone)
            .and_then(|()| validation::phone(&phone, APPOINTMENT_PHONE_MIN_LEN)),
        |violation| match violation {
            Violation::Required => "Phone number is required",
            _ => "Invalid phone number format",
        },
    );

    check(
        &mut errors,
        "patient_email",
        validation::email(&fields.sanitized("patient_email")),
        |violation| match violation {
            Violation::Required => "Email address is required",
            _ => "Invalid email address format",
        },
    );
    errors
}

/// `APT` + `YYYYMMDD` + four random digits.
#[must_use]
pub fn generate_appointment_id(today: NaiveDate) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(1000..=9999);
    format!("APT{}{suffix}", today.format("%Y%m%d"))
}

pub struct AppointmentService {
    store: Arc<dyn AppointmentStore>,
    journal: Arc<AppointmentJournal>,
}

impl AppointmentService {
    #[must_use]
    pub fn new(store: Arc<dyn AppointmentStore>, journal: Arc<AppointmentJournal>) -> Self {
        Self { store, journal }
    }

    /// Validate and book an appointment.
    ///
    /// # Errors
    /// Returns `Validation` with every failing field; storage failures are not errors.
    pub async fn submit(&self, fields: &FormFields) -> Result<AppointmentConfirmation, ApiError> {
        self.submit_at(fields, Local::now().naive_local()).await
    }

    pub(crate) async fn submit_at(
        &self,
        fields: &FormFields,
        now: NaiveDateTime,
    ) -> Result<AppointmentConfirmation, ApiError> {
        let errors = APPOINTMENT_WIZARD.validate_all(fields, now.date());
        if !errors.is_empty() {
            return Err(ApiError::validation(join_messages(&errors), errors));
        }

        let record = AppointmentRecord {
            appointment_id: generate_appointment_id(now.date()),
            doctor_id: fields.sanitized("doctor"),
            doctor_name: fields.sanitized("doctor_name"),
            appointment_date: fields.sanitized("date"),
            appointment_time: fields.sanitized("time"),
            reason: fields.sanitized("reason"),
            patient_name: fields.sanitized("patient_name"),
            patient_phone: fields.sanitized("patient_phone"),
            patient_email: fields.sanitized("patient_email"),
            notes: fields.sanitized("notes"),
            status: STATUS_CONFIRMED.to_string(),
            created_at: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        };

        let saved_to_database = match self.store.insert(&record).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    appointment_id = %record.appointment_id,
                    "Appointment not saved to database: {err:#}"
                );
                false
            }
        };

        if let Err(err) = self.journal.append(&record, now).await {
            error!(
                appointment_id = %record.appointment_id,
                "Failed to journal appointment: {err:#}"
            );
        }

        info!(
            appointment_id = %record.appointment_id,
            saved_to_database, "appointment booked"
        );

        Ok(AppointmentConfirmation {
            record,
            saved_to_database,
        })
    }
}
