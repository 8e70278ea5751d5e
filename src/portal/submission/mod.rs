//! Appointment and enrollment submissions.

pub mod appointment;
pub mod enrollment;
pub mod journal;
pub mod store;

pub use appointment::{AppointmentConfirmation, AppointmentRecord, AppointmentService};
pub use enrollment::{EnrollmentService, NewPatient};
pub use journal::AppointmentJournal;
pub use store::{
    AppointmentStore, PatientInsert, PatientStore, PgAppointmentStore, PgPatientStore,
};

use super::validation::{FieldError, Violation};

/// Push a field error when `outcome` failed, worded by `describe`.
fn check(
    errors: &mut Vec<FieldError>,
    field: &str,
    outcome: Result<(), Violation>,
    describe: impl FnOnce(Violation) -> &'static str,
) {
    if let Err(violation) = outcome {
        errors.push(FieldError::new(field, describe(violation)));
    }
}
