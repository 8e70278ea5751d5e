use axum::{
    extract::Extension,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::portal::{
    error::ApiError,
    form::FormFields,
    submission::{appointment::MSG_BOOKED, AppointmentRecord, AppointmentService},
};

/// Documented shape of the booking form body.
#[derive(ToSchema, Deserialize, Debug)]
pub struct AppointmentForm {
    pub doctor: String,
    pub doctor_name: Option<String>,
    /// `YYYY-MM-DD`
    pub date: String,
    pub time: String,
    pub reason: String,
    pub patient_name: String,
    pub patient_phone: String,
    pub patient_email: String,
    pub notes: Option<String>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct AppointmentResponse {
    pub success: bool,
    pub message: String,
    pub appointment_id: String,
    pub appointment_data: AppointmentRecord,
    pub saved_to_database: bool,
}

#[utoipa::path(
    post,
    path = "/appointments",
    request_body(content = AppointmentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Appointment booked", body = AppointmentResponse),
        (status = 400, description = "One or more fields are invalid", body = crate::portal::error::ErrorBody),
    ),
    tag = "forms"
)]
pub async fn appointments(
    service: Extension<Arc<AppointmentService>>,
    fields: FormFields,
) -> Result<impl IntoResponse, ApiError> {
    let confirmation = service.submit(&fields).await?;

    Ok(Json(AppointmentResponse {
        success: true,
        message: MSG_BOOKED.to_string(),
        appointment_id: confirmation.record.appointment_id.clone(),
        appointment_data: confirmation.record,
        saved_to_database: confirmation.saved_to_database,
    }))
}
