use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::portal::{
    error::ApiError,
    form::FormFields,
    submission::{enrollment::MSG_ENROLLED, EnrollmentService},
};

/// Documented shape of the enrollment form body.
#[derive(ToSchema, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentForm {
    pub first_name: String,
    pub last_name: String,
    /// `YYYY-MM-DD`, not in the future
    pub date_of_birth: String,
    pub gender: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    /// Four digits
    pub postcode: String,
    pub medicare: Option<String>,
    #[serde(rename = "emergencyName1")]
    pub emergency_name1: String,
    #[serde(rename = "emergencyRelationship1")]
    pub emergency_relationship1: String,
    #[serde(rename = "emergencyPhone1")]
    pub emergency_phone1: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub security_question: String,
    pub security_answer: String,
    pub terms_consent: String,
    pub health_consent: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct EnrollmentResponse {
    pub success: bool,
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/enrollment",
    request_body(content = EnrollmentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Patient enrolled", body = EnrollmentResponse),
        (status = 400, description = "Invalid fields or duplicate email/username", body = crate::portal::error::ErrorBody),
        (status = 500, description = "Enrollment could not be stored", body = crate::portal::error::ErrorBody),
    ),
    tag = "forms"
)]
pub async fn enrollment(
    service: Extension<Arc<EnrollmentService>>,
    fields: FormFields,
) -> Result<impl IntoResponse, ApiError> {
    service.enroll(&fields).await?;

    Ok((
        StatusCode::CREATED,
        Json(EnrollmentResponse {
            success: true,
            message: MSG_ENROLLED.to_string(),
        }),
    ))
}
