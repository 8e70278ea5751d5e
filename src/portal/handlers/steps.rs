use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Local;
use serde::Serialize;
use utoipa::ToSchema;

use crate::portal::{
    error::ErrorBody,
    form::FormFields,
    submission::{appointment::APPOINTMENT_WIZARD, enrollment::ENROLLMENT_WIZARD},
    validation::FieldError,
    wizard::FormWizard,
};

#[derive(ToSchema, Serialize, Debug)]
pub struct StepResponse {
    pub success: bool,
    pub step: usize,
    /// Step name, e.g. `schedule`.
    pub name: String,
    /// Fields owned by this step.
    pub fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_step: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

fn wizard(name: &str) -> Option<FormWizard> {
    [APPOINTMENT_WIZARD, ENROLLMENT_WIZARD]
        .into_iter()
        .find(|wizard| wizard.name() == name)
}

#[utoipa::path(
    post,
    path = "/forms/{form}/steps/{step}",
    params(
        ("form" = String, Path, description = "`appointment` or `enrollment`"),
        ("step" = usize, Path, description = "Step number, starting at 1")
    ),
    responses(
        (status = 200, description = "Step is valid", body = StepResponse),
        (status = 400, description = "Step has invalid fields", body = StepResponse),
        (status = 404, description = "Unknown form or step", body = ErrorBody),
    ),
    tag = "forms"
)]
pub async fn validate_step(Path((form, step)): Path<(String, usize)>, fields: FormFields) -> Response {
    let today = Local::now().date_naive();
    let Some(report) = wizard(&form).and_then(|wizard| wizard.validate_step(step, &fields, today))
    else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                success: false,
                message: "Unknown form step".to_string(),
                errors: Vec::new(),
                retry_after_seconds: None,
            }),
        )
            .into_response();
    };

    let status = if report.is_valid() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };

    (
        status,
        Json(StepResponse {
            success: report.is_valid(),
            step: report.step,
            name: report.name.to_string(),
            fields: report.fields.iter().map(ToString::to_string).collect(),
            prev_step: report.prev_step,
            next_step: report.next_step,
            errors: report.errors,
        }),
    )
        .into_response()
}
