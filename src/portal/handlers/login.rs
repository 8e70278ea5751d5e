use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::DASHBOARD_PATH;
use crate::portal::{
    auth::{AuthService, LoginOutcome},
    error::ApiError,
    form::FormFields,
    session::{extract_session_token, session_cookie},
};

pub const MSG_LOGIN_SUCCESSFUL: &str = "Login successful";
pub const MSG_ALREADY_LOGGED_IN: &str = "Already logged in";

/// Documented shape of the login form body.
#[derive(ToSchema, Deserialize, Debug)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub redirect: String,
}

#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Authenticated; the session cookie is set", body = LoginResponse),
        (status = 400, description = "Malformed email or password", body = crate::portal::error::ErrorBody),
        (status = 401, description = "Invalid email or password", body = crate::portal::error::ErrorBody),
        (status = 429, description = "Identifier locked out", body = crate::portal::error::ErrorBody),
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    auth: Extension<AuthService>,
    fields: FormFields,
) -> Result<Response, ApiError> {
    let presented = extract_session_token(&headers);
    let password = SecretString::from(fields.raw("password").to_string());

    let outcome = auth
        .login(fields.raw("email"), &password, presented.as_deref())
        .await?;

    match outcome {
        LoginOutcome::AlreadyAuthenticated => Ok(success(MSG_ALREADY_LOGGED_IN).into_response()),
        LoginOutcome::Authenticated { token, .. } => {
            let cookie = session_cookie(&token, auth.sessions().timeout())
                .map_err(|err| anyhow::anyhow!("failed to build session cookie: {err}"))?;
            let mut response = success(MSG_LOGIN_SUCCESSFUL).into_response();
            response.headers_mut().insert(SET_COOKIE, cookie);
            Ok(response)
        }
    }
}

fn success(message: &str) -> (StatusCode, Json<LoginResponse>) {
    (
        StatusCode::OK,
        Json(LoginResponse {
            success: true,
            message: message.to_string(),
            redirect: DASHBOARD_PATH.to_string(),
        }),
    )
}
