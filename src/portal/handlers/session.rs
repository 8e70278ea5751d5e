//! Logout, session check and the session-gated dashboard.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::portal::{
    auth::AuthService,
    credentials::Profile,
    error::ApiError,
    session::{clear_session_cookie, extract_session_token},
};

#[derive(ToSchema, Serialize, Debug)]
pub struct SessionSummary {
    pub email: String,
    pub name: String,
    pub patient_id: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct Dashboard {
    pub success: bool,
    pub email: String,
    pub profile: Profile,
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 204, description = "Session destroyed and cookie cleared")
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, auth: Extension<AuthService>) -> impl IntoResponse {
    auth.logout(extract_session_token(&headers).as_deref()).await;

    let mut response = StatusCode::NO_CONTENT.into_response();
    match clear_session_cookie() {
        Ok(cookie) => {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build logout cookie: {err}"),
    }
    response
}

#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "Active session", body = SessionSummary),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(headers: HeaderMap, auth: Extension<AuthService>) -> Response {
    let token = extract_session_token(&headers);
    match auth.current(token.as_deref()).await {
        Ok(session) => match session.identity() {
            Some(identity) => Json(SessionSummary {
                email: identity.email.clone(),
                name: identity.profile.name.clone(),
                patient_id: identity.profile.patient_id.clone(),
            })
            .into_response(),
            None => StatusCode::NO_CONTENT.into_response(),
        },
        Err(_) => StatusCode::NO_CONTENT.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Profile of the logged-in patient", body = Dashboard),
        (status = 401, description = "No session or session expired", body = crate::portal::error::ErrorBody)
    ),
    tag = "portal"
)]
pub async fn dashboard(
    headers: HeaderMap,
    auth: Extension<AuthService>,
) -> Result<Json<Dashboard>, ApiError> {
    let token = extract_session_token(&headers);
    let session = auth.current(token.as_deref()).await?;
    let identity = session.identity().ok_or(ApiError::AccessDenied)?;

    Ok(Json(Dashboard {
        success: true,
        email: identity.email.clone(),
        profile: identity.profile.clone(),
    }))
}
