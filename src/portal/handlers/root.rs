use axum::{response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Debug)]
pub struct Root {
    name: String,
    version: String,
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service name and version", body = Root)
    ),
    tag = "portal"
)]
pub async fn root() -> impl IntoResponse {
    Json(Root {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
