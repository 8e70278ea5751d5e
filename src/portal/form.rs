//! Flat form bodies, posted either url-encoded or as `multipart/form-data`.

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form,
};
use std::collections::HashMap;
use tracing::warn;

use super::{error::ApiError, validation::sanitize};

const MSG_INVALID_BODY: &str = "Invalid form submission";

/// Named text fields of a submitted form. Absent fields read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields(HashMap<String, String>);

impl FormFields {
    /// Raw value, untouched.
    #[must_use]
    pub fn raw(&self, name: &str) -> &str {
        self.0.get(name).map_or("", String::as_str)
    }

    /// Trimmed and markup-escaped value.
    #[must_use]
    pub fn sanitized(&self, name: &str) -> String {
        sanitize(self.raw(name))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[axum::async_trait]
impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state).await.map_err(|err| {
                warn!("Rejected multipart body: {err}");
                ApiError::validation(MSG_INVALID_BODY, Vec::new())
            })?;
            return read_multipart(multipart).await;
        }

        let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
            .await
            .map_err(|err| {
                warn!("Rejected form body: {err}");
                ApiError::validation(MSG_INVALID_BODY, Vec::new())
            })?;

        Ok(Self(fields))
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<FormFields, ApiError> {
    let mut fields = HashMap::new();
    loop {
        let field = multipart.next_field().await.map_err(|err| {
            warn!("Failed to read multipart field: {err}");
            ApiError::validation(MSG_INVALID_BODY, Vec::new())
        })?;
        let Some(field) = field else {
            break;
        };
        // Only plain text parts are form values.
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let value = field.text().await.map_err(|err| {
            warn!("Failed to read multipart value: {err}");
            ApiError::validation(MSG_INVALID_BODY, Vec::new())
        })?;
        fields.insert(name, value);
    }
    Ok(FormFields(fields))
}
