use super::{
    error::ErrorBody,
    handlers::{appointment, enrollment, health, login, root, session, steps},
    validation::FieldError,
};
use utoipa::{
    openapi::{Contact, InfoBuilder, License},
    OpenApi,
};

/// Add new endpoints to `paths` so they appear in the generated document.
#[derive(OpenApi)]
#[openapi(
    paths(
        root::root,
        health::health,
        login::login,
        session::logout,
        session::session,
        session::dashboard,
        appointment::appointments,
        enrollment::enrollment,
        steps::validate_step,
    ),
    components(schemas(ErrorBody, FieldError)),
    tags(
        (name = "portal", description = "Service metadata and the patient dashboard"),
        (name = "health", description = "Liveness and database reachability"),
        (name = "auth", description = "Login, logout and session state"),
        (name = "forms", description = "Appointment booking, enrollment and wizard steps"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info = cargo_info();
    doc
}

fn cargo_info() -> utoipa::openapi::Info {
    // Use Cargo.toml metadata instead of the utoipa defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();
    info
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `:` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(':').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, email)) => (
            non_empty_str(name.trim()),
            non_empty_str(email.trim_end_matches('>').trim()),
        ),
        None => (non_empty_str(author.trim()), None),
    }
}

fn non_empty_str(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let doc = openapi();
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));

        let contact = doc.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(
                contact.name.as_deref(),
                Some("Pakenham Hospital Digital Team")
            );
            assert_eq!(
                contact.email.as_deref(),
                Some("digital@pakenhamhospital.org.au")
            );
        }

        let license = doc.info.license;
        assert!(license.is_some());
        if let Some(license) = license {
            assert_eq!(license.identifier.as_deref(), Some("BSD-3-Clause"));
        }
    }

    #[test]
    fn openapi_paths_and_tags() {
        let doc = openapi();
        for path in [
            "/",
            "/health",
            "/login",
            "/logout",
            "/session",
            "/dashboard",
            "/appointments",
            "/enrollment",
            "/forms/{form}/steps/{step}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let tags = doc.tags.unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "forms"));
    }

    #[test]
    fn parse_author_variants() {
        assert_eq!(
            parse_author("Jane Doe <jane@example.org>"),
            (Some("Jane Doe"), Some("jane@example.org"))
        );
        assert_eq!(parse_author("Jane Doe"), (Some("Jane Doe"), None));
        assert_eq!(parse_author("<jane@example.org>"), (None, Some("jane@example.org")));
    }
}
