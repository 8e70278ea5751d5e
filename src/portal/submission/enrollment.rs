//! Patient enrollment.
//!
//! Format errors and uniqueness conflicts are reported together. Secrets are
//! hashed before they reach the store, and the insert either commits fully or
//! fails the request.

use chrono::{Local, NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tracing::info;

use super::{
    check,
    store::{PatientInsert, PatientStore},
};
use crate::portal::{
    credentials::hash_password,
    error::ApiError,
    form::FormFields,
    validation::{self, join_messages, FieldError, Violation, ENROLLMENT_PHONE_MIN_LEN},
    wizard::{FormWizard, Step},
};

pub const MSG_ENROLLED: &str = "Patient enrolled successfully";
pub const MSG_DUPLICATE_EMAIL: &str = "An account with this email address already exists";
pub const MSG_DUPLICATE_USERNAME: &str = "This username is already taken";
const VALIDATION_PREFIX: &str = "Validation errors: ";

const STEPS: &[Step] = &[
    Step::new(
        "personal",
        &["firstName", "lastName", "dateOfBirth", "gender"],
        validate_personal,
    ),
    Step::new(
        "contact",
        &[
            "email", "phone", "address", "city", "state", "postcode", "medicare",
        ],
        validate_contact,
    ),
    Step::new(
        "emergency",
        &["emergencyName1", "emergencyRelationship1", "emergencyPhone1"],
        validate_emergency,
    ),
    Step::new(
        "account",
        &[
            "username",
            "password",
            "confirmPassword",
            "securityQuestion",
            "securityAnswer",
            "termsConsent",
            "healthConsent",
        ],
        validate_account,
    ),
];

pub const ENROLLMENT_WIZARD: FormWizard = FormWizard::new("enrollment", STEPS);

/// A patient row ready for insertion. Holds hashes, never plaintext secrets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub medicare: Option<String>,
    pub emergency_name1: String,
    pub emergency_relationship1: String,
    pub emergency_phone1: String,
    pub username: String,
    pub password_hash: String,
    pub security_question: String,
    pub security_answer_hash: String,
    pub terms_consent: bool,
    pub health_consent: bool,
    pub created_at: String,
}

fn require(errors: &mut Vec<FieldError>, fields: &FormFields, field: &str, message: &'static str) {
    check(
        errors,
        field,
        validation::required(&fields.sanitized(field)),
        |_| message,
    );
}

fn validate_personal(fields: &FormFields, today: NaiveDate) -> Vec<FieldError> {
    let mut errors = Vec::new();
    require(&mut errors, fields, "firstName", "First name is required");
    require(&mut errors, fields, "lastName", "Last name is required");

    let dob = fields.sanitized("dateOfBirth");
    check(
        &mut errors,
        "dateOfBirth",
        validation::required(&dob).and_then(|()| validation::date_of_birth(&dob, today)),
        |violation| match violation {
            Violation::Required => "Date of birth is required",
            Violation::InFuture => "Date of birth cannot be in the future",
            _ => "Please enter a valid date of birth",
        },
    );

    require(&mut errors, fields, "gender", "Gender is required");
    errors
}

fn validate_contact(fields: &FormFields, _today: NaiveDate) -> Vec<FieldError> {
    let mut errors = Vec::new();
    check(
        &mut errors,
        "email",
        validation::email(&fields.sanitized("email")),
        |violation| match violation {
            Violation::Required => "Email is required",
            _ => "Please enter a valid email address",
        },
    );

    let phone = fields.sanitized("phone");
    check(
        &mut errors,
        "phone",
        validation::required(&phone)
            .and_then(|()| validation::phone(&phone, ENROLLMENT_PHONE_MIN_LEN)),
        |violation| match violation {
            Violation::Required => "Phone is required",
            _ => "Please enter a valid phone number",
        },
    );

    require(&mut errors, fields, "address", "Address is required");
    require(&mut errors, fields, "city", "City is required");
    require(&mut errors, fields, "state", "State is required");

    let postcode = fields.sanitized("postcode");
    check(
        &mut errors,
        "postcode",
        validation::required(&postcode).and_then(|()| validation::postcode(&postcode)),
        |violation| match violation {
            Violation::Required => "Postcode is required",
            _ => "Please enter a valid 4-digit postcode",
        },
    );

    let medicare = fields.sanitized("medicare");
    if !medicare.is_empty() {
        check(
            &mut errors,
            "medicare",
            validation::medicare(&medicare),
            |_| "Please enter a valid Medicare number",
        );
    }
    errors
}

fn validate_emergency(fields: &FormFields, _today: NaiveDate) -> Vec<FieldError> {
    let mut errors = Vec::new();
    require(
        &mut errors,
        fields,
        "emergencyName1",
        "Emergency contact name is required",
    );
    require(
        &mut errors,
        fields,
        "emergencyRelationship1",
        "Emergency contact relationship is required",
    );

    let phone = fields.sanitized("emergencyPhone1");
    check(
        &mut errors,
        "emergencyPhone1",
        validation::required(&phone)
            .and_then(|()| validation::phone(&phone, ENROLLMENT_PHONE_MIN_LEN)),
        |violation| match violation {
            Violation::Required => "Emergency contact phone is required",
            _ => "Please enter a valid emergency contact phone number",
        },
    );
    errors
}

fn validate_account(fields: &FormFields, _today: NaiveDate) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let username = fields.sanitized("username");
    check(
        &mut errors,
        "username",
        validation::required(&username).and_then(|()| validation::username(&username)),
        |violation| match violation {
            Violation::Required => "Username is required",
            _ => "Username must be at least 3 characters long",
        },
    );

    // Secrets are checked raw; they are hashed, never echoed.
    let password = fields.raw("password");
    check(
        &mut errors,
        "password",
        validation::required(password)
            .and_then(|()| validation::password_length(password))
            .and_then(|()| validation::password_complexity(password)),
        |violation| match violation {
            Violation::Required => "Password is required",
            Violation::TooShort(_) => "Password must be at least 8 characters long",
            _ => {
                "Password must contain at least one uppercase letter, one lowercase letter, and one number"
            }
        },
    );

    let confirm = fields.raw("confirmPassword");
    check(
        &mut errors,
        "confirmPassword",
        validation::required(confirm).and_then(|()| validation::confirmation(password, confirm)),
        |violation| match violation {
            Violation::Required => "Confirm password is required",
            _ => "Passwords do not match",
        },
    );

    require(
        &mut errors,
        fields,
        "securityQuestion",
        "Security question is required",
    );
    check(
        &mut errors,
        "securityAnswer",
        validation::required(fields.raw("securityAnswer")),
        |_| "Security answer is required",
    );

    check(
        &mut errors,
        "termsConsent",
        validation::consent(fields.raw("termsConsent")),
        |_| "Terms consent must be accepted",
    );
    check(
        &mut errors,
        "healthConsent",
        validation::consent(fields.raw("healthConsent")),
        |_| "Health consent must be accepted",
    );
    errors
}

pub struct EnrollmentService {
    store: Arc<dyn PatientStore>,
}

impl EnrollmentService {
    #[must_use]
    pub fn new(store: Arc<dyn PatientStore>) -> Self {
        Self { store }
    }

    /// Validate and enroll a patient.
    ///
    /// # Errors
    /// `Validation` with every format and uniqueness error, or `Persistence`
    /// when the store fails.
    pub async fn enroll(&self, fields: &FormFields) -> Result<(), ApiError> {
        self.enroll_at(fields, Local::now().naive_local()).await
    }

    pub(crate) async fn enroll_at(
        &self,
        fields: &FormFields,
        now: NaiveDateTime,
    ) -> Result<(), ApiError> {
        let mut errors = ENROLLMENT_WIZARD.validate_all(fields, now.date());

        let email = fields.sanitized("email");
        let username = fields.sanitized("username");

        if validation::email(&email).is_ok()
            && self
                .store
                .email_exists(&email)
                .await
                .map_err(ApiError::Persistence)?
        {
            errors.push(FieldError::new("email", MSG_DUPLICATE_EMAIL));
        }
        if validation::username(&username).is_ok()
            && self
                .store
                .username_exists(&username)
                .await
                .map_err(ApiError::Persistence)?
        {
            errors.push(FieldError::new("username", MSG_DUPLICATE_USERNAME));
        }

        if !errors.is_empty() {
            return Err(validation_failure(errors));
        }

        let medicare = fields.sanitized("medicare");
        let patient = NewPatient {
            first_name: fields.sanitized("firstName"),
            last_name: fields.sanitized("lastName"),
            date_of_birth: fields.sanitized("dateOfBirth"),
            gender: fields.sanitized("gender"),
            email,
            phone: fields.sanitized("phone"),
            address: fields.sanitized("address"),
            city: fields.sanitized("city"),
            state: fields.sanitized("state"),
            postcode: fields.sanitized("postcode"),
            medicare: (!medicare.is_empty()).then_some(medicare),
            emergency_name1: fields.sanitized("emergencyName1"),
            emergency_relationship1: fields.sanitized("emergencyRelationship1"),
            emergency_phone1: fields.sanitized("emergencyPhone1"),
            username,
            password_hash: hash_password(fields.raw("password")).map_err(ApiError::Persistence)?,
            security_question: fields.sanitized("securityQuestion"),
            security_answer_hash: hash_password(fields.raw("securityAnswer").trim())
                .map_err(ApiError::Persistence)?,
            terms_consent: true,
            health_consent: true,
            created_at: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        };

        match self
            .store
            .insert(&patient)
            .await
            .map_err(ApiError::Persistence)?
        {
            PatientInsert::Created => {
                info!(username = %patient.username, "patient enrolled");
                Ok(())
            }
            PatientInsert::DuplicateEmail => Err(validation_failure(vec![FieldError::new(
                "email",
                MSG_DUPLICATE_EMAIL,
            )])),
            PatientInsert::DuplicateUsername => Err(validation_failure(vec![FieldError::new(
                "username",
                MSG_DUPLICATE_USERNAME,
            )])),
        }
    }
}

fn validation_failure(errors: Vec<FieldError>) -> ApiError {
    ApiError::validation(
        format!("{VALIDATION_PREFIX}{}", join_messages(&errors)),
        errors,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::{
        credentials::verify_password, submission::store::memory::MemoryPatientStore,
    };
    use anyhow::Result;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .and_then(|date| date.and_hms_opt(8, 0, 0))
            .unwrap_or_default()
    }

    fn valid_fields() -> Vec<(&'static str, &'static str)> {
        vec![
            ("firstName", "Sarah"),
            ("lastName", "Johnson"),
            ("dateOfBirth", "1985-06-15"),
            ("gender", "female"),
            ("email", "sarah.johnson@email.com"),
            ("phone", "0412 345 678"),
            ("address", "123 Main Street"),
            ("city", "Pakenham"),
            ("state", "VIC"),
            ("postcode", "3810"),
            ("medicare", "1234 56789 0"),
            ("emergencyName1", "John Johnson"),
            ("emergencyRelationship1", "Husband"),
            ("emergencyPhone1", "0413 456 789"),
            ("username", "sjohnson"),
            ("password", "Abc12345"),
            ("confirmPassword", "Abc12345"),
            ("securityQuestion", "First pet?"),
            ("securityAnswer", "Rex"),
            ("termsConsent", "1"),
            ("healthConsent", "1"),
        ]
    }

    fn with(overrides: &[(&'static str, &'static str)]) -> FormFields {
        let mut pairs = valid_fields();
        for (key, value) in overrides {
            if let Some(pair) = pairs.iter_mut().find(|(k, _)| k == key) {
                pair.1 = *value;
            }
        }
        pairs.into_iter().collect()
    }

    fn messages(err: &ApiError) -> Vec<String> {
        match err {
            ApiError::Validation { errors, .. } => {
                errors.iter().map(|e| e.message.clone()).collect()
            }
            _ => Vec::new(),
        }
    }

    #[tokio::test]
    async fn enrolls_and_hashes_secrets() -> Result<()> {
        let store = Arc::new(MemoryPatientStore::default());
        let service = EnrollmentService::new(store.clone());
        service.enroll_at(&with(&[]), now()).await?;

        let patients = store.patients.lock().map_err(|_| anyhow::anyhow!("poisoned"))?;
        let patient = &patients[0];
        assert_ne!(patient.password_hash, "Abc12345");
        assert!(verify_password("Abc12345", &patient.password_hash)?);
        assert!(verify_password("Rex", &patient.security_answer_hash)?);
        assert_eq!(patient.medicare.as_deref(), Some("1234 56789 0"));
        assert_eq!(patient.created_at, "2026-10-19 08:00:00");
        Ok(())
    }

    #[tokio::test]
    async fn lowercase_only_password_fails_complexity() -> Result<()> {
        let service = EnrollmentService::new(Arc::new(MemoryPatientStore::default()));
        let err = service
            .enroll_at(
                &with(&[("password", "abc12345"), ("confirmPassword", "abc12345")]),
                now(),
            )
            .await;
        let Err(err) = err else {
            panic!("expected rejection");
        };
        assert_eq!(
            messages(&err),
            vec![
                "Password must contain at least one uppercase letter, one lowercase letter, and one number"
                    .to_string()
            ]
        );
        assert!(err.to_string().starts_with("Validation errors: "));
        Ok(())
    }

    #[tokio::test]
    async fn both_duplicates_reported_together() -> Result<()> {
        let store = Arc::new(MemoryPatientStore::with_patient(
            "sarah.johnson@email.com",
            "sjohnson",
        ));
        let service = EnrollmentService::new(store.clone());
        let Err(err) = service.enroll_at(&with(&[]), now()).await else {
            panic!("expected rejection");
        };
        assert_eq!(
            messages(&err),
            vec![
                MSG_DUPLICATE_EMAIL.to_string(),
                MSG_DUPLICATE_USERNAME.to_string()
            ]
        );
        assert_eq!(store.count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn format_and_duplicate_errors_combine() -> Result<()> {
        let store = Arc::new(MemoryPatientStore::with_patient("other@email.com", "sjohnson"));
        let service = EnrollmentService::new(store);
        let Err(err) = service
            .enroll_at(&with(&[("postcode", "38100"), ("termsConsent", "0")]), now())
            .await
        else {
            panic!("expected rejection");
        };
        assert_eq!(
            messages(&err),
            vec![
                "Please enter a valid 4-digit postcode".to_string(),
                "Terms consent must be accepted".to_string(),
                MSG_DUPLICATE_USERNAME.to_string(),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn date_of_birth_rules() -> Result<()> {
        let service = EnrollmentService::new(Arc::new(MemoryPatientStore::default()));
        let Err(future) = service
            .enroll_at(&with(&[("dateOfBirth", "2030-01-01")]), now())
            .await
        else {
            panic!("expected rejection");
        };
        assert_eq!(
            messages(&future),
            vec!["Date of birth cannot be in the future".to_string()]
        );

        let Err(ancient) = service
            .enroll_at(&with(&[("dateOfBirth", "1890-01-01")]), now())
            .await
        else {
            panic!("expected rejection");
        };
        assert_eq!(
            messages(&ancient),
            vec!["Please enter a valid date of birth".to_string()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn insert_failure_is_persistence_error() -> Result<()> {
        let service = EnrollmentService::new(Arc::new(MemoryPatientStore::failing()));
        let result = service.enroll_at(&with(&[]), now()).await;
        assert!(matches!(result, Err(ApiError::Persistence(_))));
        Ok(())
    }

    #[test]
    fn wizard_has_four_steps_and_optional_medicare() {
        assert_eq!(ENROLLMENT_WIZARD.step_count(), 4);
        let fields = with(&[("medicare", "")]);
        let report = ENROLLMENT_WIZARD.validate_step(2, &fields, now().date());
        assert!(report.is_some_and(|r| r.is_valid()));

        let bad = with(&[("confirmPassword", "Abc12346")]);
        let report = ENROLLMENT_WIZARD.validate_step(4, &bad, now().date());
        let messages: Vec<String> = report
            .map(|r| r.errors.into_iter().map(|e| e.message).collect())
            .unwrap_or_default();
        assert_eq!(messages, vec!["Passwords do not match".to_string()]);
    }
}
