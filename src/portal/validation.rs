//! Field validation rules shared by login, appointment and enrollment.
//!
//! Every rule is a pure function over an already sanitized value and returns
//! a [`Violation`]; the caller decides which message to attach to it since the
//! same rule is worded differently on each form.

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use utoipa::ToSchema;

pub const LOGIN_PASSWORD_MIN_LEN: usize = 3;
pub const ENROLLMENT_PASSWORD_MIN_LEN: usize = 8;
pub const APPOINTMENT_PHONE_MIN_LEN: usize = 10;
pub const ENROLLMENT_PHONE_MIN_LEN: usize = 8;
pub const USERNAME_MIN_LEN: usize = 3;
pub const MAX_AGE_YEARS: u32 = 120;

const PASSWORD_SYMBOLS: &str = "@$!%*?&";

/// Why a single field failed its rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    Required,
    Format,
    TooShort(usize),
    Complexity,
    Mismatch,
    InFuture,
    TooOld,
    NotAccepted,
}

/// A violation bound to a form field, in the shape the front-end expects.
#[derive(ToSchema, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Join messages the way the JSON `message` field reports them.
#[must_use]
pub fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|error| error.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Trim surrounding whitespace and escape markup-significant characters.
#[must_use]
pub fn sanitize(input: &str) -> String {
    let trimmed = input.trim();
    let mut out = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn required(value: &str) -> Result<(), Violation> {
    if value.trim().is_empty() {
        Err(Violation::Required)
    } else {
        Ok(())
    }
}

pub fn email(value: &str) -> Result<(), Violation> {
    required(value)?;
    if Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(value)) {
        Ok(())
    } else {
        Err(Violation::Format)
    }
}

pub fn login_password(value: &str) -> Result<(), Violation> {
    required(value)?;
    min_len(value, LOGIN_PASSWORD_MIN_LEN)
}

pub fn min_len(value: &str, min: usize) -> Result<(), Violation> {
    if value.chars().count() < min {
        Err(Violation::TooShort(min))
    } else {
        Ok(())
    }
}

pub fn password_length(value: &str) -> Result<(), Violation> {
    min_len(value, ENROLLMENT_PASSWORD_MIN_LEN)
}

/// Lowercase, uppercase and digit present; only letters, digits and `@$!%*?&`.
pub fn password_complexity(value: &str) -> Result<(), Violation> {
    let allowed = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SYMBOLS.contains(c));
    let has_lower = value.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = value.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = value.chars().any(|c| c.is_ascii_digit());

    if allowed
        && has_lower
        && has_upper
        && has_digit
        && value.chars().count() >= ENROLLMENT_PASSWORD_MIN_LEN
    {
        Ok(())
    } else {
        Err(Violation::Complexity)
    }
}

pub fn confirmation(password: &str, confirm: &str) -> Result<(), Violation> {
    if password == confirm {
        Ok(())
    } else {
        Err(Violation::Mismatch)
    }
}

pub fn phone(value: &str, min: usize) -> Result<(), Violation> {
    let pattern = format!(r"^\+?[0-9\s\-()]{{{min},}}$");
    if Regex::new(&pattern).is_ok_and(|re| re.is_match(value)) {
        Ok(())
    } else {
        Err(Violation::Format)
    }
}

pub fn postcode(value: &str) -> Result<(), Violation> {
    if Regex::new(r"^[0-9]{4}$").is_ok_and(|re| re.is_match(value)) {
        Ok(())
    } else {
        Err(Violation::Format)
    }
}

pub fn medicare(value: &str) -> Result<(), Violation> {
    if Regex::new(r"^[0-9]{4} ?[0-9]{5} ?[0-9]$").is_ok_and(|re| re.is_match(value)) {
        Ok(())
    } else {
        Err(Violation::Format)
    }
}

/// Strict `YYYY-MM-DD`; the value must format back to itself.
pub fn parse_iso_date(value: &str) -> Result<NaiveDate, Violation> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| Violation::Format)?;
    if date.format("%Y-%m-%d").to_string() == value {
        Ok(date)
    } else {
        Err(Violation::Format)
    }
}

pub fn iso_date(value: &str) -> Result<(), Violation> {
    parse_iso_date(value).map(|_| ())
}

pub fn date_of_birth(value: &str, today: NaiveDate) -> Result<(), Violation> {
    let dob = parse_iso_date(value)?;
    match today.years_since(dob) {
        None => Err(Violation::InFuture),
        Some(age) if age > MAX_AGE_YEARS => Err(Violation::TooOld),
        Some(_) => Ok(()),
    }
}

pub fn username(value: &str) -> Result<(), Violation> {
    min_len(value, USERNAME_MIN_LEN)
}

/// Checkbox markers browsers and the portal front-end send for a ticked box.
pub fn consent(value: &str) -> Result<(), Violation> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "on" | "true" | "yes" => Ok(()),
        _ => Err(Violation::NotAccepted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }

    #[test]
    fn sanitize_trims_and_escapes_markup() {
        assert_eq!(
            sanitize("  <b>\"Tom\" & 'Jerry'</b> "),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#039;Jerry&#039;&lt;/b&gt;"
        );
        assert_eq!(sanitize("plain"), "plain");
    }

    #[test]
    fn email_rejects_missing_parts() {
        assert_eq!(email(""), Err(Violation::Required));
        assert_eq!(email("user.example.com"), Err(Violation::Format));
        assert_eq!(email("user@example"), Err(Violation::Format));
        assert_eq!(email("user@example."), Err(Violation::Format));
        assert_eq!(email("@example.com"), Err(Violation::Format));
        assert_eq!(email("user@example.com"), Ok(()));
        assert_eq!(email("name.surname@mail.example.co"), Ok(()));
    }

    #[test]
    fn login_password_requires_three_characters() {
        assert_eq!(login_password(""), Err(Violation::Required));
        assert_eq!(login_password("ab"), Err(Violation::TooShort(3)));
        assert_eq!(login_password("abc"), Ok(()));
    }

    #[test]
    fn password_complexity_requires_mixed_case_and_digit() {
        assert_eq!(password_complexity("abc12345"), Err(Violation::Complexity));
        assert_eq!(password_complexity("ABC12345"), Err(Violation::Complexity));
        assert_eq!(password_complexity("Abcdefgh"), Err(Violation::Complexity));
        assert_eq!(password_complexity("Abc12345"), Ok(()));
        assert_eq!(password_complexity("Abc1234@$!"), Ok(()));
        assert_eq!(password_complexity("Abc 12345"), Err(Violation::Complexity));
        assert_eq!(password_complexity("Abc1#2345"), Err(Violation::Complexity));
        assert_eq!(password_complexity("Ab1"), Err(Violation::Complexity));
    }

    #[test]
    fn password_length_and_confirmation() {
        assert_eq!(password_length("Abc1234"), Err(Violation::TooShort(8)));
        assert_eq!(password_length("Abc12345"), Ok(()));
        assert_eq!(confirmation("Abc12345", "Abc12345"), Ok(()));
        assert_eq!(confirmation("Abc12345", "abc12345"), Err(Violation::Mismatch));
    }

    #[test]
    fn phone_minimum_differs_per_form() {
        assert_eq!(phone("0412 345 678", APPOINTMENT_PHONE_MIN_LEN), Ok(()));
        assert_eq!(phone("+61 (3) 9555-0100", APPOINTMENT_PHONE_MIN_LEN), Ok(()));
        assert_eq!(phone("9555 0100", APPOINTMENT_PHONE_MIN_LEN), Err(Violation::Format));
        assert_eq!(phone("9555 0100", ENROLLMENT_PHONE_MIN_LEN), Ok(()));
        assert_eq!(phone("0412-abc-678", ENROLLMENT_PHONE_MIN_LEN), Err(Violation::Format));
        assert_eq!(phone("++0412345678", ENROLLMENT_PHONE_MIN_LEN), Err(Violation::Format));
    }

    #[test]
    fn postcode_and_medicare_shapes() {
        assert_eq!(postcode("3810"), Ok(()));
        assert_eq!(postcode("381"), Err(Violation::Format));
        assert_eq!(postcode("38100"), Err(Violation::Format));
        assert_eq!(medicare("1234 56789 0"), Ok(()));
        assert_eq!(medicare("1234567890"), Ok(()));
        assert_eq!(medicare("1234  56789 0"), Err(Violation::Format));
        assert_eq!(medicare("1234 5678 0"), Err(Violation::Format));
    }

    #[test]
    fn iso_date_is_strict() {
        assert_eq!(iso_date("2025-02-28"), Ok(()));
        assert_eq!(iso_date("2025-02-30"), Err(Violation::Format));
        assert_eq!(iso_date("2025-2-3"), Err(Violation::Format));
        assert_eq!(iso_date("28/02/2025"), Err(Violation::Format));
    }

    #[test]
    fn date_of_birth_bounds() {
        let today = day(2026, 10, 19);
        assert_eq!(date_of_birth("1985-06-15", today), Ok(()));
        assert_eq!(date_of_birth("2026-10-19", today), Ok(()));
        assert_eq!(date_of_birth("2026-10-20", today), Err(Violation::InFuture));
        assert_eq!(date_of_birth("1906-10-19", today), Ok(()));
        assert_eq!(date_of_birth("1905-10-18", today), Err(Violation::TooOld));
        assert_eq!(date_of_birth("not-a-date", today), Err(Violation::Format));
    }

    #[test]
    fn username_required_and_consent() {
        assert_eq!(required("   "), Err(Violation::Required));
        assert_eq!(required(" x "), Ok(()));
        assert_eq!(username("ab"), Err(Violation::TooShort(3)));
        assert_eq!(username("abc"), Ok(()));
        assert_eq!(consent("1"), Ok(()));
        assert_eq!(consent("on"), Ok(()));
        assert_eq!(consent("0"), Err(Violation::NotAccepted));
        assert_eq!(consent(""), Err(Violation::NotAccepted));
    }

    #[test]
    fn join_messages_uses_comma_separator() {
        let errors = vec![
            FieldError::new("email", "Email is required"),
            FieldError::new("password", "Password is required"),
        ];
        assert_eq!(
            join_messages(&errors),
            "Email is required, Password is required"
        );
    }
}
