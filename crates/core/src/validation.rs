//! Patient form validation.
//!
//! Candidate records arrive with an unknown shape (whatever the form or the command line
//! produced) as a [`serde_json::Value`]. Validation never panics on malformed input: it returns
//! either the typed request or a [`ValidationErrors`] list keyed by field, so a caller can attach
//! each message to the matching input control.
//!
//! Each field reports at most one message: the first rule it violates.

use crate::constants::MAX_AGE_YEARS;
use chrono::{DateTime, Datelike, Local, NaiveDate};
use patients_types::{CreatePatientRequest, PatientStatus, UpdatePatientRequest};
use serde_json::{Map, Value};

const STATUS_MESSAGE: &str = "Please select a valid status";
const DATE_OF_BIRTH_MESSAGE: &str =
    "Please enter a valid date of birth (must be earlier than today and age must be between 0 and 120)";

/// A validated patient form field, keyed by its wire name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    FirstName,
    MiddleName,
    LastName,
    DateOfBirth,
    Status,
    Street,
    City,
    State,
    ZipCode,
}

impl Field {
    /// Every field in form order.
    pub const ALL: [Field; 9] = [
        Field::FirstName,
        Field::MiddleName,
        Field::LastName,
        Field::DateOfBirth,
        Field::Status,
        Field::Street,
        Field::City,
        Field::State,
        Field::ZipCode,
    ];

    /// The camelCase key used on the wire and as the error path.
    pub fn as_str(self) -> &'static str {
        match self {
            Field::FirstName => "firstName",
            Field::MiddleName => "middleName",
            Field::LastName => "lastName",
            Field::DateOfBirth => "dateOfBirth",
            Field::Status => "status",
            Field::Street => "street",
            Field::City => "city",
            Field::State => "state",
            Field::ZipCode => "zipCode",
        }
    }

    /// Human label used at the start of messages.
    fn label(self) -> &'static str {
        match self {
            Field::FirstName => "First name",
            Field::MiddleName => "Middle name",
            Field::LastName => "Last name",
            Field::DateOfBirth => "Date of birth",
            Field::Status => "Status",
            Field::Street => "Street address",
            Field::City => "City",
            Field::State => "State",
            Field::ZipCode => "ZIP code",
        }
    }

    fn is_optional(self) -> bool {
        matches!(self, Field::MiddleName)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One violated rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

/// Field-level validation failures, in form order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    fn push(&mut self, field: Field, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// The message recorded for `field`, if it failed.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn contains(&self, field: Field) -> bool {
        self.get(field).is_some()
    }

    /// Fields that failed, in form order.
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.errors.iter().map(|e| e.field)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.errors.iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Validate a candidate create form against today's local date.
pub fn validate_create_patient(input: &Value) -> Result<CreatePatientRequest, ValidationErrors> {
    validate_create_patient_on(input, Local::now().date_naive())
}

/// Validate a candidate create form, treating `today` as the current date.
///
/// A non-object input fails every required field.
pub fn validate_create_patient_on(
    input: &Value,
    today: NaiveDate,
) -> Result<CreatePatientRequest, ValidationErrors> {
    let obj = input.as_object();
    let mut errors = ValidationErrors::default();

    let first_name = take_field(obj, Field::FirstName, today, &mut errors);
    let middle_name = take_field(obj, Field::MiddleName, today, &mut errors);
    let last_name = take_field(obj, Field::LastName, today, &mut errors);
    let date_of_birth = take_field(obj, Field::DateOfBirth, today, &mut errors);
    let status = take_status(obj, &mut errors);
    let street = take_field(obj, Field::Street, today, &mut errors);
    let city = take_field(obj, Field::City, today, &mut errors);
    let state = take_field(obj, Field::State, today, &mut errors);
    let zip_code = take_field(obj, Field::ZipCode, today, &mut errors);

    // A required field only comes back as `None` after recording its violation.
    let (
        Some(first_name),
        Some(last_name),
        Some(date_of_birth),
        Some(status),
        Some(street),
        Some(city),
        Some(state),
        Some(zip_code),
    ) = (
        first_name,
        last_name,
        date_of_birth,
        status,
        street,
        city,
        state,
        zip_code,
    )
    else {
        tracing::debug!("patient form rejected: {}", errors);
        return Err(errors);
    };

    if !errors.is_empty() {
        tracing::debug!("patient form rejected: {}", errors);
        return Err(errors);
    }

    Ok(CreatePatientRequest {
        first_name,
        middle_name,
        last_name,
        date_of_birth,
        status,
        street,
        city,
        state,
        zip_code,
    })
}

/// Validate a candidate partial update against today's local date.
pub fn validate_update_patient(input: &Value) -> Result<UpdatePatientRequest, ValidationErrors> {
    validate_update_patient_on(input, Local::now().date_naive())
}

/// Validate a candidate partial update. Only fields present (and non-null) are checked.
pub fn validate_update_patient_on(
    input: &Value,
    today: NaiveDate,
) -> Result<UpdatePatientRequest, ValidationErrors> {
    let Some(obj) = input.as_object() else {
        let mut errors = ValidationErrors::default();
        for field in Field::ALL.into_iter().filter(|f| !f.is_optional()) {
            errors.push(field, format!("{} must be text", field.label()));
        }
        return Err(errors);
    };

    let mut errors = ValidationErrors::default();
    let obj = Some(obj);
    let present = |field: Field| !matches!(lookup(obj, field), Lookup::Absent);
    let patch = |field: Field, errors: &mut ValidationErrors| {
        present(field)
            .then(|| take_field(obj, field, today, errors))
            .flatten()
    };

    let update = UpdatePatientRequest {
        first_name: patch(Field::FirstName, &mut errors),
        middle_name: patch(Field::MiddleName, &mut errors),
        last_name: patch(Field::LastName, &mut errors),
        date_of_birth: patch(Field::DateOfBirth, &mut errors),
        status: present(Field::Status)
            .then(|| take_status(obj, &mut errors))
            .flatten(),
        street: patch(Field::Street, &mut errors),
        city: patch(Field::City, &mut errors),
        state: patch(Field::State, &mut errors),
        zip_code: patch(Field::ZipCode, &mut errors),
    };

    if errors.is_empty() {
        Ok(update)
    } else {
        Err(errors)
    }
}

enum Lookup<'a> {
    Absent,
    NotText,
    Text(&'a str),
}

fn lookup<'a>(obj: Option<&'a Map<String, Value>>, field: Field) -> Lookup<'a> {
    match obj.and_then(|o| o.get(field.as_str())) {
        None | Some(Value::Null) => Lookup::Absent,
        Some(Value::String(s)) => Lookup::Text(s),
        Some(_) => Lookup::NotText,
    }
}

/// Read and check the status, recording its violation in `errors`.
fn take_status(
    obj: Option<&Map<String, Value>>,
    errors: &mut ValidationErrors,
) -> Option<PatientStatus> {
    let status = match lookup(obj, Field::Status) {
        Lookup::NotText => {
            errors.push(Field::Status, format!("{} must be text", Field::Status.label()));
            return None;
        }
        Lookup::Absent => None,
        Lookup::Text(s) => PatientStatus::from_wire(s),
    };
    if status.is_none() {
        errors.push(Field::Status, STATUS_MESSAGE);
    }
    status
}

/// Read and check one text field, recording its first violation in `errors`.
///
/// A required field yields `None` only after its violation is recorded.
fn take_field(
    obj: Option<&Map<String, Value>>,
    field: Field,
    today: NaiveDate,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let value = match lookup(obj, field) {
        Lookup::Absent if field.is_optional() => return None,
        Lookup::Absent => "",
        Lookup::NotText => {
            errors.push(field, format!("{} must be text", field.label()));
            return None;
        }
        Lookup::Text(s) if s.is_empty() && field.is_optional() => return None,
        Lookup::Text(s) => s,
    };

    match check_value(field, value, today) {
        Ok(()) => Some(value.to_string()),
        Err(message) => {
            errors.push(field, message);
            None
        }
    }
}

struct TextRule {
    min: usize,
    max: usize,
    allowed: fn(char) -> bool,
    charset: &'static str,
}

fn is_letter_or_space(c: char) -> bool {
    c.is_ascii_alphabetic() || c.is_whitespace()
}

fn is_alphanumeric_or_space(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_whitespace()
}

fn text_rule(field: Field) -> Option<TextRule> {
    let letters = |min, max| TextRule {
        min,
        max,
        allowed: is_letter_or_space,
        charset: "can only contain letters and spaces",
    };

    match field {
        Field::FirstName | Field::LastName | Field::City => Some(letters(2, 50)),
        Field::MiddleName => Some(letters(1, 50)),
        Field::Street => Some(TextRule {
            min: 5,
            max: 100,
            allowed: is_alphanumeric_or_space,
            charset: "can only contain letters, numbers, and spaces",
        }),
        Field::DateOfBirth | Field::Status | Field::State | Field::ZipCode => None,
    }
}

fn check_value(field: Field, value: &str, today: NaiveDate) -> Result<(), String> {
    let label = field.label();

    if value.is_empty() {
        return Err(format!("{label} is required"));
    }

    match field {
        Field::DateOfBirth => check_date_of_birth(value, today),
        Field::State => check_state(value),
        Field::ZipCode => check_zip_code(value),
        _ => match text_rule(field) {
            Some(rule) => check_text(label, value, &rule),
            None => Ok(()),
        },
    }
}

fn check_text(label: &str, value: &str, rule: &TextRule) -> Result<(), String> {
    let len = value.chars().count();
    if len < rule.min {
        return Err(format!(
            "{label} must be at least {} character{}",
            rule.min,
            if rule.min == 1 { "" } else { "s" }
        ));
    }
    if len > rule.max {
        return Err(format!("{label} must be less than {} characters", rule.max));
    }
    if !value.chars().all(rule.allowed) {
        return Err(format!("{label} {}", rule.charset));
    }
    Ok(())
}

fn check_state(value: &str) -> Result<(), String> {
    if value.chars().count() != 2 {
        return Err("State must be exactly 2 characters".into());
    }
    if !value.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err("State must be a valid 2-letter state code".into());
    }
    Ok(())
}

/// `12345` or `12345-6789`.
fn check_zip_code(value: &str) -> Result<(), String> {
    let digits = |s: &str, n: usize| s.len() == n && s.bytes().all(|b| b.is_ascii_digit());

    let ok = match value.split_once('-') {
        None => digits(value, 5),
        Some((head, tail)) => digits(head, 5) && digits(tail, 4),
    };

    if ok {
        Ok(())
    } else {
        Err("ZIP code must be in format 12345 or 12345-6789".into())
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, whose calendar date is used.
fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

fn check_date_of_birth(value: &str, today: NaiveDate) -> Result<(), String> {
    let valid = parse_date(value)
        .is_some_and(|dob| dob < today && today.year() - dob.year() <= MAX_AGE_YEARS);

    if valid {
        Ok(())
    } else {
        Err(DATE_OF_BIRTH_MESSAGE.into())
    }
}
