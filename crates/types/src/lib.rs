//! # Patients Types
//!
//! Wire and domain types shared by every crate in the workspace:
//! - [`Patient`] as returned by the REST backend
//! - [`CreatePatientRequest`] and [`UpdatePatientRequest`] as sent to it
//! - [`PatientStatus`], the closed set of lifecycle stages
//! - [`Address`] and display helpers used by the view layer
//!
//! Field names follow the backend's camelCase JSON; the identifier travels as `_id`.

mod patient;
mod status;

pub use patient::{Address, CreatePatientRequest, Patient, UpdatePatientRequest};
pub use status::PatientStatus;

/// Errors raised when converting raw values into typed patient data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    /// The status text is not one of the four known statuses.
    #[error("unknown patient status: {0}")]
    UnknownStatus(String),
}

/// Type alias for Results that can fail with a [`TypesError`].
pub type TypesResult<T> = Result<T, TypesError>;
