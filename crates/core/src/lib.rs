//! # Patients Core
//!
//! Client-side data layer of the patient dashboard.
//!
//! This crate contains:
//! - Field validation for the create and update forms ([`validation`])
//! - The patient store: state, actions, reducer and async operations ([`store`])
//! - The [`PatientApi`] contract the store drives
//! - Startup configuration and the error taxonomy
//! - Search and status summaries for the list view ([`listing`])
//!
//! **No transport concerns**: the HTTP implementation of [`PatientApi`] lives in
//! `patients-client`; rendering lives in `patients-cli`.

pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod listing;
pub mod store;
pub mod validation;

pub use api::PatientApi;
pub use config::{CoreConfig, DetailLifecycle, StaleResponses, StoreConfig};
pub use error::{ApiError, ApiResult, PatientError, PatientResult};
pub use listing::{filter_patients, status_counts, StatusFilter};
pub use store::{reduce, Family, Lifecycle, PatientAction, PatientState, PatientStore};
pub use validation::{
    validate_create_patient, validate_update_patient, Field, FieldError, ValidationErrors,
};

pub use patients_types::{
    Address, CreatePatientRequest, Patient, PatientStatus, UpdatePatientRequest,
};
