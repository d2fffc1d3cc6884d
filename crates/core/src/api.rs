//! Contract between the store and the patients backend.
//!
//! The store only ever talks to the backend through [`PatientApi`], so the HTTP client can be
//! swapped for an in-memory implementation in tests.

use crate::error::ApiResult;
use patients_types::{CreatePatientRequest, Patient, UpdatePatientRequest};
use std::future::Future;

/// The five REST operations of the patients backend.
///
/// Every method performs one round trip and propagates transport and server errors unchanged.
pub trait PatientApi {
    /// `POST /patients`: persist a new patient; the result carries the assigned identifier.
    fn create_patient(
        &self,
        request: &CreatePatientRequest,
    ) -> impl Future<Output = ApiResult<Patient>> + Send;

    /// `GET /patients`: the full collection in backend order.
    fn list_patients(&self) -> impl Future<Output = ApiResult<Vec<Patient>>> + Send;

    /// `GET /patients/{id}`: one patient, or [`ApiError::NotFound`](crate::ApiError::NotFound).
    fn get_patient(&self, id: &str) -> impl Future<Output = ApiResult<Patient>> + Send;

    /// `PUT /patients/{id}`: apply a partial update and return the stored result.
    fn update_patient(
        &self,
        id: &str,
        request: &UpdatePatientRequest,
    ) -> impl Future<Output = ApiResult<Patient>> + Send;

    /// `DELETE /patients/{id}`: remove a patient. No body on success.
    fn delete_patient(&self, id: &str) -> impl Future<Output = ApiResult<()>> + Send;
}
