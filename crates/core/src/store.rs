//! Patient store.
//!
//! Client-side state for the dashboard: the patient collection, the patient currently on
//! screen, and one loading/error pair per family of async operations.
//!
//! ## Shape
//!
//! - [`PatientState`] is plain data.
//! - [`PatientAction`] names every transition; [`reduce`] applies one.
//! - [`PatientStore`] owns a state, an API handle and a [`StoreConfig`], and runs each async
//!   operation as Pending, then one round trip, then Fulfilled or Rejected.
//!
//! ## Families
//!
//! | Family  | Operations                                  |
//! |---------|---------------------------------------------|
//! | List    | fetch all; fetch one when detail is shared  |
//! | Create  | create                                      |
//! | Detail  | fetch one when detail is separate           |
//!
//! Families never touch each other's loading flag. Update and delete have no family: their
//! failures are returned to the caller and leave the state untouched.
//!
//! ## Overlapping calls
//!
//! Operations take `&self`, so several may be in flight on one task (for example two
//! refreshes joined together). Every Pending bumps a per-operation request counter. With
//! [`StaleResponses::LastResponseWins`] outcomes are applied in arrival order; with
//! [`StaleResponses::Ignore`] a fetch outcome is dropped unless it answers the latest request
//! of its operation. Create successes are always stored, since each one is a distinct record;
//! only the create family and the selection follow the latest create.

use crate::api::PatientApi;
use crate::config::{DetailLifecycle, StaleResponses, StoreConfig};
use crate::constants::{
    CREATE_FAILED, DELETE_FAILED, FETCH_ALL_FAILED, FETCH_ONE_FAILED, UPDATE_FAILED,
};
use crate::error::ApiResult;
use patients_types::{CreatePatientRequest, Patient, UpdatePatientRequest};
use std::cell::{Ref, RefCell};

/// A group of operations sharing one loading/error pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    List,
    Create,
    Detail,
}

/// Operations tracked by request counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    FetchAll,
    FetchOne,
}

/// Monotonically increasing identifier of an issued request, per [`Operation`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

/// Loading flag and last error message of one family.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Lifecycle {
    pub loading: bool,
    pub error: Option<String>,
}

impl Lifecycle {
    fn pending(&mut self) {
        self.loading = true;
        self.error = None;
    }

    fn fulfilled(&mut self) {
        self.loading = false;
    }

    fn rejected(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct RequestCounters {
    create: u64,
    fetch_all: u64,
    fetch_one: u64,
}

impl RequestCounters {
    fn slot(&mut self, op: Operation) -> &mut u64 {
        match op {
            Operation::Create => &mut self.create,
            Operation::FetchAll => &mut self.fetch_all,
            Operation::FetchOne => &mut self.fetch_one,
        }
    }

    fn latest(&self, op: Operation) -> RequestId {
        RequestId(match op {
            Operation::Create => self.create,
            Operation::FetchAll => self.fetch_all,
            Operation::FetchOne => self.fetch_one,
        })
    }
}

/// Everything the dashboard renders.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatientState {
    /// Patients in the order the list endpoint returned them, plus any created since.
    pub patients: Vec<Patient>,
    /// The patient on the detail view, if any.
    pub current_patient: Option<Patient>,
    pub list: Lifecycle,
    pub create: Lifecycle,
    /// Only used when get-by-id runs in its own family.
    pub detail: Lifecycle,
    requests: RequestCounters,
}

impl PatientState {
    pub fn lifecycle(&self, family: Family) -> &Lifecycle {
        match family {
            Family::List => &self.list,
            Family::Create => &self.create,
            Family::Detail => &self.detail,
        }
    }

    fn lifecycle_mut(&mut self, family: Family) -> &mut Lifecycle {
        match family {
            Family::List => &mut self.list,
            Family::Create => &mut self.create,
            Family::Detail => &mut self.detail,
        }
    }

    /// The most recently issued request of `op`.
    pub fn latest_request(&self, op: Operation) -> RequestId {
        self.requests.latest(op)
    }

    /// Look up a patient in the collection by identifier.
    pub fn patient(&self, id: &str) -> Option<&Patient> {
        self.patients.iter().find(|p| p.id() == Some(id))
    }
}

/// Every state transition of the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatientAction {
    CreatePending,
    CreateFulfilled(Patient),
    /// A create answered after a newer create was issued. The patient is stored; the create
    /// family and the selection follow the newer request.
    CreateSuperseded(Patient),
    CreateRejected(String),
    FetchAllPending,
    FetchAllFulfilled(Vec<Patient>),
    FetchAllRejected(String),
    FetchOnePending(Family),
    FetchOneFulfilled(Family, Patient),
    FetchOneRejected(Family, String),
    /// A patient was updated on the server.
    Updated(Patient),
    /// A patient was deleted on the server.
    Removed(String),
    /// Clear every family's error; loading flags and data are kept.
    ClearError,
    ClearCurrentPatient,
    /// Clear create loading and error, e.g. when leaving the create form.
    ResetCreateState,
}

/// Apply one action to the state.
pub fn reduce(state: &mut PatientState, action: PatientAction) {
    match action {
        PatientAction::CreatePending => {
            *state.requests.slot(Operation::Create) += 1;
            state.create.pending();
        }
        PatientAction::CreateFulfilled(patient) => {
            state.create.fulfilled();
            upsert(&mut state.patients, patient.clone());
            state.current_patient = Some(patient);
        }
        PatientAction::CreateSuperseded(patient) => upsert(&mut state.patients, patient),
        PatientAction::CreateRejected(message) => state.create.rejected(message),

        PatientAction::FetchAllPending => {
            *state.requests.slot(Operation::FetchAll) += 1;
            state.list.pending();
        }
        PatientAction::FetchAllFulfilled(patients) => {
            state.list.fulfilled();
            state.patients = patients;
        }
        PatientAction::FetchAllRejected(message) => state.list.rejected(message),

        PatientAction::FetchOnePending(family) => {
            *state.requests.slot(Operation::FetchOne) += 1;
            state.lifecycle_mut(family).pending();
        }
        PatientAction::FetchOneFulfilled(family, patient) => {
            state.lifecycle_mut(family).fulfilled();
            state.current_patient = Some(patient);
        }
        PatientAction::FetchOneRejected(family, message) => {
            state.lifecycle_mut(family).rejected(message)
        }

        PatientAction::Updated(patient) => {
            if let Some(slot) = state
                .patients
                .iter_mut()
                .find(|p| p.id.is_some() && p.id == patient.id)
            {
                *slot = patient.clone();
            }
            if let Some(current) = state.current_patient.as_mut() {
                if current.id.is_some() && current.id == patient.id {
                    *current = patient;
                }
            }
        }
        PatientAction::Removed(id) => {
            state.patients.retain(|p| p.id() != Some(id.as_str()));
            if state
                .current_patient
                .as_ref()
                .is_some_and(|p| p.id() == Some(id.as_str()))
            {
                state.current_patient = None;
            }
        }

        PatientAction::ClearError => {
            state.list.error = None;
            state.create.error = None;
            state.detail.error = None;
        }
        PatientAction::ClearCurrentPatient => state.current_patient = None,
        PatientAction::ResetCreateState => {
            state.create.loading = false;
            state.create.error = None;
        }
    }
}

/// Append `patient`, or replace the entry with the same identifier so identifiers stay unique.
fn upsert(patients: &mut Vec<Patient>, patient: Patient) {
    let existing = patient
        .id
        .as_ref()
        .and_then(|id| patients.iter().position(|p| p.id.as_ref() == Some(id)));

    match existing {
        Some(index) => patients[index] = patient,
        None => patients.push(patient),
    }
}

/// State container driving the patients backend.
pub struct PatientStore<A> {
    api: A,
    config: StoreConfig,
    state: RefCell<PatientState>,
}

impl<A: PatientApi> PatientStore<A> {
    pub fn new(api: A, config: StoreConfig) -> Self {
        Self::with_state(api, config, PatientState::default())
    }

    /// Start from an existing state, e.g. one restored by a test.
    pub fn with_state(api: A, config: StoreConfig, state: PatientState) -> Self {
        Self {
            api,
            config,
            state: RefCell::new(state),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn config(&self) -> StoreConfig {
        self.config
    }

    /// Borrow the current state. Do not hold the borrow across an `.await`.
    pub fn state(&self) -> Ref<'_, PatientState> {
        self.state.borrow()
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> PatientState {
        self.state.borrow().clone()
    }

    pub fn dispatch(&self, action: PatientAction) {
        tracing::debug!(?action, "patient store dispatch");
        reduce(&mut self.state.borrow_mut(), action);
    }

    /// The family get-by-id reports on under the current configuration.
    pub fn detail_family(&self) -> Family {
        match self.config.detail_lifecycle {
            DetailLifecycle::SharedWithList => Family::List,
            DetailLifecycle::Separate => Family::Detail,
        }
    }

    fn begin(&self, action: PatientAction, op: Operation) -> RequestId {
        self.dispatch(action);
        self.state.borrow().latest_request(op)
    }

    fn is_superseded(&self, op: Operation, request: RequestId) -> bool {
        self.config.stale_responses == StaleResponses::Ignore
            && self.state.borrow().latest_request(op) != request
    }

    /// Whether a fetch outcome answers an older request and must be dropped.
    fn is_stale(&self, op: Operation, request: RequestId) -> bool {
        let stale = self.is_superseded(op, request);
        if stale {
            tracing::warn!(?op, ?request, "dropping response to superseded request");
        }
        stale
    }

    /// Submit a validated create form. On success the patient is appended and selected.
    ///
    /// The server has stored every patient it returns, so a superseded success is still
    /// appended; only its effect on the create family and the selection is dropped.
    pub async fn create_patient(&self, request: &CreatePatientRequest) -> ApiResult<Patient> {
        let ticket = self.begin(PatientAction::CreatePending, Operation::Create);
        let outcome = self.api.create_patient(request).await;
        if self.is_superseded(Operation::Create, ticket) {
            match &outcome {
                Ok(patient) => self.dispatch(PatientAction::CreateSuperseded(patient.clone())),
                Err(err) => tracing::warn!("superseded create patient failed: {}", err),
            }
            return outcome;
        }

        match outcome {
            Ok(patient) => {
                self.dispatch(PatientAction::CreateFulfilled(patient.clone()));
                Ok(patient)
            }
            Err(err) => {
                tracing::warn!("create patient failed: {}", err);
                self.dispatch(PatientAction::CreateRejected(err.user_message(CREATE_FAILED)));
                Err(err)
            }
        }
    }

    /// Replace the collection with the backend's list.
    pub async fn fetch_patients(&self) -> ApiResult<()> {
        let ticket = self.begin(PatientAction::FetchAllPending, Operation::FetchAll);
        let outcome = self.api.list_patients().await;
        if self.is_stale(Operation::FetchAll, ticket) {
            return outcome.map(|_| ());
        }

        match outcome {
            Ok(patients) => {
                self.dispatch(PatientAction::FetchAllFulfilled(patients));
                Ok(())
            }
            Err(err) => {
                tracing::warn!("fetch patients failed: {}", err);
                self.dispatch(PatientAction::FetchAllRejected(
                    err.user_message(FETCH_ALL_FAILED),
                ));
                Err(err)
            }
        }
    }

    /// Load one patient into `current_patient`.
    pub async fn fetch_patient_by_id(&self, id: &str) -> ApiResult<Patient> {
        let family = self.detail_family();
        let ticket = self.begin(PatientAction::FetchOnePending(family), Operation::FetchOne);
        let outcome = self.api.get_patient(id).await;
        if self.is_stale(Operation::FetchOne, ticket) {
            return outcome;
        }

        match outcome {
            Ok(patient) => {
                self.dispatch(PatientAction::FetchOneFulfilled(family, patient.clone()));
                Ok(patient)
            }
            Err(err) => {
                tracing::warn!("fetch patient {} failed: {}", id, err);
                self.dispatch(PatientAction::FetchOneRejected(
                    family,
                    err.user_message(FETCH_ONE_FAILED),
                ));
                Err(err)
            }
        }
    }

    /// Send a partial update and fold the server's result into the collection.
    pub async fn update_patient(
        &self,
        id: &str,
        request: &UpdatePatientRequest,
    ) -> ApiResult<Patient> {
        match self.api.update_patient(id, request).await {
            Ok(patient) => {
                self.dispatch(PatientAction::Updated(patient.clone()));
                Ok(patient)
            }
            Err(err) => {
                tracing::warn!("{}: {}", err.user_message(UPDATE_FAILED), err);
                Err(err)
            }
        }
    }

    /// Delete a patient. On success it is evicted and deselected; on failure nothing changes.
    pub async fn delete_patient(&self, id: &str) -> ApiResult<()> {
        match self.api.delete_patient(id).await {
            Ok(()) => {
                self.dispatch(PatientAction::Removed(id.to_string()));
                Ok(())
            }
            Err(err) => {
                tracing::warn!("{}: {}", err.user_message(DELETE_FAILED), err);
                Err(err)
            }
        }
    }

    pub fn clear_error(&self) {
        self.dispatch(PatientAction::ClearError);
    }

    pub fn clear_current_patient(&self) {
        self.dispatch(PatientAction::ClearCurrentPatient);
    }

    pub fn reset_create_state(&self) {
        self.dispatch(PatientAction::ResetCreateState);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::validation::validate_create_patient_on;
    use chrono::{NaiveDate, Utc};
    use patients_types::PatientStatus;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    /// In-memory backend. Failures and delayed list responses can be queued per call.
    #[derive(Default)]
    struct FakeApi {
        patients: Mutex<Vec<Patient>>,
        next_id: AtomicUsize,
        create_calls: AtomicUsize,
        fail_next: Mutex<VecDeque<ApiError>>,
        delayed_lists: Mutex<VecDeque<oneshot::Receiver<ApiResult<Vec<Patient>>>>>,
    }

    impl FakeApi {
        fn with_patients(patients: Vec<Patient>) -> Self {
            let api = Self::default();
            *api.patients.lock().unwrap() = patients;
            api
        }

        fn fail_next(&self, err: ApiError) {
            self.fail_next.lock().unwrap().push_back(err);
        }

        fn take_failure(&self) -> Option<ApiError> {
            self.fail_next.lock().unwrap().pop_front()
        }
    }

    impl PatientApi for FakeApi {
        async fn create_patient(&self, request: &CreatePatientRequest) -> ApiResult<Patient> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            let id = format!("p{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
            let patient = request.clone().into_patient(id, Utc::now());
            self.patients.lock().unwrap().push(patient.clone());
            Ok(patient)
        }

        async fn list_patients(&self) -> ApiResult<Vec<Patient>> {
            let delayed = self.delayed_lists.lock().unwrap().pop_front();
            if let Some(rx) = delayed {
                return rx
                    .await
                    .unwrap_or_else(|_| Err(ApiError::Transport("dropped".into())));
            }
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            Ok(self.patients.lock().unwrap().clone())
        }

        async fn get_patient(&self, id: &str) -> ApiResult<Patient> {
            tokio::task::yield_now().await;
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            self.patients
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.id() == Some(id))
                .cloned()
                .ok_or_else(|| ApiError::NotFound {
                    id: id.to_string(),
                    message: Some("Patient not found".into()),
                })
        }

        async fn update_patient(
            &self,
            id: &str,
            request: &UpdatePatientRequest,
        ) -> ApiResult<Patient> {
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            let mut patients = self.patients.lock().unwrap();
            let patient = patients
                .iter_mut()
                .find(|p| p.id() == Some(id))
                .ok_or_else(|| ApiError::NotFound {
                    id: id.to_string(),
                    message: None,
                })?;
            request.apply_to(patient, Utc::now());
            Ok(patient.clone())
        }

        async fn delete_patient(&self, id: &str) -> ApiResult<()> {
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            let mut patients = self.patients.lock().unwrap();
            let before = patients.len();
            patients.retain(|p| p.id() != Some(id));
            if patients.len() == before {
                return Err(ApiError::NotFound {
                    id: id.to_string(),
                    message: None,
                });
            }
            Ok(())
        }
    }

    fn jane_form() -> serde_json::Value {
        json!({
            "firstName": "Jane",
            "lastName": "Smith",
            "dateOfBirth": "1990-01-01",
            "status": "Inquiry",
            "street": "123 Main St",
            "city": "New York",
            "state": "NY",
            "zipCode": "10001"
        })
    }

    fn jane_request() -> CreatePatientRequest {
        validate_create_patient_on(&jane_form(), NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
            .expect("Jane should validate")
    }

    fn patient(id: &str, first_name: &str) -> Patient {
        let mut request = jane_request();
        request.first_name = first_name.to_string();
        request.into_patient(id.to_string(), Utc::now())
    }

    fn store(api: FakeApi) -> PatientStore<FakeApi> {
        PatientStore::new(api, StoreConfig::default())
    }

    #[test]
    fn test_create_pending_does_not_touch_list_family() {
        let mut state = PatientState::default();
        reduce(&mut state, PatientAction::CreatePending);
        assert!(state.create.loading);
        assert!(!state.list.loading);

        reduce(&mut state, PatientAction::FetchAllPending);
        reduce(&mut state, PatientAction::CreateRejected("nope".into()));
        assert!(state.list.loading, "list stays pending");
        assert!(!state.create.loading);
        assert_eq!(state.list.error, None);
    }

    #[test]
    fn test_pending_clears_prior_error_of_its_family_only() {
        let mut state = PatientState::default();
        reduce(&mut state, PatientAction::FetchAllRejected("list broke".into()));
        reduce(&mut state, PatientAction::CreateRejected("create broke".into()));

        reduce(&mut state, PatientAction::FetchAllPending);
        assert_eq!(state.list.error, None);
        assert_eq!(state.create.error.as_deref(), Some("create broke"));
    }

    #[test]
    fn test_clear_error_keeps_loading_and_data() {
        let mut state = PatientState {
            patients: vec![patient("p1", "Jane")],
            ..Default::default()
        };
        reduce(&mut state, PatientAction::FetchAllPending);
        reduce(&mut state, PatientAction::CreateRejected("create broke".into()));
        state.list.error = Some("stale".into());

        reduce(&mut state, PatientAction::ClearError);
        assert_eq!(state.list.error, None);
        assert_eq!(state.create.error, None);
        assert!(state.list.loading);
        assert_eq!(state.patients.len(), 1);
    }

    #[test]
    fn test_reset_create_state_and_clear_current() {
        let mut state = PatientState::default();
        reduce(&mut state, PatientAction::CreatePending);
        reduce(&mut state, PatientAction::FetchOneFulfilled(Family::List, patient("p1", "Jane")));
        state.create.error = Some("old".into());

        reduce(&mut state, PatientAction::ResetCreateState);
        assert!(!state.create.loading);
        assert_eq!(state.create.error, None);
        assert!(state.current_patient.is_some());

        reduce(&mut state, PatientAction::ClearCurrentPatient);
        assert_eq!(state.current_patient, None);
    }

    #[test]
    fn test_create_fulfilled_keeps_identifiers_unique() {
        let mut state = PatientState::default();
        reduce(&mut state, PatientAction::FetchAllFulfilled(vec![patient("p1", "Jane")]));
        reduce(&mut state, PatientAction::CreateFulfilled(patient("p1", "Janet")));

        assert_eq!(state.patients.len(), 1);
        assert_eq!(state.patients[0].first_name, "Janet");
    }

    #[test]
    fn test_separate_detail_pending_leaves_list_idle() {
        let mut state = PatientState::default();
        reduce(&mut state, PatientAction::FetchAllRejected("list broke".into()));

        reduce(&mut state, PatientAction::FetchOnePending(Family::Detail));
        assert!(state.detail.loading);
        assert!(!state.list.loading);
        assert_eq!(state.list.error.as_deref(), Some("list broke"));

        reduce(
            &mut state,
            PatientAction::FetchOneFulfilled(Family::Detail, patient("p1", "Jane")),
        );
        assert!(!state.detail.loading);
        assert!(!state.list.loading);
        assert!(state.current_patient.is_some());
    }

    #[test]
    fn test_create_superseded_stores_without_selecting() {
        let mut state = PatientState::default();
        reduce(&mut state, PatientAction::CreatePending);
        reduce(&mut state, PatientAction::CreatePending);

        reduce(&mut state, PatientAction::CreateSuperseded(patient("p1", "Jane")));
        assert_eq!(state.patients.len(), 1);
        assert_eq!(state.current_patient, None);
        assert!(state.create.loading, "newer create still pending");
    }

    #[test]
    fn test_updated_replaces_in_place() {
        let mut state = PatientState {
            patients: vec![patient("p1", "Ann"), patient("p2", "Bob"), patient("p3", "Cy")],
            current_patient: Some(patient("p2", "Bob")),
            ..Default::default()
        };

        reduce(&mut state, PatientAction::Updated(patient("p2", "Robert")));
        let names: Vec<_> = state.patients.iter().map(|p| p.first_name.as_str()).collect();
        assert_eq!(names, ["Ann", "Robert", "Cy"]);
        assert_eq!(
            state.current_patient.as_ref().map(|p| p.first_name.as_str()),
            Some("Robert")
        );
    }

    #[tokio::test]
    async fn test_jane_scenario_creates_and_selects_patient() {
        let store = store(FakeApi::default());
        store.fetch_patients().await.expect("fetch should succeed");
        let before = store.state().patients.len();

        let created = store
            .create_patient(&jane_request())
            .await
            .expect("create should succeed");

        let state = store.snapshot();
        assert_eq!(state.patients.len(), before + 1);
        assert_eq!(state.create.error, None);
        assert!(!state.create.loading);
        assert_eq!(state.current_patient.as_ref(), Some(&created));
        assert!(created.id().is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test]
    async fn test_create_then_list_round_trip_includes_identifier() {
        let store = store(FakeApi::default());
        let created = store.create_patient(&jane_request()).await.unwrap();
        store.fetch_patients().await.unwrap();

        let id = created.id().expect("server assigns an identifier");
        assert!(store.state().patient(id).is_some());
    }

    #[tokio::test]
    async fn test_create_rejection_uses_server_message_or_fallback() {
        let api = FakeApi::default();
        api.fail_next(ApiError::Server {
            status: 400,
            message: Some("Duplicate patient".into()),
        });
        api.fail_next(ApiError::Transport("connection refused".into()));
        let store = store(api);

        store.create_patient(&jane_request()).await.expect_err("should fail");
        assert_eq!(store.state().create.error.as_deref(), Some("Duplicate patient"));

        store.create_patient(&jane_request()).await.expect_err("should fail");
        let state = store.snapshot();
        assert_eq!(state.create.error.as_deref(), Some("Failed to create patient"));
        assert_eq!(state.list.error, None);
        assert!(state.patients.is_empty());
    }

    #[tokio::test]
    async fn test_all_empty_form_never_reaches_create() {
        let store = store(FakeApi::default());
        let empty = json!({
            "firstName": "", "lastName": "", "dateOfBirth": "", "status": "",
            "street": "", "city": "", "state": "", "zipCode": ""
        });

        let result =
            validate_create_patient_on(&empty, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        if let Ok(request) = result {
            store.create_patient(&request).await.ok();
        }

        assert_eq!(store.api().create_calls.load(Ordering::SeqCst), 0);
        assert!(store.state().patients.is_empty());
    }

    #[tokio::test]
    async fn test_list_rejection_keeps_collection_and_uses_fallback() {
        let api = FakeApi::with_patients(vec![patient("p1", "Jane")]);
        let store = store(api);
        store.fetch_patients().await.unwrap();
        let before = store.state().patients.clone();

        store.api().fail_next(ApiError::Server {
            status: 500,
            message: None,
        });
        store.fetch_patients().await.expect_err("should fail");

        let state = store.snapshot();
        assert_eq!(state.list.error.as_deref(), Some("Failed to fetch patients"));
        assert!(!state.list.loading);
        assert_eq!(state.patients, before);
    }

    #[tokio::test]
    async fn test_delete_evicts_and_deselects() {
        let api = FakeApi::with_patients(vec![patient("p1", "Jane"), patient("p2", "John")]);
        let store = store(api);
        store.fetch_patients().await.unwrap();
        store.fetch_patient_by_id("p1").await.unwrap();

        store.delete_patient("p1").await.expect("delete should succeed");
        assert_eq!(store.state().current_patient, None);
        assert!(store.state().patient("p1").is_none());

        store.fetch_patients().await.unwrap();
        let state = store.snapshot();
        assert_eq!(state.patients.len(), 1);
        assert!(state.patient("p1").is_none());
    }

    #[tokio::test]
    async fn test_delete_of_other_patient_keeps_selection() {
        let api = FakeApi::with_patients(vec![patient("p1", "Jane"), patient("p2", "John")]);
        let store = store(api);
        store.fetch_patients().await.unwrap();
        store.fetch_patient_by_id("p2").await.unwrap();

        store.delete_patient("p1").await.unwrap();
        assert_eq!(store.state().current_patient.as_ref().and_then(|p| p.id()), Some("p2"));
    }

    #[tokio::test]
    async fn test_delete_failure_leaves_state_untouched() {
        let api = FakeApi::with_patients(vec![patient("p1", "Jane")]);
        let store = store(api);
        store.fetch_patients().await.unwrap();
        let before = store.snapshot();

        store.api().fail_next(ApiError::Transport("offline".into()));
        store.delete_patient("p1").await.expect_err("should fail");
        assert_eq!(store.snapshot(), before);

        store.delete_patient("p1").await.expect("retry should succeed");
        assert!(store.state().patients.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_by_id_shares_list_family_by_default() {
        let store = store(FakeApi::default());

        store.fetch_patient_by_id("missing").await.expect_err("should be not found");
        let state = store.snapshot();
        assert_eq!(state.list.error.as_deref(), Some("Patient not found"));
        assert_eq!(state.detail, Lifecycle::default());
        assert_eq!(state.current_patient, None);
    }

    #[tokio::test]
    async fn test_fetch_by_id_uses_own_family_when_separate() {
        let config = StoreConfig {
            detail_lifecycle: DetailLifecycle::Separate,
            ..Default::default()
        };
        let store = PatientStore::new(FakeApi::default(), config);
        store.api().fail_next(ApiError::Server {
            status: 503,
            message: None,
        });

        store.fetch_patient_by_id("p1").await.expect_err("should fail");
        let state = store.snapshot();
        assert_eq!(state.detail.error.as_deref(), Some("Failed to fetch patient"));
        assert_eq!(state.list, Lifecycle::default());
    }

    #[tokio::test]
    async fn test_update_replaces_patient_from_server() {
        let api = FakeApi::with_patients(vec![patient("p1", "Jane")]);
        let store = store(api);
        store.fetch_patients().await.unwrap();

        let patch = UpdatePatientRequest {
            status: Some(PatientStatus::Active),
            ..Default::default()
        };
        store.update_patient("p1", &patch).await.expect("update should succeed");
        assert_eq!(store.state().patients[0].status, PatientStatus::Active);

        store.api().fail_next(ApiError::Transport("offline".into()));
        let before = store.snapshot();
        store.update_patient("p1", &patch).await.expect_err("should fail");
        assert_eq!(store.snapshot(), before);
    }

    /// Two overlapping refreshes whose responses arrive in reverse order.
    async fn overlapping_refreshes(store: &PatientStore<FakeApi>) {
        let (first_tx, first_rx) = oneshot::channel();
        let (second_tx, second_rx) = oneshot::channel();
        {
            let mut queue = store.api().delayed_lists.lock().unwrap();
            queue.push_back(first_rx);
            queue.push_back(second_rx);
        }

        let newer = vec![patient("p2", "Newer")];
        let older = vec![patient("p1", "Older")];

        let respond = async {
            // Let both requests go out before answering.
            tokio::task::yield_now().await;
            second_tx.send(Ok(newer.clone())).ok();
            while store.state().list.loading && store.state().patients != newer {
                tokio::task::yield_now().await;
            }
            first_tx.send(Ok(older.clone())).ok();
        };

        let (a, b, ()) = tokio::join!(store.fetch_patients(), store.fetch_patients(), respond);
        a.expect("first fetch should succeed");
        b.expect("second fetch should succeed");
    }

    #[tokio::test]
    async fn test_last_response_wins_by_default() {
        let store = store(FakeApi::default());
        overlapping_refreshes(&store).await;
        assert_eq!(store.state().patients[0].first_name, "Older");
    }

    #[tokio::test]
    async fn test_stale_responses_can_be_ignored() {
        let config = StoreConfig {
            stale_responses: StaleResponses::Ignore,
            ..Default::default()
        };
        let store = PatientStore::new(FakeApi::default(), config);
        overlapping_refreshes(&store).await;

        let state = store.snapshot();
        assert_eq!(state.patients[0].first_name, "Newer");
        assert!(!state.list.loading);
        assert_eq!(state.latest_request(Operation::FetchAll), RequestId(2));
    }

    fn ignoring_stale() -> StoreConfig {
        StoreConfig {
            stale_responses: StaleResponses::Ignore,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_overlapping_creates_keep_every_saved_patient() {
        for config in [StoreConfig::default(), ignoring_stale()] {
            let store = PatientStore::new(FakeApi::default(), config);
            let jane = jane_request();
            let mut janet = jane_request();
            janet.first_name = "Janet".into();

            let (first, second) =
                tokio::join!(store.create_patient(&jane), store.create_patient(&janet));
            let first = first.expect("first create should succeed");
            let second = second.expect("second create should succeed");

            let server = store.api().patients.lock().unwrap().len();
            let state = store.snapshot();
            assert_eq!(server, 2);
            assert_eq!(state.patients.len(), server, "{config:?}");
            assert!(!state.create.loading);
            assert_eq!(state.create.error, None);
            // Arrival order is up to the join; only the ignore policy pins the selection.
            match config.stale_responses {
                StaleResponses::Ignore => assert_eq!(state.current_patient, Some(second)),
                StaleResponses::LastResponseWins => assert!(
                    state.current_patient == Some(first) || state.current_patient == Some(second)
                ),
            }
        }
    }

    #[tokio::test]
    async fn test_stale_fetch_by_id_is_ignored() {
        let config = StoreConfig {
            detail_lifecycle: DetailLifecycle::Separate,
            ..ignoring_stale()
        };
        let api = FakeApi::with_patients(vec![patient("p1", "Jane"), patient("p2", "John")]);
        let store = PatientStore::new(api, config);

        let (first, second) = tokio::join!(
            store.fetch_patient_by_id("p1"),
            store.fetch_patient_by_id("p2")
        );
        first.expect("first fetch should succeed");
        second.expect("second fetch should succeed");

        let state = store.snapshot();
        assert_eq!(state.current_patient.as_ref().and_then(|p| p.id()), Some("p2"));
        assert!(!state.detail.loading);
        assert_eq!(state.list, Lifecycle::default());
        assert_eq!(state.latest_request(Operation::FetchOne), RequestId(2));
    }
}
