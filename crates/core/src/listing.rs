//! Search, filter and summary helpers for the patient list view.

use patients_types::{Patient, PatientStatus};

/// Status filter of the list view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(PatientStatus),
}

impl StatusFilter {
    fn matches(self, status: PatientStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted == status,
        }
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = patients_types::TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "All" {
            Ok(StatusFilter::All)
        } else {
            s.parse().map(StatusFilter::Only)
        }
    }
}

/// Patients whose first, middle or last name contains `search` (case-insensitive) and whose
/// status passes `status`. Collection order is preserved.
pub fn filter_patients<'a>(
    patients: &'a [Patient],
    search: &str,
    status: StatusFilter,
) -> Vec<&'a Patient> {
    let needle = search.to_lowercase();
    patients
        .iter()
        .filter(|p| {
            let names = [
                Some(p.first_name.as_str()),
                p.middle_name.as_deref(),
                Some(p.last_name.as_str()),
            ];
            names
                .into_iter()
                .flatten()
                .any(|name| name.to_lowercase().contains(&needle))
        })
        .filter(|p| status.matches(p.status))
        .collect()
}

/// Number of patients in each status, in [`PatientStatus::ALL`] order.
pub fn status_counts(patients: &[Patient]) -> [(PatientStatus, usize); 4] {
    PatientStatus::ALL.map(|status| {
        let count = patients.iter().filter(|p| p.status == status).count();
        (status, count)
    })
}
