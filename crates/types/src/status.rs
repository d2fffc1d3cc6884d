//! Patient lifecycle status.

use crate::{TypesError, TypesResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle stage of the relationship with a patient.
///
/// The set is closed: no other value is accepted on the wire or from users.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatientStatus {
    /// First contact, not yet onboarded.
    Inquiry,
    /// Paperwork and intake in progress.
    Onboarding,
    /// Currently under care.
    Active,
    /// No longer under care.
    Churned,
}

impl PatientStatus {
    /// Every status, in declaration order.
    pub const ALL: [PatientStatus; 4] = [
        PatientStatus::Inquiry,
        PatientStatus::Onboarding,
        PatientStatus::Active,
        PatientStatus::Churned,
    ];

    /// The exact wire name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            PatientStatus::Inquiry => "Inquiry",
            PatientStatus::Onboarding => "Onboarding",
            PatientStatus::Active => "Active",
            PatientStatus::Churned => "Churned",
        }
    }

    /// Parse from the exact wire name. Matching is case-sensitive.
    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl FromStr for PatientStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> TypesResult<Self> {
        Self::from_wire(s).ok_or_else(|| TypesError::UnknownStatus(s.to_string()))
    }
}

impl std::fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
