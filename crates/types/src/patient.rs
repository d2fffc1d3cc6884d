//! Patient wire models.
//!
//! Responsibilities:
//! - Define the persisted [`Patient`] as the backend returns it
//! - Define the request bodies for create and partial update
//! - Provide display helpers for names and addresses
//!
//! Notes:
//! - The address is flattened on the wire; [`Address`] is a view over those fields
//! - Identifier and timestamps are server-assigned and never set client-side

use crate::PatientStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A patient record as persisted by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Server-assigned identifier, absent until persisted.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub first_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,

    pub last_name: String,

    /// Date of birth as entered, normally `YYYY-MM-DD`.
    pub date_of_birth: String,

    pub status: PatientStatus,

    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Backend document revision.
    #[serde(rename = "__v", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

impl Patient {
    /// Identifier as a string slice, if the record has been persisted.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// First, middle (when present) and last names joined by single spaces.
    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref().filter(|m| !m.is_empty()) {
            Some(middle) => format!("{} {} {}", self.first_name, middle, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }

    /// The postal address carried by this record.
    pub fn address(&self) -> Address {
        Address {
            street: self.street.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            zip_code: self.zip_code.clone(),
        }
    }
}

/// Fields a user supplies when creating a patient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientRequest {
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: String,
    pub status: PatientStatus,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

impl CreatePatientRequest {
    /// Build the persisted form the backend would return, given its assigned fields.
    pub fn into_patient(self, id: String, now: DateTime<Utc>) -> Patient {
        Patient {
            id: Some(id),
            first_name: self.first_name,
            middle_name: self.middle_name,
            last_name: self.last_name,
            date_of_birth: self.date_of_birth,
            status: self.status,
            street: self.street,
            city: self.city,
            state: self.state,
            zip_code: self.zip_code,
            created_at: Some(now),
            updated_at: Some(now),
            version: Some(0),
        }
    }
}

/// Partial patch of a patient. Absent fields are left unchanged by the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePatientRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PatientStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
}

impl UpdatePatientRequest {
    /// True when the patch carries no fields at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch onto an existing record, bumping `updated_at`.
    pub fn apply_to(&self, patient: &mut Patient, now: DateTime<Utc>) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }

        set(&mut patient.first_name, &self.first_name);
        if self.middle_name.is_some() {
            patient.middle_name = self.middle_name.clone();
        }
        set(&mut patient.last_name, &self.last_name);
        set(&mut patient.date_of_birth, &self.date_of_birth);
        set(&mut patient.status, &self.status);
        set(&mut patient.street, &self.street);
        set(&mut patient.city, &self.city);
        set(&mut patient.state, &self.state);
        set(&mut patient.zip_code, &self.zip_code);
        patient.updated_at = Some(now);
    }
}

/// Postal address of a patient.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<&str> = [&self.street, &self.city, &self.state, &self.zip_code]
            .into_iter()
            .map(String::as_str)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            f.write_str("No address provided")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}
