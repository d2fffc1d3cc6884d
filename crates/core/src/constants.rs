//! Constants used throughout the patients core crate.
//!
//! This module contains configuration keys, defaults and user-facing fallback
//! messages to keep them consistent across the store, the client and the CLI.

/// Base URL of the patients REST backend when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Environment variable holding the backend base URL.
pub const BASE_URL_ENV: &str = "PATIENTS_API_BASE_URL";

/// Environment variable selecting which lifecycle get-by-id reports on.
pub const DETAIL_LIFECYCLE_ENV: &str = "PATIENTS_DETAIL_LIFECYCLE";

/// Environment variable selecting how out-of-order responses are handled.
pub const STALE_RESPONSES_ENV: &str = "PATIENTS_STALE_RESPONSES";

/// Collection path on the backend.
pub const PATIENTS_PATH: &str = "/patients";

/// Fallback message when a create fails without a server message.
pub const CREATE_FAILED: &str = "Failed to create patient";

/// Fallback message when a list fetch fails without a server message.
pub const FETCH_ALL_FAILED: &str = "Failed to fetch patients";

/// Fallback message when a get-by-id fails without a server message.
pub const FETCH_ONE_FAILED: &str = "Failed to fetch patient";

/// Fallback message when an update fails without a server message.
pub const UPDATE_FAILED: &str = "Failed to update patient";

/// Fallback message when a delete fails without a server message.
pub const DELETE_FAILED: &str = "Failed to delete patient";

/// Oldest age, in calendar years, accepted for a date of birth.
pub const MAX_AGE_YEARS: i32 = 120;
