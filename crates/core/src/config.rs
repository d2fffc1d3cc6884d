//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the store and the
//! API client. The parse helpers take the raw environment value as an `Option<String>` so
//! callers read the process environment in one place and tests never have to.

use crate::constants::DEFAULT_BASE_URL;
use crate::{PatientError, PatientResult};

/// Which loading/error pair a get-by-id reports on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetailLifecycle {
    /// Get-by-id shares the list family's loading flag and error.
    #[default]
    SharedWithList,
    /// Get-by-id has its own loading flag and error.
    Separate,
}

/// How the store treats a response that arrives after a newer request was issued.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StaleResponses {
    /// Every response is applied in arrival order.
    #[default]
    LastResponseWins,
    /// Fetch responses to superseded requests are dropped. A superseded create that
    /// succeeded is still stored, without touching the create family or the selection.
    Ignore,
}

/// Behavioural switches of the patient store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreConfig {
    pub detail_lifecycle: DetailLifecycle,
    pub stale_responses: StaleResponses,
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    base_url: String,
    store: StoreConfig,
}

impl CoreConfig {
    /// Create a new `CoreConfig`. The base URL is normalised by [`normalise_base_url`].
    pub fn new(base_url: impl AsRef<str>, store: StoreConfig) -> PatientResult<Self> {
        Ok(Self {
            base_url: normalise_base_url(base_url.as_ref())?,
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> StoreConfig {
        self.store
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            store: StoreConfig::default(),
        }
    }
}

/// Check that `raw` is an absolute http(s) URL and strip trailing slashes.
pub fn normalise_base_url(raw: &str) -> PatientResult<String> {
    let trimmed = raw.trim().trim_end_matches('/');

    let rest = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .ok_or_else(|| {
            PatientError::InvalidInput(format!(
                "base URL must start with http:// or https://: {raw}"
            ))
        })?;

    if rest.is_empty() || rest.starts_with('/') {
        return Err(PatientError::InvalidInput(format!(
            "base URL has no host: {raw}"
        )));
    }

    if trimmed.chars().any(char::is_whitespace) {
        return Err(PatientError::InvalidInput(format!(
            "base URL must not contain whitespace: {raw}"
        )));
    }

    Ok(trimmed.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the backend base URL from an optional environment value.
///
/// If `value` is `None` or blank, returns [`DEFAULT_BASE_URL`].
pub fn base_url_from_env_value(value: Option<String>) -> PatientResult<String> {
    match non_blank(value) {
        Some(v) => normalise_base_url(&v),
        None => Ok(DEFAULT_BASE_URL.to_string()),
    }
}

/// Parse the detail lifecycle from an optional environment value (`shared` | `separate`).
pub fn detail_lifecycle_from_env_value(value: Option<String>) -> PatientResult<DetailLifecycle> {
    match non_blank(value).map(|v| v.to_ascii_lowercase()).as_deref() {
        None | Some("shared") => Ok(DetailLifecycle::SharedWithList),
        Some("separate") => Ok(DetailLifecycle::Separate),
        Some(other) => Err(PatientError::InvalidInput(format!(
            "unknown detail lifecycle '{other}' (expected 'shared' or 'separate')"
        ))),
    }
}

/// Parse the stale-response policy from an optional environment value (`last-wins` | `ignore`).
pub fn stale_responses_from_env_value(value: Option<String>) -> PatientResult<StaleResponses> {
    match non_blank(value).map(|v| v.to_ascii_lowercase()).as_deref() {
        None | Some("last-wins") => Ok(StaleResponses::LastResponseWins),
        Some("ignore") => Ok(StaleResponses::Ignore),
        Some(other) => Err(PatientError::InvalidInput(format!(
            "unknown stale response policy '{other}' (expected 'last-wins' or 'ignore')"
        ))),
    }
}
