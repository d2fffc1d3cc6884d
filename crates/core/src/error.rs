use crate::validation::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Api(#[from] ApiError),
}

pub type PatientResult<T> = std::result::Result<T, PatientError>;

/// Failures of a round trip to the patients backend.
///
/// Transport problems never carry a server message; server-reported failures keep the
/// `message` field of the error body verbatim when the backend supplied one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error(
        "server responded with HTTP {status}: {}",
        message.as_deref().unwrap_or("no message")
    )]
    Server {
        status: u16,
        message: Option<String>,
    },
    #[error("patient not found: {id}")]
    NotFound { id: String, message: Option<String> },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// The message the server reported, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Server { message, .. } | ApiError::NotFound { message, .. } => {
                message.as_deref()
            }
            ApiError::Transport(_) | ApiError::Decode(_) => None,
        }
    }

    /// The user-facing message: the server's when present, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
