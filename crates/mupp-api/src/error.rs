use std::collections::BTreeMap;

use thiserror::Error;

use mupp_schema::StructuralError;

/// Fallback shown when the backend's error body carries no `message`.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

/// Transport-level failures: connection errors and non-success statuses.
///
/// Always caught at the call site and surfaced to the user; never retried
/// automatically.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{context}: responded with status {status}: {message}")]
    Status {
        context: &'static str,
        status: u16,
        message: String,
    },
    #[error("Session key not found in the response.")]
    MissingSessionKey,
    #[error("Log out denied. User does not have an active session.")]
    NoActiveSession,
    #[error("field '{0}' not found in the response")]
    MissingField(&'static str),
    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("malformed form schema: {0}")]
    Schema(#[from] StructuralError),
    #[error("status probe cancelled")]
    Cancelled,
}

/// Sign-up failure: either the form itself is invalid (field-keyed error
/// map, no request was made) or the backend rejected the request.
#[derive(Debug, Error)]
pub enum SignUpError {
    #[error("sign-up form is invalid")]
    Invalid(BTreeMap<String, String>),
    #[error(transparent)]
    Api(#[from] ApiError),
}
