// Error types shared by every network-facing operation.
// Failures are recovered at the screen boundary, so each variant knows how to
// describe itself to a user and whether re-triggering the action makes sense.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::ListingId;

/// Per-field validation messages, keyed by the form field name.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum ClientError {
    // Missing or expired credential, or a 401/403 from the backend
    #[error("not authenticated")]
    Unauthenticated,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("backend returned status {status}")]
    Status { status: u16, message: Option<String> },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("validation failed: {}", describe_fields(.0))]
    Validation(FieldErrors),

    #[error("comparison is missing listings: {}", .missing.join(", "))]
    IncompleteComparison { missing: Vec<ListingId> },

    #[error("request cancelled")]
    Cancelled,
}

fn describe_fields(fields: &FieldErrors) -> String {
    fields
        .iter()
        .map(|(field, message)| format!("{}: {}", field, message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ClientError {
    // Shorthand for a single-field validation failure
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), message.into());
        ClientError::Validation(fields)
    }

    /// Text for the dismissible message shown where the failure is recovered.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Unauthenticated => "You need to log in to continue.".to_string(),
            ClientError::Network(_) => "Could not connect to the server. Please make sure the backend is running and you are on the same network.".to_string(),
            ClientError::Status { message: Some(message), .. } => message.clone(),
            ClientError::Status { status, message: None } => {
                format!("The server returned an error (status {}).", status)
            }
            ClientError::Decode(_) => "The server sent an unexpected response.".to_string(),
            ClientError::Validation(fields) => fields.values().cloned().collect::<Vec<_>>().join(" "),
            ClientError::IncompleteComparison { .. } => {
                "Some of the selected cars are no longer available.".to_string()
            }
            ClientError::Cancelled => "The request was cancelled.".to_string(),
        }
    }

    // The client never retries on its own; this only tells the screen whether
    // offering a "try again" action is meaningful.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) | ClientError::Cancelled => true,
            ClientError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ClientError::Validation(fields) => Some(fields),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
