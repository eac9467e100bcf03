use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::http_client::{HttpError, HttpResponse};

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, LuisError>;

/// Top-level error type for the LUIS client.
#[derive(Debug, Error)]
pub enum LuisError {
    /// The remote answered a write or a page fetch with a non-success status.
    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] HttpError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("Training failed for {model}: {reason}")]
    TrainingFailed { model: String, reason: String },

    #[error("training did not finish within {0:?}")]
    TrainingTimedOut(Duration),

    /// A step of a compound operation answered without success.
    #[error("{step} was not accepted for application {app_id}")]
    StepRejected { step: &'static str, app_id: String },

    #[error("invalid model document: {0}")]
    InvalidDocument(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LuisError {
    /// Builds a descriptive failure from a non-success response.
    ///
    /// Uses `"{code}: {message}"` from an `{"error": {...}}` body when present,
    /// otherwise the reason phrase of the status code.
    pub fn from_response(response: &HttpResponse) -> Self {
        let message = serde_json::from_str::<Value>(&response.body)
            .ok()
            .and_then(|body| remote_error_message(&body))
            .unwrap_or_else(|| response.reason_phrase());

        Self::Remote {
            status: response.status,
            message,
        }
    }

    /// Status code of a remote rejection, if this error carries one.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

fn remote_error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?.as_object()?;
    let code = error.get("code").map(render_scalar).unwrap_or_default();
    let message = error.get("message").map(render_scalar).unwrap_or_default();
    Some(format!("{code}: {message}"))
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Returns an error for any non-success response.
pub fn ensure_success(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(LuisError::from_response(response))
    }
}
