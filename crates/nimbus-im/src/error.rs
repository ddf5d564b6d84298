//! Error types for nimbus-im

use thiserror::Error;

use crate::protocol::Protocol;

/// Code reported for parameters rejected before any request is sent.
pub const CODE_INVALID_PARAMETER: i32 = 1002;

/// Main error type for nimbus-im
#[derive(Error, Debug)]
pub enum NimbusError {
    /// Caller input rejected locally; no request was sent.
    #[error("Invalid parameter ({code}): {message}")]
    InvalidParameter { code: i32, message: String },

    /// The platform received the call and rejected it.
    #[error("{origin} API error {code}: {message}")]
    Api {
        origin: Protocol,
        code: i32,
        message: String,
        request_id: Option<String>,
    },

    /// The call never completed.
    #[error("HTTP request failed: {source}")]
    Http {
        source: reqwest::Error,
        request_id: Option<String>,
    },

    /// The response could not be read as a platform envelope.
    #[error("JSON parsing error: {source}")]
    Json {
        source: serde_json::Error,
        request_id: Option<String>,
    },
}

impl From<reqwest::Error> for NimbusError {
    fn from(source: reqwest::Error) -> Self {
        Self::Http {
            source,
            request_id: None,
        }
    }
}

impl From<serde_json::Error> for NimbusError {
    fn from(source: serde_json::Error) -> Self {
        Self::Json {
            source,
            request_id: None,
        }
    }
}

impl NimbusError {
    /// Correlation id of the failed REST attempt, when one was minted
    /// before the failure. Legacy-protocol and pre-flight errors have none.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Api { request_id, .. }
            | Self::Http { request_id, .. }
            | Self::Json { request_id, .. } => request_id.as_deref(),
            Self::InvalidParameter { .. } => None,
        }
    }

    /// Stamps the REST correlation id onto an error minted without one.
    pub(crate) fn with_request_id(mut self, id: &str) -> Self {
        match &mut self {
            Self::Api { request_id, .. }
            | Self::Http { request_id, .. }
            | Self::Json { request_id, .. } => {
                if request_id.is_none() {
                    *request_id = Some(id.to_string());
                }
            }
            Self::InvalidParameter { .. } => {}
        }
        self
    }

    /// Validation error carrying the stable parameter code.
    pub(crate) fn parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            code: CODE_INVALID_PARAMETER,
            message: message.into(),
        }
    }

    /// Validation error for a required argument that was left empty.
    pub(crate) fn required(name: &str) -> Self {
        Self::parameter(format!("parameter '{name}' is required"))
    }
}

/// Rejects an empty required string argument.
pub(crate) fn require(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(NimbusError::required(name));
    }
    Ok(())
}

/// Result type alias for nimbus-im
pub type Result<T> = std::result::Result<T, NimbusError>;
