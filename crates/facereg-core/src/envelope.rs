//! The `{code, message, data}` wrapper every service response uses, and the
//! tagged error it is turned into at the client boundary.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

/// Application-level success code. Transport status is not consulted.
pub const CODE_OK: i32 = 200;

/// Shown for transport and decode failures instead of the raw error.
pub const NETWORK_ERROR_MESSAGE: &str = "network error, check that the service is running";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("service rejected request ({code}): {message}")]
    Rejected { code: i32, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    /// Text suitable for a user-facing notification.
    ///
    /// Service messages are passed through verbatim; `fallback` covers a
    /// rejection that arrived without one.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Rejected { message, .. } if !message.is_empty() => message.clone(),
            ApiError::Rejected { .. } => fallback.to_string(),
            ApiError::Transport(_) | ApiError::Decode(_) => NETWORK_ERROR_MESSAGE.to_string(),
            ApiError::InvalidInput(msg) => msg.clone(),
        }
    }
}

/// Raw response wrapper. Absent `message`/`data` read as `None`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub code: i32,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// `Ok(data)` iff `code == 200`, otherwise the server message as a
    /// rejection.
    pub fn into_result(self) -> Result<Option<T>, ApiError> {
        if self.code == CODE_OK {
            Ok(self.data)
        } else {
            Err(ApiError::Rejected {
                code: self.code,
                message: self.message.unwrap_or_default(),
            })
        }
    }
}

/// Decode a response body into its envelope and unwrap it.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>, ApiError> {
    let envelope: Envelope<T> =
        serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    envelope.into_result()
}

/// Decode a response whose payload is irrelevant; only the code matters.
pub fn decode_ack(body: &[u8]) -> Result<(), ApiError> {
    decode::<serde_json::Value>(body).map(|_| ())
}
