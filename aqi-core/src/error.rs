//! Errors from talking to the AQI provider.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AqiError {
    /// Request never produced a response (connect, timeout, retries exhausted).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest_middleware::Error),

    /// Non-2xx response.
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not the expected JSON envelope.
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// Envelope said `status: "error"`.
    #[error("provider error: {0}")]
    Provider(String),

    /// Envelope status was neither `ok`, `nope` nor `error`.
    #[error("unexpected provider status '{0}'")]
    UnexpectedStatus(String),

    /// `status: "ok"` without a usable `data` payload.
    #[error("provider response is missing its data payload")]
    MissingPayload,
}

impl From<reqwest::Error> for AqiError {
    fn from(err: reqwest::Error) -> Self {
        AqiError::Http(reqwest_middleware::Error::Reqwest(err))
    }
}

impl From<serde_json::Error> for AqiError {
    fn from(err: serde_json::Error) -> Self {
        AqiError::Json {
            message: err.to_string(),
        }
    }
}
