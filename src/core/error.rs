//! Failure types surfaced by exchange rate providers.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error body returned by the provider on any non-200 response.
///
/// `status` and `message` are required so that unrelated JSON (proxy pages,
/// empty objects) fails to decode instead of passing as a provider error.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub error: bool,
    pub status: u16,
    pub message: String,
    #[serde(default)]
    pub description: String,
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message, self.description)
    }
}

/// Which response body failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    ErrorBody,
    RatesBody,
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeStage::ErrorBody => f.write_str("error"),
            DecodeStage::RatesBody => f.write_str("rates"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport error: {message}")]
    Transport { message: String, timeout: bool },

    #[error("provider error {}: {}", .0.status, .0)]
    Provider(ErrorPayload),

    #[error("failed to decode {stage} response (HTTP {status}): {source}")]
    Decode {
        stage: DecodeStage,
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate not found for requested currency: {currency}")]
    RateNotFound { currency: String },
}

impl ApiError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Transport { timeout: true, .. })
    }

    /// HTTP status associated with the failure, when one is known.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Provider(payload) => Some(payload.status),
            ApiError::Decode { status, .. } => Some(*status),
            ApiError::Transport { .. }
            | ApiError::InvalidRequest(_)
            | ApiError::RateNotFound { .. } => None,
        }
    }

    /// Structured view of any failure. Provider errors are returned as decoded,
    /// local failures are synthesized with a zero status when none is known.
    pub fn payload(&self) -> ErrorPayload {
        let (message, description) = match self {
            ApiError::Provider(payload) => return payload.clone(),
            ApiError::InvalidRequest(reason) => ("invalid_request", reason.clone()),
            ApiError::Transport { message, timeout, .. } => {
                let short = if *timeout { "timeout" } else { "transport_error" };
                (short, message.clone())
            }
            ApiError::Decode { stage, source, .. } => match stage {
                DecodeStage::ErrorBody => ("decode_error_body", source.to_string()),
                DecodeStage::RatesBody => ("decode_rates_body", source.to_string()),
            },
            ApiError::RateNotFound { currency } => (
                "rate_not_found",
                format!("no rate for {currency} in the provider response"),
            ),
        };

        ErrorPayload {
            error: true,
            status: self.status().unwrap_or_default(),
            message: message.to_string(),
            description,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport {
            message: err.to_string(),
            timeout: err.is_timeout(),
        }
    }
}
