//! Request-local failures of the push endpoint.

use axum::http::StatusCode;
use thiserror::Error;

use crate::message::DecodeError;

/// Why an inbound request was rejected before reaching a message handler.
///
/// None of these are fatal; each is handed to
/// [`MessageHandler::invalid_request`](crate::server::MessageHandler::invalid_request).
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("{0} is empty")]
    MissingParameter(&'static str),

    #[error("invalid query string: {0}")]
    QueryParse(String),

    #[error("check signature failed")]
    SignatureMismatch,

    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("failed to decode envelope: {0}")]
    Decode(#[from] DecodeError),
}

impl RequestError {
    /// Status the default invalid-request handler answers with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::SignatureMismatch => StatusCode::UNAUTHORIZED,
            RequestError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::MissingParameter(_) => "missing_parameter",
            RequestError::QueryParse(_) => "query_parse",
            RequestError::SignatureMismatch => "signature_mismatch",
            RequestError::BodyRead(_) => "body_read",
            RequestError::BodyTooLarge { .. } => "body_too_large",
            RequestError::Decode(_) => "decode",
        }
    }
}
