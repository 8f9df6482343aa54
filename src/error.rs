use std::result;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error as ThisError;
use tracing::error;

use crate::db::DatastoreError;

pub type Result<T> = result::Result<T, Error>;

pub const DUPLICATE_ADDRESS_MESSAGE: &str = "This IP address has already entered this giveaway";
pub const DUPLICATE_NAME_MESSAGE: &str = "You have already entered this giveaway";
pub const UNEXPECTED_MESSAGE: &str = "Internal server error";

#[derive(Debug, Clone, Eq, PartialEq, ThisError)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{}", DUPLICATE_ADDRESS_MESSAGE)]
    DuplicateAddress,
    #[error("{}", DUPLICATE_NAME_MESSAGE)]
    DuplicateName,
    // Workflow conflicts, e.g. acting on a giveaway that was already drawn.
    #[error("{0}")]
    Giveaway(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Unexpected(String),
    #[error("{0}")]
    Config(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::DuplicateAddress | Error::DuplicateName | Error::Giveaway(_) => {
                StatusCode::CONFLICT
            }
            Error::Upstream(_) | Error::Unexpected(_) | Error::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<DatastoreError> for Error {
    fn from(err: DatastoreError) -> Error {
        match err {
            DatastoreError::NotFound(what) => Error::NotFound(format!("The requested {} was not found.", what)),
            other => Error::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // The details only go to the log, the caller gets a generic message
            Error::Unexpected(description) | Error::Config(description) => {
                error!("Unexpected error while processing request: {}", description);
                UNEXPECTED_MESSAGE.to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
