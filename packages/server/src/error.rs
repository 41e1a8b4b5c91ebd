//! Application-level error type returned by handlers.
//!
//! All variants serialise to an enveloped [`ErrorResponse`] and map to the
//! appropriate HTTP status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use portfolio::{ParamError, SchemaError};
use portfolio_api::{error::codes, ErrorResponse};

use crate::{response::JsonEnvelope, storage::StorageError};

/// An error that a handler can return; converts directly to an HTTP response.
#[derive(Debug)]
pub enum AppError {
    /// The verb is not in the resource's allow-list.
    MethodNotAllowed(String),
    /// A `name::type=value` parameter could not be decoded.
    InvalidParameter(String),
    /// Decoded parameters do not fit the record type, or break a constraint.
    Validation(String),
    NotFound(String),
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MethodNotAllowed(_)
            | AppError::InvalidParameter(_)
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match self {
            AppError::MethodNotAllowed(msg) => (codes::METHOD_NOT_ALLOWED, msg),
            AppError::InvalidParameter(msg) => (codes::INVALID_PARAMETER, msg),
            AppError::Validation(msg) => (codes::VALIDATION_FAILED, msg),
            AppError::NotFound(msg) => (codes::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::warn!("internal error: {msg}");
                (codes::INTERNAL_ERROR, msg)
            }
        };
        (status, JsonEnvelope(ErrorResponse::new(code, message))).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => AppError::NotFound("not found".into()),
            StorageError::Validation(msg) => AppError::Validation(msg),
            StorageError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<ParamError> for AppError {
    fn from(e: ParamError) -> Self {
        AppError::InvalidParameter(e.to_string())
    }
}

impl From<SchemaError> for AppError {
    fn from(e: SchemaError) -> Self {
        AppError::Validation(e.to_string())
    }
}
