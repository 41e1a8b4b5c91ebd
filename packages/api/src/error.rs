//! Standard error response body.

use serde::{Deserialize, Serialize};

/// The JSON body carried (inside the envelope) by every error response.
///
/// ```json
/// { "response": { "error": "This resource does not support the method \"POST\"", "code": "method_not_allowed" } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Human-readable description of the problem.
    pub error: String,

    /// Machine-readable error code.
    ///
    /// | `code` | HTTP status |
    /// |--------|------------|
    /// | `method_not_allowed` | 400 |
    /// | `invalid_parameter` | 400 |
    /// | `validation_failed` | 400 |
    /// | `not_found` | 404 |
    /// | `internal_error` | 500 |
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            error: error.into(),
        }
    }
}

/// Error codes used by the API.
pub mod codes {
    pub const METHOD_NOT_ALLOWED: &str = "method_not_allowed";
    pub const INVALID_PARAMETER: &str = "invalid_parameter";
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const NOT_FOUND: &str = "not_found";
    pub const INTERNAL_ERROR: &str = "internal_error";
}
