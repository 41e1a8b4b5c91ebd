//! Verb gate: the first check every CRUD request goes through.

use axum::http::Method;

use crate::error::AppError;

/// A fixed allow-list of HTTP verbs.
///
/// [`VerbGate::check`] runs before any parameter decoding or storage access,
/// so a rejected request has no side effects.
#[derive(Debug, Clone)]
pub struct VerbGate {
    allowed: Vec<Method>,
}

impl VerbGate {
    pub fn new(allowed: impl IntoIterator<Item = Method>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn allowed(&self) -> &[Method] {
        &self.allowed
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.allowed.contains(method)
    }

    /// `Ok` if `method` is allowed, otherwise a 400 naming the verb.
    pub fn check(&self, method: &Method) -> Result<(), AppError> {
        if self.allows(method) {
            Ok(())
        } else {
            Err(AppError::MethodNotAllowed(format!(
                "This resource does not support the method \"{method}\""
            )))
        }
    }
}
