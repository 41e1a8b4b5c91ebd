//! Enveloped JSON responses.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use portfolio_api::Envelope;
use serde::Serialize;

/// Responds with `{"response": <payload>}`, indented by four spaces.
///
/// Handlers return this instead of `axum::Json` so every body carries the
/// envelope.
#[derive(Debug, Clone)]
pub struct JsonEnvelope<T>(pub T);

impl<T: Serialize> IntoResponse for JsonEnvelope<T> {
    fn into_response(self) -> Response {
        match Envelope::new(self.0).render() {
            Ok(body) => (
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                )],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("failed to serialise response body: {e}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
