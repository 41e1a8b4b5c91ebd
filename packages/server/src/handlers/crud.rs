//! `/crud/{resource}/` and `/crud/{resource}/{pk}/` for every registered
//! resource and every HTTP verb.
//!
//! Work happens in a fixed order: resource lookup, verb gate, primary-key
//! parse, parameter decoding (only where the operation uses parameters),
//! storage. A request rejected at one step never reaches the next.

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
};
use portfolio::{decode_all, ParamValue, Predicates};
use serde_json::{Map, Value};

use crate::{error::AppError, resource::CrudResource, response::JsonEnvelope};

use super::AppState;

/// Everything one request carries into [`dispatch`].
#[derive(Debug)]
pub struct CrudRequest {
    pub method: Method,
    /// Raw `{pk}` path segment, if the URL has one.
    pub pk: Option<String>,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl CrudRequest {
    fn new(
        method: Method,
        pk: Option<String>,
        headers: &HeaderMap,
        query: Option<String>,
        body: Bytes,
    ) -> Self {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        Self {
            method,
            pk,
            query,
            content_type,
            body,
        }
    }

    /// The primary key from the URL. `None` when absent or `0`.
    ///
    /// A segment that is not a non-negative integer names no record, so it
    /// is a 404 rather than a 400.
    fn primary_key(&self) -> Result<Option<i64>, AppError> {
        let Some(raw) = self.pk.as_deref() else {
            return Ok(None);
        };
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AppError::NotFound(format!("no record with pk {raw:?}")));
        }
        match raw.parse::<i64>() {
            Ok(0) => Ok(None),
            Ok(pk) => Ok(Some(pk)),
            Err(_) => Err(AppError::NotFound(format!("no record with pk {raw:?}"))),
        }
    }

    fn query_pairs(&self) -> Result<Vec<(String, String)>, AppError> {
        match self.query.as_deref() {
            Some(q) => serde_urlencoded::from_str(q)
                .map_err(|e| AppError::InvalidParameter(format!("malformed query string: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    fn body_pairs(&self) -> Result<Vec<(String, String)>, AppError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let is_json = self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("application/json"));
        if is_json {
            json_pairs(&self.body)
        } else {
            serde_urlencoded::from_bytes(&self.body)
                .map_err(|e| AppError::InvalidParameter(format!("malformed form body: {e}")))
        }
    }

    /// Decoded parameters for this request's verb.
    fn params(&self) -> Result<Predicates, AppError> {
        let pairs = match self.method {
            Method::GET => self.query_pairs()?,
            Method::DELETE => {
                let mut pairs = self.query_pairs()?;
                pairs.extend(self.body_pairs()?);
                pairs
            }
            _ => self.body_pairs()?,
        };
        Ok(decode_all(pairs)?)
    }
}

/// A JSON object body, as `name::type` → wire-string pairs.
fn json_pairs(body: &[u8]) -> Result<Vec<(String, String)>, AppError> {
    let object: Map<String, Value> = serde_json::from_slice(body).map_err(|e| {
        AppError::InvalidParameter(format!("body must be a JSON object of parameters: {e}"))
    })?;
    object
        .into_iter()
        .map(|(key, value)| -> Result<_, AppError> {
            Ok((key, ParamValue::try_from(&value)?.to_wire()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `ANY /crud/{resource}/`
pub async fn collection(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    method: Method,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response, AppError> {
    let request = CrudRequest::new(method, None, &headers, query, body);
    dispatch(&state, &resource, request).await
}

/// `ANY /crud/{resource}/{pk}/`
pub async fn member(
    State(state): State<AppState>,
    Path((resource, pk)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response, AppError> {
    let request = CrudRequest::new(method, Some(pk), &headers, query, body);
    dispatch(&state, &resource, request).await
}

/// Fallback for every path outside `/crud/`.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {uri}"))
}

/// Run `request` against the resource registered as `resource`.
pub async fn dispatch(
    state: &AppState,
    resource: &str,
    request: CrudRequest,
) -> Result<Response, AppError> {
    let resource = state
        .resources
        .get(resource)
        .ok_or_else(|| AppError::NotFound(format!("no resource named {resource:?}")))?;

    if let Err(e) = resource.gate().check(&request.method) {
        tracing::debug!(resource = resource.path(), method = %request.method, "verb rejected");
        return Err(e);
    }

    let pk = request.primary_key()?;
    handle(resource, state, &request, pk).await
}

/// Parameters are only decoded by the operations that use them; a lookup or
/// delete by pk ignores whatever else the request carries.
async fn handle(
    resource: &CrudResource,
    state: &AppState,
    request: &CrudRequest,
    pk: Option<i64>,
) -> Result<Response, AppError> {
    let storage = state.storage.as_ref();
    let response = match (&request.method, pk) {
        (&Method::GET, Some(pk)) => {
            JsonEnvelope(resource.retrieve(storage, pk).await?).into_response()
        }
        (&Method::GET, None) => {
            let params = request.params()?;
            JsonEnvelope(resource.list(storage, &params).await?).into_response()
        }
        (&Method::PUT | &Method::POST, _) => {
            let params = request.params()?;
            JsonEnvelope(resource.create(storage, &params).await?).into_response()
        }
        (&Method::DELETE, Some(pk)) => {
            JsonEnvelope(resource.destroy(storage, pk).await?).into_response()
        }
        (&Method::DELETE, None) => {
            let params = request.params()?;
            JsonEnvelope(resource.destroy_matching(storage, &params).await?).into_response()
        }
        (other, _) => {
            return Err(AppError::MethodNotAllowed(format!(
                "This resource does not support the method \"{other}\""
            )))
        }
    };
    Ok(response)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
