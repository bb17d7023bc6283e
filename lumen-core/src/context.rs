//! Per-request state handed to a freshly constructed controller.
//!
//! A [`RequestContext`] lives for exactly one request. It is created by the
//! dispatcher, cloned into the controller and the resolved arguments, and
//! dropped with the response. Nothing in it is shared between requests.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use http_body_util::LengthLimitError;
use serde_json::{Map, Value};

use crate::error::HttpError;
use crate::http::body::to_bytes;
use crate::http::extract::{FromRequestParts, RawPathParams, RawPathParamsRejection};
use crate::http::response::{IntoResponse, Response};
use crate::http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, Uri};
use crate::params::{pairs_to_object, parse_body, parse_query_string};
use crate::resolve::redirect_response;
use crate::seo::SeoProperties;

/// The parsed incoming request: method, URI, headers, path and query
/// parameters, and the decoded body.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    path_params: Map<String, Value>,
    query: Map<String, Value>,
    body: Value,
}

/// Whether a body read failed on the size limit rather than on the transport.
fn exceeds_limit(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}

impl IncomingRequest {
    /// Build a request without a body or path parameters.
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        let query = pairs_to_object(parse_query_string(uri.query()));
        Self {
            method,
            uri,
            headers,
            path_params: Map::new(),
            query,
            body: Value::Null,
        }
    }

    pub fn with_path_params(mut self, params: Map<String, Value>) -> Self {
        self.path_params = params;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Read and decode an axum request.
    ///
    /// # Errors
    ///
    /// `413` when the body exceeds `body_limit` bytes, `400` when the body
    /// cannot be read or decoded or a path parameter is not valid UTF-8.
    pub async fn from_request(request: Request, body_limit: usize) -> Result<Self, HttpError> {
        let (mut parts, body) = request.into_parts();

        let path_params = match RawPathParams::from_request_parts(&mut parts, &()).await {
            Ok(raw) => raw
                .iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect(),
            Err(RawPathParamsRejection::InvalidUtf8InPathParam(e)) => {
                return Err(HttpError::BadRequest(e.body_text()));
            }
            // Only reachable outside a matched route, where there is nothing to extract.
            Err(_) => Map::new(),
        };

        let bytes = to_bytes(body, body_limit).await.map_err(|e| {
            if exceeds_limit(&e) {
                HttpError::Custom {
                    status: StatusCode::PAYLOAD_TOO_LARGE,
                    body: serde_json::json!({ "error": format!("request body exceeds {body_limit} bytes") }),
                }
            } else {
                HttpError::BadRequest(format!("request body could not be read: {e}"))
            }
        })?;
        let body = parse_body(&parts.headers, &bytes)?;

        Ok(Self::new(parts.method, parts.uri, parts.headers)
            .with_path_params(path_params)
            .with_body(body))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn path_params(&self) -> &Map<String, Value> {
        &self.path_params
    }

    pub fn query(&self) -> &Map<String, Value> {
        &self.query
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}

#[derive(Default)]
struct ResponseState {
    status: Option<StatusCode>,
    headers: HeaderMap,
    seo: SeoProperties,
    committed: Option<Response>,
}

/// Handle on the outgoing response of the current request.
///
/// Handlers use it to override the status, add headers, attach SEO
/// properties, or send a response directly. A directly sent response is
/// final: the handler's return value is then ignored.
#[derive(Clone, Default)]
pub struct ResponseHandle {
    state: Arc<Mutex<ResponseState>>,
}

impl ResponseHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ResponseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_status(&self, status: StatusCode) {
        self.lock().status = Some(status);
    }

    pub fn insert_header(&self, name: HeaderName, value: HeaderValue) {
        self.lock().headers.insert(name, value);
    }

    /// Merge SEO properties into the ones already set for this request.
    pub fn set_seo(&self, seo: SeoProperties) {
        self.lock().seo.merge(seo);
    }

    pub fn seo(&self) -> SeoProperties {
        self.lock().seo.clone()
    }

    /// Send a `302 Found` redirect right away.
    ///
    /// # Errors
    ///
    /// `HttpError::Internal` if `location` is not a valid header value.
    pub fn redirect(&self, location: &str) -> Result<bool, HttpError> {
        let response = redirect_response(location)
            .ok_or_else(|| HttpError::Internal(format!("invalid redirect target: {location:?}")))?;
        Ok(self.send(response))
    }

    /// Commit `response` as the response of this request.
    ///
    /// Returns `false` (and drops `response`) if a response was already sent.
    pub fn send(&self, response: impl IntoResponse) -> bool {
        let mut state = self.lock();
        if state.committed.is_some() {
            tracing::warn!("response already sent; ignoring second response");
            return false;
        }
        state.committed = Some(response.into_response());
        true
    }

    pub fn is_committed(&self) -> bool {
        self.lock().committed.is_some()
    }

    pub(crate) fn take_committed(&self) -> Option<Response> {
        self.lock().committed.take()
    }

    /// Status and header overrides accumulated so far.
    pub(crate) fn overrides(&self) -> (Option<StatusCode>, HeaderMap) {
        let state = self.lock();
        (state.status, state.headers.clone())
    }
}

impl fmt::Debug for ResponseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ResponseHandle")
            .field("status", &state.status)
            .field("headers", &state.headers)
            .field("seo", &state.seo)
            .field("committed", &state.committed.is_some())
            .finish()
    }
}

/// Forwards an error to the application's error handler.
///
/// Calling [`fail`](Continuation::fail) does not interrupt the handler; the
/// forwarded error takes effect once the handler returns, replacing its
/// result. Only the first forwarded error is kept.
#[derive(Clone, Default)]
pub struct Continuation {
    forwarded: Arc<Mutex<Option<HttpError>>>,
}

impl Continuation {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<HttpError>> {
        self.forwarded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fail(&self, err: impl Into<HttpError>) {
        let mut slot = self.lock();
        if slot.is_none() {
            *slot = Some(err.into());
        }
    }

    pub fn is_forwarded(&self) -> bool {
        self.lock().is_some()
    }

    pub(crate) fn take(&self) -> Option<HttpError> {
        self.lock().take()
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("forwarded", &self.is_forwarded())
            .finish()
    }
}

/// Everything a controller instance is bound to for one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request: Arc<IncomingRequest>,
    response: ResponseHandle,
    continuation: Continuation,
}

impl RequestContext {
    pub fn new(request: IncomingRequest) -> Self {
        Self {
            request: Arc::new(request),
            response: ResponseHandle::new(),
            continuation: Continuation::new(),
        }
    }

    pub fn request(&self) -> &IncomingRequest {
        &self.request
    }

    pub(crate) fn request_arc(&self) -> &Arc<IncomingRequest> {
        &self.request
    }

    pub fn response(&self) -> &ResponseHandle {
        &self.response
    }

    pub fn continuation(&self) -> &Continuation {
        &self.continuation
    }

    /// Shorthand for `self.response().set_seo(seo)`.
    pub fn set_seo(&self, seo: SeoProperties) {
        self.response.set_seo(seo);
    }

    /// Shorthand for `self.response().redirect(location)`.
    pub fn redirect(&self, location: &str) -> Result<bool, HttpError> {
        self.response.redirect(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_is_parsed_from_uri() {
        let request = IncomingRequest::new(
            Method::GET,
            "/users?page=2&q=ada".parse().unwrap(),
            HeaderMap::new(),
        );
        assert_eq!(request.query()["page"], "2");
        assert_eq!(request.query()["q"], "ada");
        assert_eq!(request.path(), "/users");
    }

    #[test]
    fn second_send_is_ignored() {
        let handle = ResponseHandle::new();
        assert!(handle.send(StatusCode::ACCEPTED));
        assert!(!handle.send(StatusCode::OK));
        let response = handle.take_committed().unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn continuation_keeps_first_error() {
        let next = Continuation::new();
        next.fail(HttpError::NotFound("first".into()));
        next.fail(HttpError::BadRequest("second".into()));
        assert!(matches!(next.take(), Some(HttpError::NotFound(_))));
        assert!(!next.is_forwarded());
    }
}
