//! Handler argument resolution.
//!
//! A handler declares its arguments as a sparse list of [`ParamMeta`]
//! entries. [`resolve_args`] turns that list into an [`Args`] vector whose
//! length is one past the highest declared index; positions nothing was
//! declared for stay absent.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::context::{Continuation, IncomingRequest, RequestContext, ResponseHandle};
use crate::error::HttpError;
use crate::http::{HeaderMap, HeaderName, CONTENT_TYPE};
use crate::registry::{ParamMeta, ParamSource};

/// A single resolved handler argument.
#[derive(Debug, Clone)]
pub enum ParamValue {
    /// Body, query or path data, or a single named value out of them.
    Value(Value),
    /// The whole header set.
    Headers(HeaderMap),
    Request(Arc<IncomingRequest>),
    Response(ResponseHandle),
    Continuation(Continuation),
}

/// Positional handler arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: Vec<Option<ParamValue>>,
}

impl Args {
    pub fn new(values: Vec<Option<ParamValue>>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ParamValue> {
        self.values.get(index).and_then(Option::as_ref)
    }

    pub fn is_absent(&self, index: usize) -> bool {
        self.get(index).is_none()
    }

    /// The raw JSON value at `index`, if the argument is a data argument.
    pub fn value(&self, index: usize) -> Option<&Value> {
        match self.get(index) {
            Some(ParamValue::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// The argument at `index` as a string slice.
    pub fn str(&self, index: usize) -> Option<&str> {
        self.value(index).and_then(Value::as_str)
    }

    /// Deserialize the argument at `index`.
    ///
    /// Path, query and header values arrive as strings; when direct
    /// deserialization fails the string is parsed as JSON once more, so
    /// `"42"` resolves to a number.
    ///
    /// # Errors
    ///
    /// `HttpError::BadRequest` when the argument is absent or does not
    /// deserialize into `T`.
    pub fn parse<T: DeserializeOwned>(&self, index: usize) -> Result<T, HttpError> {
        self.optional(index)?
            .ok_or_else(|| HttpError::BadRequest(format!("missing argument at position {index}")))
    }

    /// Like [`parse`](Self::parse) but an absent or `null` argument yields `None`.
    pub fn optional<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>, HttpError> {
        let value = match self.value(index) {
            None | Some(Value::Null) => return Ok(None),
            Some(value) => value,
        };
        match serde_json::from_value::<T>(value.clone()) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(err) => match value {
                Value::String(raw) => serde_json::from_str::<T>(raw)
                    .map(Some)
                    .map_err(|_| invalid_argument(index, err)),
                _ => Err(invalid_argument(index, err)),
            },
        }
    }

    pub fn headers(&self, index: usize) -> Option<&HeaderMap> {
        match self.get(index) {
            Some(ParamValue::Headers(headers)) => Some(headers),
            _ => None,
        }
    }

    pub fn request(&self, index: usize) -> Option<&Arc<IncomingRequest>> {
        match self.get(index) {
            Some(ParamValue::Request(request)) => Some(request),
            _ => None,
        }
    }

    pub fn response(&self, index: usize) -> Option<&ResponseHandle> {
        match self.get(index) {
            Some(ParamValue::Response(response)) => Some(response),
            _ => None,
        }
    }

    pub fn continuation(&self, index: usize) -> Option<&Continuation> {
        match self.get(index) {
            Some(ParamValue::Continuation(next)) => Some(next),
            _ => None,
        }
    }
}

fn invalid_argument(index: usize, err: serde_json::Error) -> HttpError {
    HttpError::BadRequest(format!("invalid argument at position {index}: {err}"))
}

/// Build the argument list for one handler invocation.
///
/// Declarations are applied in registration order, so a later declaration
/// for the same index replaces an earlier one.
pub fn resolve_args(params: &[ParamMeta], ctx: &RequestContext) -> Args {
    let len = params.iter().map(|p| p.index + 1).max().unwrap_or(0);
    let mut values: Vec<Option<ParamValue>> = vec![None; len];
    let request = ctx.request_arc();

    for param in params {
        let key = param.key.as_deref();
        values[param.index] = match param.source {
            ParamSource::Body => Some(ParamValue::Value(request.body().clone())),
            ParamSource::Query => keyed(request.query(), key),
            ParamSource::PathParam => keyed(request.path_params(), key),
            ParamSource::Header => match key {
                Some(name) => header_value(request.headers(), name).map(ParamValue::Value),
                None => Some(ParamValue::Headers(request.headers().clone())),
            },
            ParamSource::Request => Some(ParamValue::Request(request.clone())),
            ParamSource::Response => Some(ParamValue::Response(ctx.response().clone())),
            ParamSource::Continuation => Some(ParamValue::Continuation(ctx.continuation().clone())),
        };
    }

    Args::new(values)
}

fn keyed(collection: &Map<String, Value>, key: Option<&str>) -> Option<ParamValue> {
    match key {
        Some(key) => collection.get(key).cloned().map(ParamValue::Value),
        None => Some(ParamValue::Value(Value::Object(collection.clone()))),
    }
}

/// Header lookup is case-insensitive; repeated headers are joined with `", "`.
fn header_value(headers: &HeaderMap, name: &str) -> Option<Value> {
    let name = HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes()).ok()?;
    let values: Vec<&str> = headers
        .get_all(&name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(Value::String(values.join(", ")))
    }
}

/// Parse a query string into key-value pairs.
pub fn parse_query_string(query: Option<&str>) -> Vec<(String, String)> {
    match query {
        Some(q) => form_urlencoded::parse(q.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        None => Vec::new(),
    }
}

/// Fold key-value pairs into a JSON object; a repeated key becomes an array.
pub fn pairs_to_object(pairs: impl IntoIterator<Item = (String, String)>) -> Map<String, Value> {
    let mut object = Map::new();
    for (key, value) in pairs {
        match object.get_mut(&key) {
            None => {
                object.insert(key, Value::String(value));
            }
            Some(Value::Array(items)) => items.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
        }
    }
    object
}

/// Decode a request body according to its `Content-Type`.
///
/// An empty body is `null`. JSON bodies must be well formed, form bodies
/// become an object of strings and `text/*` bodies must be valid UTF-8.
/// Any other media type, or a body without a `Content-Type`, is left
/// absent rather than guessed at.
pub fn parse_body(headers: &HeaderMap, bytes: &[u8]) -> Result<Value, HttpError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }

    let mime = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if mime == "application/json" || mime.ends_with("+json") {
        serde_json::from_slice(bytes)
            .map_err(|e| HttpError::BadRequest(format!("invalid JSON body: {e}")))
    } else if mime == "application/x-www-form-urlencoded" {
        let pairs = form_urlencoded::parse(bytes).map(|(k, v)| (k.into_owned(), v.into_owned()));
        Ok(Value::Object(pairs_to_object(pairs)))
    } else if mime.starts_with("text/") {
        std::str::from_utf8(bytes)
            .map(|text| Value::String(text.to_owned()))
            .map_err(|e| HttpError::BadRequest(format!("text body is not valid UTF-8: {e}")))
    } else {
        tracing::debug!(content_type = %mime, len = bytes.len(), "request body left undecoded");
        Ok(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HeaderValue;
    use serde_json::json;

    fn json_headers(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn repeated_query_keys_become_arrays() {
        let pairs = parse_query_string(Some("tag=a&tag=b&tag=c&page=2"));
        let object = pairs_to_object(pairs);
        assert_eq!(object["tag"], json!(["a", "b", "c"]));
        assert_eq!(object["page"], json!("2"));
    }

    #[test]
    fn empty_body_is_null() {
        let body = parse_body(&json_headers("application/json"), b"").unwrap();
        assert_eq!(body, Value::Null);
    }

    #[test]
    fn json_body_is_parsed() {
        let body = parse_body(&json_headers("application/json; charset=utf-8"), br#"{"a":1}"#).unwrap();
        assert_eq!(body, json!({"a": 1}));
    }

    #[test]
    fn malformed_json_body_is_bad_request() {
        let err = parse_body(&json_headers("application/json"), b"{oops").unwrap_err();
        assert!(matches!(err, HttpError::BadRequest(_)));
    }

    #[test]
    fn form_body_becomes_object() {
        let body = parse_body(
            &json_headers("application/x-www-form-urlencoded"),
            b"name=Ada+Lovelace&role=admin",
        )
        .unwrap();
        assert_eq!(body, json!({"name": "Ada Lovelace", "role": "admin"}));
    }

    #[test]
    fn text_body_must_be_utf8() {
        let body = parse_body(&json_headers("text/plain; charset=utf-8"), "héllo".as_bytes()).unwrap();
        assert_eq!(body, json!("héllo"));

        let err = parse_body(&json_headers("text/plain"), &[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, HttpError::BadRequest(msg) if msg.contains("UTF-8")));
    }

    #[test]
    fn binary_and_untyped_bodies_stay_absent() {
        let body = parse_body(&json_headers("application/octet-stream"), &[0xff, 0xfe, 0x00]).unwrap();
        assert_eq!(body, Value::Null);
        assert_eq!(parse_body(&HeaderMap::new(), b"plain words").unwrap(), Value::Null);
    }

    #[test]
    fn parse_falls_back_to_json_inside_strings() {
        let args = Args::new(vec![Some(ParamValue::Value(json!("42")))]);
        let n: u64 = args.parse(0).unwrap();
        assert_eq!(n, 42);
        let s: String = args.parse(0).unwrap();
        assert_eq!(s, "42");
    }

    #[test]
    fn parse_reports_missing_arguments() {
        let args = Args::new(vec![None]);
        assert!(matches!(args.parse::<String>(0), Err(HttpError::BadRequest(_))));
        assert_eq!(args.optional::<String>(0).unwrap(), None);
    }
}
