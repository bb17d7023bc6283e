use std::time::Duration;

use serde_json::Value;

use crate::http::response::{IntoResponse, Response};
use crate::http::{Json, Method, StatusCode};

/// Helper to create a JSON error response with a standard `{ "error": message }` body.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, Json(body)).into_response()
}

/// Error type returned by controller handlers.
///
/// Each variant maps to an HTTP status; the message becomes the `error`
/// field of the JSON body produced by the default error handler.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Internal Error: {0}")]
    Internal(String),
    #[error("Custom Error ({status}): {body}")]
    Custom { status: StatusCode, body: Value },
}

impl HttpError {
    /// The status code this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::NotFound(_) => StatusCode::NOT_FOUND,
            HttpError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            HttpError::Forbidden(_) => StatusCode::FORBIDDEN,
            HttpError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HttpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HttpError::Custom { status, .. } => *status,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            HttpError::Custom { body, .. } => (status, Json(body)).into_response(),
            HttpError::NotFound(msg)
            | HttpError::Unauthorized(msg)
            | HttpError::Forbidden(msg)
            | HttpError::BadRequest(msg)
            | HttpError::Internal(msg) => error_response(status, msg),
        }
    }
}

impl From<std::io::Error> for HttpError {
    fn from(err: std::io::Error) -> Self {
        HttpError::Internal(err.to_string())
    }
}

/// Generate `From<E> for HttpError` implementations that map error types to
/// a specific `HttpError` variant.
///
/// # Example
///
/// ```ignore
/// lumen_core::map_error! {
///     std::num::ParseIntError => BadRequest,
///     std::fmt::Error => Internal,
/// }
/// ```
#[macro_export]
macro_rules! map_error {
    ( $( $err_ty:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$err_ty> for $crate::HttpError {
                fn from(err: $err_ty) -> Self {
                    $crate::HttpError::$variant(err.to_string())
                }
            }
        )*
    };
}

/// Malformed controller registration, detected while compiling the route
/// table. Always fatal to startup.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("controller `{controller}` declares routes but no base path")]
    MissingBasePath { controller: &'static str },

    #[error("route `{method} {path}` on `{controller}` names unknown handler `{handler}`")]
    UnknownHandler {
        controller: &'static str,
        handler: String,
        method: Method,
        path: String,
    },

    #[error("handler `{handler}` is defined more than once on `{controller}`")]
    DuplicateHandler {
        controller: &'static str,
        handler: String,
    },

    #[error("HTTP method `{method}` used by `{controller}::{handler}` cannot be routed")]
    UnsupportedMethod {
        controller: &'static str,
        handler: String,
        method: Method,
    },

    /// Settings the application needs at startup could not be read.
    #[error("invalid configuration: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Failure while producing an HTML document from a render target.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The view itself reported a failure.
    #[error("render failed: {0}")]
    Failed(String),

    /// The streaming shell did not become ready inside the time bound.
    #[error("render shell was not ready within {0:?}")]
    ShellTimeout(Duration),

    /// A property value could not be encoded for the hydration payload.
    #[error("props could not be serialized: {0}")]
    Serialization(String),

    /// The document template itself failed to render.
    #[error("document template failed: {0}")]
    Template(String),
}

impl RenderError {
    pub fn failed(message: impl std::fmt::Display) -> Self {
        RenderError::Failed(message.to_string())
    }
}

/// Anything that goes wrong between route match and response, routed to
/// the application's error handler.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The handler returned an error or forwarded one through its continuation.
    #[error(transparent)]
    Handler(#[from] HttpError),

    #[error("handler result has a non-string redirect target: {0}")]
    InvalidRedirect(Value),

    #[error("handler result has an invalid status code: {0}")]
    InvalidStatus(Value),

    /// Both render strategies failed.
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::Handler(err) => err.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        match self {
            DispatchError::Handler(err) => err.into_response(),
            other => error_response(other.status(), other.to_string()),
        }
    }
}
