pub use axum::http::header::{
    HeaderName, HeaderValue,
    // Common header constants
    ACCEPT, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, HOST, LOCATION, USER_AGENT,
};
pub use axum::http::request::Parts;
pub use axum::http::{HeaderMap, Method, Request as HttpRequest, StatusCode};
