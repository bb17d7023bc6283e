//! HTTP primitives for Lumen.
//!
//! This crate is the only one in the workspace that names `axum` directly.
//! Everything else reaches the router, extractors and response types
//! through these re-exports, so swapping the underlying server only touches
//! this crate.

pub mod body;
pub mod extract;
pub mod header;
pub mod response;
pub mod routing;

pub use axum::{serve, Extension, Json, Router};
pub use axum::http::Uri;
pub use bytes::Bytes;
pub use self::extract::{FromRequestParts, Query, RawPathParams, Request, State};
pub use self::header::{
    HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
    // Common header constants
    CONTENT_TYPE, LOCATION,
};
pub use self::response::{Html, IntoResponse, Response};
pub use self::body::Body;
