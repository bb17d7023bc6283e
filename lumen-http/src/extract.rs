pub use axum::extract::rejection::RawPathParamsRejection;
pub use axum::extract::{FromRequestParts, Query, RawPathParams, Request, State};
