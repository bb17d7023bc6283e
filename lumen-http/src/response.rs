pub use axum::response::{Html, IntoResponse, Response};
