pub use axum::body::{to_bytes, Body};
