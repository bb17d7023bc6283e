pub use axum::routing::{on, MethodFilter, MethodRouter, Route};
