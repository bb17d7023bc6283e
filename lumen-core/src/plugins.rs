//! Built-in plugins for common cross-cutting concerns.
//!
//! Each plugin implements [`Plugin`](crate::plugin::Plugin) and is installed
//! with [`AppBuilder::with()`](crate::builder::AppBuilder::with).

use crate::builder::AppBuilder;
use crate::plugin::Plugin;

/// HTTP request/response tracing.
///
/// Initialises the global `tracing` subscriber (see [`init_tracing()`]) and
/// adds a tower-http `TraceLayer` that logs requests and responses at
/// `DEBUG`.
///
/// [`init_tracing()`]: crate::init_tracing
///
/// ```ignore
/// AppBuilder::new()
///     .with_state(state)
///     .register_controller::<Pages>()
///     .with(Tracing)
///     .serve("0.0.0.0:3000")
///     .await;
/// ```
pub struct Tracing;

impl Plugin for Tracing {
    fn install<T: Clone + Send + Sync + 'static>(self, app: AppBuilder<T>) -> AppBuilder<T> {
        crate::layers::init_tracing();
        app.with_layer_fn(|router| router.layer(crate::layers::default_trace()))
    }
}

/// Converts handler panics into JSON 500 responses.
pub struct ErrorHandling;

impl Plugin for ErrorHandling {
    fn install<T: Clone + Send + Sync + 'static>(self, app: AppBuilder<T>) -> AppBuilder<T> {
        app.with_layer_fn(|router| router.layer(crate::layers::catch_panic_layer()))
    }
}

/// Trailing-slash normalization.
///
/// When no route matches and the path ends with `/`, the request is
/// re-dispatched with the slash stripped, so `/users/` reaches `/users`.
/// Works from any position in the plugin chain.
pub struct NormalizePath;

impl Plugin for NormalizePath {
    fn install<T: Clone + Send + Sync + 'static>(self, app: AppBuilder<T>) -> AppBuilder<T> {
        app.enable_normalize_path()
    }
}
