//! Plugin system.
//!
//! Plugins are composable units of functionality installed into an
//! [`AppBuilder`] with `.with(plugin)`.

use crate::builder::AppBuilder;

/// A composable unit of functionality that can be installed into an [`AppBuilder`].
///
/// Plugins can add layers to the router or change builder settings.
///
/// # Example
///
/// ```ignore
/// use lumen_core::{AppBuilder, Plugin};
///
/// pub struct NoStore;
///
/// impl Plugin for NoStore {
///     fn install<T: Clone + Send + Sync + 'static>(self, app: AppBuilder<T>) -> AppBuilder<T> {
///         app.with_layer_fn(|router| router.layer(SetResponseHeaderLayer::overriding(
///             CACHE_CONTROL,
///             HeaderValue::from_static("no-store"),
///         )))
///     }
/// }
/// ```
pub trait Plugin: Send + 'static {
    /// Install this plugin into the given `AppBuilder`, returning the modified builder.
    fn install<T: Clone + Send + Sync + 'static>(self, app: AppBuilder<T>) -> AppBuilder<T>;

    /// Whether this plugin must be the last one installed.
    ///
    /// The builder warns when another plugin is installed after one that
    /// returns `true`.
    fn should_be_last() -> bool
    where
        Self: Sized,
    {
        false
    }

    /// The name of this plugin (for diagnostics).
    fn name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }
}
