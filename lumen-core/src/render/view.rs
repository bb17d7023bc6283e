use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::{self, Stream};
use serde::Serialize;
use serde_json::Value;

use crate::error::RenderError;
use crate::render::RenderMode;

/// Incremental markup produced by a [`View`]. The first item is the shell.
pub type MarkupStream = Pin<Box<dyn Stream<Item = Result<Bytes, RenderError>> + Send>>;

/// Fallback display name when neither an explicit nor a declared name exists.
pub const DEFAULT_COMPONENT_NAME: &str = "Component";

/// A component that turns a property tree into HTML markup.
///
/// Only [`render`](View::render) is required. Views that can produce output
/// incrementally override [`render_stream`](View::render_stream); the first
/// chunk they yield is treated as the shell.
pub trait View: Send + Sync + 'static {
    /// Name the client-side bootstrap uses to look the component up.
    fn name(&self) -> Option<&str> {
        None
    }

    fn render(&self, props: &Value) -> Result<String, RenderError>;

    fn render_stream(&self, props: &Value) -> Result<MarkupStream, RenderError> {
        let markup = self.render(props)?;
        Ok(Box::pin(stream::once(async move { Ok(Bytes::from(markup)) })))
    }
}

/// A [`View`] backed by a closure.
pub struct FnView<F> {
    name: &'static str,
    render: F,
}

/// Wrap a closure as a named [`View`].
///
/// ```ignore
/// let home = view_fn("Home", |props| Ok(format!("<h1>{}</h1>", props["title"])));
/// ```
pub fn view_fn<F>(name: &'static str, render: F) -> FnView<F>
where
    F: Fn(&Value) -> Result<String, RenderError> + Send + Sync + 'static,
{
    FnView { name, render }
}

impl<F> View for FnView<F>
where
    F: Fn(&Value) -> Result<String, RenderError> + Send + Sync + 'static,
{
    fn name(&self) -> Option<&str> {
        Some(self.name)
    }

    fn render(&self, props: &Value) -> Result<String, RenderError> {
        (self.render)(props)
    }
}

/// A view plus the properties to render it with.
///
/// Properties are serialized when the target is built. A serialization
/// failure is kept and reported as [`RenderError::Serialization`] when the
/// target is rendered, so it surfaces through the normal error path.
pub struct RenderTarget {
    view: Arc<dyn View>,
    props: Result<Value, String>,
    name: Option<String>,
    mode: Option<RenderMode>,
}

impl RenderTarget {
    /// A target with an empty property object.
    pub fn new(view: impl View) -> Self {
        Self::from_shared(Arc::new(view))
    }

    pub fn from_shared(view: Arc<dyn View>) -> Self {
        Self {
            view,
            props: Ok(Value::Object(Default::default())),
            name: None,
            mode: None,
        }
    }

    pub fn props<P: Serialize + ?Sized>(mut self, props: &P) -> Self {
        self.props = serde_json::to_value(props).map_err(|e| e.to_string());
        self
    }

    /// Override the display name embedded for hydration.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Force a render strategy for this target only.
    pub fn mode(mut self, mode: RenderMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Explicit name, else the view's declared name, else `"Component"`.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or_else(|| self.view.name())
            .unwrap_or(DEFAULT_COMPONENT_NAME)
    }

    pub fn view(&self) -> &dyn View {
        self.view.as_ref()
    }

    pub fn requested_mode(&self) -> Option<RenderMode> {
        self.mode
    }

    pub(crate) fn props_value(&self) -> Result<&Value, RenderError> {
        self.props
            .as_ref()
            .map_err(|e| RenderError::Serialization(e.clone()))
    }
}

impl fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderTarget")
            .field("name", &self.display_name())
            .field("props", &self.props)
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Anonymous;

    impl View for Anonymous {
        fn render(&self, _props: &Value) -> Result<String, RenderError> {
            Ok(String::new())
        }
    }

    #[test]
    fn display_name_prefers_explicit_then_declared_then_fallback() {
        let declared = RenderTarget::new(view_fn("Home", |_| Ok(String::new())));
        assert_eq!(declared.display_name(), "Home");

        let explicit = RenderTarget::new(view_fn("Home", |_| Ok(String::new()))).named("Landing");
        assert_eq!(explicit.display_name(), "Landing");

        let anonymous = RenderTarget::new(Anonymous);
        assert_eq!(anonymous.display_name(), DEFAULT_COMPONENT_NAME);
    }

    #[test]
    fn unserializable_props_are_reported_on_render() {
        // JSON object keys must be strings.
        let mut props = HashMap::new();
        props.insert((1, 2), "tuple key");
        let target = RenderTarget::new(Anonymous).props(&props);
        assert!(matches!(
            target.props_value(),
            Err(RenderError::Serialization(_))
        ));
    }
}
