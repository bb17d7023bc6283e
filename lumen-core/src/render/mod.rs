//! HTML document rendering with hydration state.
//!
//! [`TemplateRenderer::render`] is the only place that chooses between
//! [`StreamingRender`] and [`BufferedRender`]: streaming is tried first
//! (unless buffered output was requested) and any failure falls back to a
//! buffered render of the same target.

pub mod document;
pub mod strategy;
pub mod view;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;

use crate::config::{ConfigError, LumenConfig};
use crate::error::RenderError;
use crate::http::body::to_bytes;
use crate::http::header::CONTENT_TYPE;
use crate::http::response::{Html, IntoResponse, Response};
use crate::http::{Body, HeaderValue};
use crate::seo::SeoProperties;

pub use document::{DocumentSettings, DocumentShell};
pub use strategy::{BufferedRender, RenderStrategy, StreamingRender};
pub use view::{view_fn, FnView, MarkupStream, RenderTarget, View};

/// Which strategy the renderer starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    #[default]
    Streaming,
    Buffered,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown render mode `{0}` (expected `streaming` or `buffered`)")]
pub struct UnknownRenderMode(String);

impl FromStr for RenderMode {
    type Err = UnknownRenderMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "streaming" | "stream" => Ok(RenderMode::Streaming),
            "buffered" | "sync" | "synchronous" => Ok(RenderMode::Buffered),
            _ => Err(UnknownRenderMode(s.to_string())),
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderMode::Streaming => f.write_str("streaming"),
            RenderMode::Buffered => f.write_str("buffered"),
        }
    }
}

/// Renderer settings (`lumen.render.*`, `lumen.document.*`, `lumen.hydration.*`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    pub mode: RenderMode,
    /// How long the streaming strategy waits for the shell.
    pub shell_timeout: Duration,
    pub document: DocumentSettings,
}

impl RenderConfig {
    pub const DEFAULT_SHELL_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn from_config(config: &LumenConfig) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let doc = defaults.document;

        let mode = match config.get_opt::<String>("lumen.render.mode")? {
            Some(raw) => raw.parse().map_err(|_| ConfigError::TypeMismatch {
                key: "lumen.render.mode".into(),
                expected: "streaming | buffered",
            })?,
            None => defaults.mode,
        };
        let shell_timeout = config
            .get_opt::<u64>("lumen.render.timeout")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.shell_timeout);

        Ok(Self {
            mode,
            shell_timeout,
            document: DocumentSettings {
                lang: config.get_opt("lumen.document.lang")?.unwrap_or(doc.lang),
                default_title: config.get_opt("lumen.document.title")?.unwrap_or(doc.default_title),
                mount_id: config.get_opt("lumen.document.mount")?.unwrap_or(doc.mount_id),
                head: config.get_opt("lumen.document.head")?.unwrap_or(doc.head),
                hydration_global: config
                    .get_opt("lumen.hydration.global")?
                    .unwrap_or(doc.hydration_global),
                hydration_script: config
                    .get_opt("lumen.hydration.script")?
                    .unwrap_or(doc.hydration_script),
            },
        })
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::default(),
            shell_timeout: Self::DEFAULT_SHELL_TIMEOUT,
            document: DocumentSettings::default(),
        }
    }
}

/// A rendered HTML document, either fully buffered or still streaming.
pub enum Document {
    Complete(String),
    Streamed(Body),
}

impl Document {
    pub fn is_streamed(&self) -> bool {
        matches!(self, Document::Streamed(_))
    }

    /// Collect the whole document. Waits for a streamed body to finish.
    pub async fn into_bytes(self) -> Result<Bytes, RenderError> {
        match self {
            Document::Complete(html) => Ok(Bytes::from(html)),
            Document::Streamed(body) => to_bytes(body, usize::MAX)
                .await
                .map_err(RenderError::failed),
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Document::Complete(html) => f.debug_tuple("Complete").field(&html.len()).finish(),
            Document::Streamed(_) => f.write_str("Streamed"),
        }
    }
}

impl IntoResponse for Document {
    fn into_response(self) -> Response {
        match self {
            Document::Complete(html) => Html(html).into_response(),
            Document::Streamed(body) => (
                [(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"))],
                body,
            )
                .into_response(),
        }
    }
}

/// Composes documents from render targets.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    config: RenderConfig,
    streaming: StreamingRender,
    buffered: BufferedRender,
}

impl TemplateRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            streaming: StreamingRender::new(config.shell_timeout),
            buffered: BufferedRender,
            config,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn shell(&self, target: &RenderTarget, seo: &SeoProperties) -> Result<DocumentShell, RenderError> {
        DocumentShell::compose(&self.config.document, target, seo)
    }

    /// Render `target` to a complete document.
    ///
    /// # Errors
    ///
    /// The buffered strategy's error when both strategies fail, or
    /// [`RenderError::Serialization`] when the props cannot be serialized.
    pub async fn render(
        &self,
        target: &RenderTarget,
        seo: &SeoProperties,
    ) -> Result<Document, RenderError> {
        let shell = self.shell(target, seo)?;
        let mode = target.requested_mode().unwrap_or(self.config.mode);

        if mode == RenderMode::Streaming {
            match self.streaming.render(target, shell.clone()).await {
                Ok(document) => return Ok(document),
                Err(err) => tracing::warn!(
                    component = target.display_name(),
                    error = %err,
                    "streaming render failed, falling back to buffered render"
                ),
            }
        }

        let document = self.buffered.render(target, shell).await;
        if let Err(err) = &document {
            tracing::error!(component = target.display_name(), error = %err, "render failed");
        }
        document
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}
