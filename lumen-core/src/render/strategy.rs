use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};

use crate::error::RenderError;
use crate::http::Body;
use crate::render::document::DocumentShell;
use crate::render::view::RenderTarget;
use crate::render::Document;

/// One way of turning a render target into a complete document.
pub trait RenderStrategy: Send + Sync {
    fn render(
        &self,
        target: &RenderTarget,
        shell: DocumentShell,
    ) -> impl Future<Output = Result<Document, RenderError>> + Send;
}

/// Flushes the shell prefix as soon as the view yields its first chunk,
/// then pipes the rest of the view's output followed by the suffix.
#[derive(Debug, Clone, Copy)]
pub struct StreamingRender {
    shell_timeout: Duration,
}

impl StreamingRender {
    pub fn new(shell_timeout: Duration) -> Self {
        Self { shell_timeout }
    }

    pub fn shell_timeout(&self) -> Duration {
        self.shell_timeout
    }
}

impl RenderStrategy for StreamingRender {
    async fn render(
        &self,
        target: &RenderTarget,
        shell: DocumentShell,
    ) -> Result<Document, RenderError> {
        let props = target.props_value()?;
        let mut markup = target.view().render_stream(props)?;

        let first = match tokio::time::timeout(self.shell_timeout, markup.next()).await {
            Ok(Some(chunk)) => chunk?,
            Ok(None) => Bytes::new(),
            Err(_) => {
                // Dropping the stream aborts the view's render.
                drop(markup);
                return Err(RenderError::ShellTimeout(self.shell_timeout));
            }
        };

        let component = target.display_name().to_owned();
        let (prefix, suffix) = shell.into_parts();
        let head = stream::iter([Ok::<_, RenderError>(Bytes::from(prefix)), Ok(first)]);
        let tail = stream::once(async move { Ok(Bytes::from(suffix)) });

        let body = head.chain(markup).chain(tail).inspect(move |chunk| {
            if let Err(err) = chunk {
                // Headers are already sent; the client sees a truncated document.
                tracing::error!(component = %component, error = %err, "render failed mid-stream");
            }
        });
        Ok(Document::Streamed(Body::from_stream(body)))
    }
}

/// Renders the whole view to a string, then wraps it in one pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferedRender;

impl RenderStrategy for BufferedRender {
    async fn render(
        &self,
        target: &RenderTarget,
        shell: DocumentShell,
    ) -> Result<Document, RenderError> {
        let props = target.props_value()?;
        let markup = target.view().render(props)?;
        Ok(Document::Complete(shell.wrap(&markup)))
    }
}
