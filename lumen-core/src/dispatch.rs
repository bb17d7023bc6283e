//! Per-request dispatch: build the controller, resolve its arguments, invoke
//! the handler and turn the outcome into exactly one response.

use std::fmt;
use std::sync::Arc;

use crate::context::{IncomingRequest, RequestContext};
use crate::error::DispatchError;
use crate::http::extract::Request;
use crate::http::response::{IntoResponse, Response};
use crate::params::resolve_args;
use crate::registrar::RouteTableEntry;
use crate::render::TemplateRenderer;
use crate::resolve::resolve;

/// Central error path. Returns a plain response, so it never re-enters the
/// render pipeline.
pub type ErrorHandler = Arc<dyn Fn(DispatchError) -> Response + Send + Sync>;

/// The default error handler: `{"error": message}` with the error's status.
pub fn default_error_handler() -> ErrorHandler {
    Arc::new(DispatchError::into_response)
}

/// Everything dispatch needs besides the route and the state.
#[derive(Clone)]
pub struct Pipeline {
    renderer: TemplateRenderer,
    error_handler: ErrorHandler,
    body_limit: usize,
}

impl Pipeline {
    pub fn new(renderer: TemplateRenderer, error_handler: ErrorHandler, body_limit: usize) -> Self {
        Self {
            renderer,
            error_handler,
            body_limit,
        }
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    pub fn body_limit(&self) -> usize {
        self.body_limit
    }

    /// Log `err` and hand it to the error handler.
    pub fn fail(&self, err: DispatchError) -> Response {
        let status = err.status();
        if status.is_server_error() {
            tracing::error!(%status, error = %err, "request failed");
        } else {
            tracing::debug!(%status, error = %err, "request rejected");
        }
        (self.error_handler)(err)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("renderer", &self.renderer)
            .field("body_limit", &self.body_limit)
            .finish()
    }
}

/// Serve one matched request.
///
/// A response committed through the [`ResponseHandle`](crate::ResponseHandle)
/// wins over anything the handler returns or forwards afterwards; those are
/// only logged. Otherwise a forwarded error wins over the handler's result.
pub async fn dispatch<T>(
    pipeline: &Pipeline,
    route: &RouteTableEntry<T>,
    state: &T,
    request: Request,
) -> Response {
    let incoming = match IncomingRequest::from_request(request, pipeline.body_limit).await {
        Ok(incoming) => incoming,
        Err(err) => return pipeline.fail(err.into()),
    };

    let ctx = RequestContext::new(incoming);
    let args = resolve_args(route.params(), &ctx);
    tracing::debug!(
        controller = route.controller.name(),
        handler = %route.handler,
        args = args.len(),
        "dispatching"
    );

    let bound = (route.instantiate())(ctx.clone(), state);
    let outcome = bound(args).await;
    let forwarded = ctx.continuation().take();

    if let Some(committed) = ctx.response().take_committed() {
        match (&outcome, &forwarded) {
            (Err(err), _) | (_, Some(err)) => tracing::warn!(
                handler = %route.handler,
                error = %err,
                "error raised after the response was sent, ignoring"
            ),
            (Ok(reply), None) => tracing::trace!(
                handler = %route.handler,
                ?reply,
                "handler result ignored, response already sent"
            ),
        }
        return committed;
    }

    if let Some(err) = forwarded {
        if let Err(other) = &outcome {
            tracing::debug!(error = %other, "handler error superseded by forwarded error");
        }
        return pipeline.fail(err.into());
    }

    let result = match outcome {
        Ok(reply) => resolve(reply, &pipeline.renderer, ctx.response()).await,
        Err(err) => Err(err.into()),
    };
    result.unwrap_or_else(|err| pipeline.fail(err))
}
