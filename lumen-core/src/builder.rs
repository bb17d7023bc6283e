use std::sync::Arc;

use tracing::info;

use crate::config::{HttpConfig, LumenConfig};
use crate::controller::{Controller, ControllerRoutes, HandlerMap};
use crate::dispatch::{default_error_handler, ErrorHandler, Pipeline};
use crate::error::{error_response, DispatchError, RegistrationError};
use crate::http::response::Response;
use crate::http::{Extension, Router, StatusCode};
use crate::plugin::Plugin;
use crate::registrar::RouteTable;
use crate::registry::{ControllerKey, MetadataRegistry};
use crate::render::{RenderConfig, TemplateRenderer};

type LayerFn = Box<dyn FnOnce(Router) -> Router + Send>;

/// Marker type: application state has not been set yet.
///
/// `AppBuilder<NoState>` is what [`AppBuilder::new()`] returns. Call
/// [`.with_state()`](AppBuilder::with_state) to move to `AppBuilder<T>`.
/// Controllers that need no state can implement `Controller<NoState>` and
/// be registered without ever setting one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoState;

/// Settings that do not depend on the state type.
struct BuilderConfig {
    config: Option<LumenConfig>,
    render: Option<RenderConfig>,
    error_handler: Option<ErrorHandler>,
    custom_layers: Vec<LayerFn>,
    /// Name of the last plugin that asked to be installed last.
    last_plugin_name: Option<&'static str>,
    /// Whether to install a trailing-slash normalization fallback.
    normalize_path: bool,
}

/// Builder for assembling a Lumen application.
///
/// Collects state, controllers and Tower layers, then produces an
/// `axum::Router` (or starts serving directly) with everything wired
/// together. Controller metadata is written only while the builder is
/// alive; [`build()`](Self::build) freezes it.
pub struct AppBuilder<T: Clone + Send + Sync + 'static = NoState> {
    shared: BuilderConfig,
    state: T,
    registry: MetadataRegistry,
    handlers: HandlerMap<T>,
    routes: Vec<Router<T>>,
}

impl AppBuilder<NoState> {
    pub fn new() -> Self {
        Self {
            shared: BuilderConfig {
                config: None,
                render: None,
                error_handler: None,
                custom_layers: Vec::new(),
                last_plugin_name: None,
                normalize_path: false,
            },
            state: NoState,
            registry: MetadataRegistry::new(),
            handlers: HandlerMap::new(),
            routes: Vec::new(),
        }
    }

    /// Provide the application state handed to every controller constructor.
    ///
    /// Must be called before any controller is registered; controllers
    /// registered on the `NoState` builder are discarded.
    pub fn with_state<S: Clone + Send + Sync + 'static>(self, state: S) -> AppBuilder<S> {
        if !self.registry.is_empty() {
            tracing::warn!(
                controllers = self.registry.controllers().len(),
                "controllers registered before with_state() are discarded"
            );
        }
        AppBuilder {
            shared: self.shared,
            state,
            registry: MetadataRegistry::new(),
            handlers: HandlerMap::new(),
            routes: Vec::new(),
        }
    }
}

impl Default for AppBuilder<NoState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> AppBuilder<T> {
    pub(crate) fn enable_normalize_path(mut self) -> Self {
        self.shared.normalize_path = true;
        self
    }

    /// Install a [`Plugin`] into this builder.
    ///
    /// ```ignore
    /// use lumen_core::plugins::{ErrorHandling, NormalizePath, Tracing};
    ///
    /// AppBuilder::new()
    ///     .with_state(state)
    ///     .with(Tracing)
    ///     .with(ErrorHandling)
    ///     .with(NormalizePath)
    /// ```
    pub fn with<Pl: Plugin>(mut self, plugin: Pl) -> Self {
        if let Some(last_name) = self.shared.last_plugin_name {
            tracing::warn!(
                previous = last_name,
                current = Pl::name(),
                "plugin {} should be installed last, but {} is installed after it",
                last_name,
                Pl::name(),
            );
        }
        if Pl::should_be_last() {
            self.shared.last_plugin_name = Some(Pl::name());
        }
        plugin.install(self)
    }

    /// Use `config` for renderer and request settings.
    ///
    /// Without it every setting takes its default value.
    pub fn with_config(mut self, config: LumenConfig) -> Self {
        self.shared.config = Some(config);
        self
    }

    /// Set the renderer settings directly, bypassing the `lumen.render.*`,
    /// `lumen.document.*` and `lumen.hydration.*` keys.
    pub fn with_render_config(mut self, render: RenderConfig) -> Self {
        self.shared.render = Some(render);
        self
    }

    /// Replace the central error handler.
    ///
    /// The handler receives every error raised between route match and
    /// response, and must produce the response itself.
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(DispatchError) -> Response + Send + Sync + 'static,
    {
        self.shared.error_handler = Some(Arc::new(handler));
        self
    }

    /// Apply a Tower layer to the entire application.
    ///
    /// Layers are applied during `build()`, in registration order.
    pub fn with_layer<L>(mut self, layer: L) -> Self
    where
        L: tower::Layer<crate::http::routing::Route> + Clone + Send + Sync + 'static,
        L::Service: Clone
            + tower::Service<crate::http::header::HttpRequest<crate::http::body::Body>>
            + Send
            + Sync
            + 'static,
        <L::Service as tower::Service<crate::http::header::HttpRequest<crate::http::body::Body>>>::Response:
            crate::http::response::IntoResponse + 'static,
        <L::Service as tower::Service<crate::http::header::HttpRequest<crate::http::body::Body>>>::Error:
            Into<std::convert::Infallible> + 'static,
        <L::Service as tower::Service<crate::http::header::HttpRequest<crate::http::body::Body>>>::Future:
            Send + 'static,
    {
        self.shared
            .custom_layers
            .push(Box::new(move |router| router.layer(layer)));
        self
    }

    /// Apply a custom transformation to the finished router.
    pub fn with_layer_fn<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Router) -> Router + Send + 'static,
    {
        self.shared.custom_layers.push(Box::new(f));
        self
    }

    /// Merge a raw router alongside the controllers.
    pub fn register_routes(mut self, router: Router<T>) -> Self {
        self.routes.push(router);
        self
    }

    /// Register controller `C`: its base path, routes, parameters and handlers.
    pub fn register_controller<C: Controller<T>>(mut self) -> Self {
        let key = ControllerKey::of::<C>();
        let before = self.registry.routes(key).len();
        C::register(&mut ControllerRoutes::new(&mut self.registry, &mut self.handlers));
        tracing::debug!(
            controller = key.name(),
            routes = self.registry.routes(key).len() - before,
            "controller registered"
        );
        self
    }

    /// Controller metadata collected so far.
    pub fn registry(&self) -> &MetadataRegistry {
        &self.registry
    }

    /// Compile the route table and assemble the final router.
    ///
    /// The frozen [`MetadataRegistry`] is attached to the router as an
    /// `Extension<Arc<MetadataRegistry>>`.
    ///
    /// # Errors
    ///
    /// A [`RegistrationError`] when a controller registration is malformed
    /// or the configuration holds an invalid value.
    pub fn build(self) -> Result<Router, RegistrationError> {
        let config = self.shared.config.unwrap_or_default();
        let render = match self.shared.render {
            Some(render) => render,
            None => RenderConfig::from_config(&config)?,
        };
        let http = HttpConfig::from_config(&config)?;

        let registry = Arc::new(self.registry);
        let table = RouteTable::compile(&registry, &self.handlers)?;
        info!(
            controllers = registry.controllers().len(),
            routes = table.len(),
            render_mode = %render.mode,
            "route table compiled"
        );

        let pipeline = Arc::new(Pipeline::new(
            TemplateRenderer::new(render),
            self.shared.error_handler.unwrap_or_else(default_error_handler),
            http.body_limit,
        ));

        let mut router = table.bind(Router::new(), pipeline);
        for r in self.routes {
            router = router.merge(r);
        }

        let mut app: Router = router.with_state(self.state).fallback(not_found);

        // When nothing matches and the path has a trailing slash, strip it
        // and re-dispatch to the same router.
        if self.shared.normalize_path {
            let inner = app.clone();
            app = app.fallback(move |req: crate::http::extract::Request| async move {
                let path = req.uri().path();
                if path.len() > 1 && path.ends_with('/') {
                    let trimmed = path.trim_end_matches('/');
                    let trimmed = if trimmed.is_empty() { "/" } else { trimmed };
                    let new_uri = match req.uri().query() {
                        Some(q) => format!("{trimmed}?{q}"),
                        None => trimmed.to_string(),
                    };
                    let (mut parts, body) = req.into_parts();
                    parts.uri = new_uri.parse().unwrap_or(parts.uri);
                    let new_req = crate::http::header::HttpRequest::from_parts(parts, body);
                    match tower::ServiceExt::oneshot(inner.clone(), new_req).await {
                        Ok(resp) => resp,
                        Err(infallible) => match infallible {},
                    }
                } else {
                    not_found().await
                }
            });
        }

        app = app.layer(Extension(registry));
        for layer_fn in self.shared.custom_layers {
            app = layer_fn(app);
        }
        Ok(app)
    }

    /// Build the application and serve it on `addr` until Ctrl-C or SIGTERM.
    pub async fn serve(self, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.build()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, "Lumen server listening");
        crate::http::serve(
            listener,
            app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        info!("Lumen server stopped");
        Ok(())
    }
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

/// Wait for Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
