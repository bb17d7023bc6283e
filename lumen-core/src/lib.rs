//! Core runtime of the Lumen web framework.
//!
//! Controllers register their routes and parameters in an append-only
//! [`MetadataRegistry`]. At build time the registry is frozen and compiled
//! into a flat route table bound to an axum router. Each matched request
//! gets a fresh controller, its declared arguments, and a response picked
//! by the [`resolve`] decision table, with render targets turned into
//! hydratable HTML documents by the [`TemplateRenderer`].

pub use lumen_http as http;

pub mod builder;
pub mod config;
pub mod context;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod layers;
pub mod params;
pub mod plugin;
pub mod plugins;
pub mod prelude;
pub mod registrar;
pub mod registry;
pub mod render;
pub mod reply;
pub mod resolve;
pub mod seo;
pub mod types;

pub use builder::{AppBuilder, NoState};
pub use config::{ConfigError, ConfigValue, FromConfigValue, HttpConfig, LumenConfig};
pub use context::{Continuation, IncomingRequest, RequestContext, ResponseHandle};
pub use controller::{BoundHandler, Controller, ControllerRoutes, HandlerFuture, HandlerMap, Instantiate};
pub use dispatch::{default_error_handler, dispatch, ErrorHandler, Pipeline};
pub use error::{error_response, DispatchError, HttpError, RegistrationError, RenderError};
pub use layers::{catch_panic_layer, default_trace, init_tracing};
pub use params::{resolve_args, Args, ParamValue};
pub use plugin::Plugin;
pub use registrar::{merge_path, RouteTable, RouteTableEntry};
pub use registry::{ControllerKey, ControllerMeta, MetadataRegistry, ParamMeta, ParamSource, RouteMeta};
pub use render::{
    view_fn, BufferedRender, Document, DocumentSettings, DocumentShell, RenderConfig, RenderMode,
    RenderStrategy, RenderTarget, StreamingRender, TemplateRenderer, View,
};
pub use reply::Reply;
pub use resolve::{classify, Resolution};
pub use seo::SeoProperties;
