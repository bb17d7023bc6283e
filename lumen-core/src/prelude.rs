//! Lumen prelude: everything a controller module needs with a single `use`.
//!
//! ```ignore
//! use lumen_core::prelude::*;
//!
//! pub struct Pages { ctx: RequestContext }
//!
//! impl Controller<NoState> for Pages {
//!     fn new(ctx: RequestContext, _: &NoState) -> Self { Self { ctx } }
//!
//!     fn register(routes: &mut ControllerRoutes<'_, Self, NoState>) {
//!         routes.base_path("/").get("/", "home", |this: Pages, _| async move {
//!             this.ctx.set_seo(SeoProperties::new().title("Home"));
//!             Ok::<_, HttpError>(RenderTarget::new(HOME))
//!         });
//!     }
//! }
//! ```

// ── Core types ─────────────────────────────────────────────────────────────

pub use crate::builder::{AppBuilder, NoState};
pub use crate::config::{ConfigError, ConfigValue, FromConfigValue, HttpConfig, LumenConfig};
pub use crate::context::{Continuation, IncomingRequest, RequestContext, ResponseHandle};
pub use crate::controller::{Controller, ControllerRoutes};
pub use crate::error::{DispatchError, HttpError, RegistrationError, RenderError};
pub use crate::params::{Args, ParamValue};
pub use crate::plugin::Plugin;
pub use crate::plugins::{ErrorHandling, NormalizePath, Tracing};
pub use crate::registry::ParamSource;
pub use crate::render::{view_fn, RenderConfig, RenderMode, RenderTarget, View};
pub use crate::reply::Reply;
pub use crate::seo::SeoProperties;

// ── Type aliases ───────────────────────────────────────────────────────────

pub use crate::types::{ApiResult, ReplyResult};

// ── HTTP re-exports ────────────────────────────────────────────────────────

pub use crate::http::{Body, Bytes, HeaderMap, Json, Router, StatusCode, Uri};
pub use crate::http::header::{HeaderName, HeaderValue, Method, CONTENT_TYPE, LOCATION};
pub use crate::http::response::{Html, IntoResponse, Response};
