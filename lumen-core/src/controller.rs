//! Controller registration.
//!
//! A controller is a plain type built fresh for every request from the
//! [`RequestContext`] and the application state. Its handlers are stored in
//! a typed [`HandlerMap`] keyed by `(controller type, handler name)`, so a
//! route reaches its handler without any lookup by string on the
//! controller itself.
//!
//! ```ignore
//! struct Users { ctx: RequestContext, db: Db }
//!
//! impl Controller<AppState> for Users {
//!     fn new(ctx: RequestContext, state: &AppState) -> Self {
//!         Self { ctx, db: state.db.clone() }
//!     }
//!
//!     fn register(routes: &mut ControllerRoutes<'_, Self, AppState>) {
//!         routes
//!             .base_path("/users")
//!             .get("/:id", "show", Users::show)
//!             .path_param("show", 0, "id");
//!     }
//! }
//! ```

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::HttpError;
use crate::http::Method;
use crate::params::Args;
use crate::registry::{ControllerKey, MetadataRegistry, ParamSource};
use crate::reply::Reply;

/// The future a handler invocation produces.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Reply, HttpError>> + Send>>;

/// A handler bound to its freshly constructed controller, waiting for arguments.
pub type BoundHandler = Box<dyn FnOnce(Args) -> HandlerFuture + Send>;

/// Builds the controller for one request and binds it to a handler.
pub type Instantiate<T> = Arc<dyn Fn(RequestContext, &T) -> BoundHandler + Send + Sync>;

/// A type grouping related request handlers under one base path.
pub trait Controller<T>: Send + Sized + 'static {
    /// Build the instance serving one request. Called once per request.
    fn new(ctx: RequestContext, state: &T) -> Self;

    /// Declare the base path, routes and parameters of this controller.
    fn register(routes: &mut ControllerRoutes<'_, Self, T>);
}

/// Handlers of every registered controller.
///
/// A name defined twice for one controller keeps its first handler and is
/// recorded, so that compiling the route table can reject it.
pub struct HandlerMap<T> {
    handlers: HashMap<(ControllerKey, String), Instantiate<T>>,
    duplicates: Vec<(ControllerKey, String)>,
}

impl<T> HandlerMap<T> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            duplicates: Vec::new(),
        }
    }

    /// Store `instantiate` under `(controller, name)` unless that name is already taken.
    pub fn insert(&mut self, controller: ControllerKey, name: impl Into<String>, instantiate: Instantiate<T>) {
        let name = name.into();
        match self.handlers.entry((controller, name)) {
            Entry::Vacant(slot) => {
                slot.insert(instantiate);
            }
            Entry::Occupied(slot) => {
                let (_, name) = slot.key();
                tracing::warn!(controller = controller.name(), handler = %name, "handler defined twice");
                self.duplicates.push((controller, name.clone()));
            }
        }
    }

    /// Names that were defined more than once, in definition order.
    pub fn duplicates(&self) -> impl Iterator<Item = (ControllerKey, &str)> {
        self.duplicates.iter().map(|(key, name)| (*key, name.as_str()))
    }

    pub fn get(&self, controller: ControllerKey, name: &str) -> Option<&Instantiate<T>> {
        self.handlers.get(&(controller, name.to_owned()))
    }

    pub fn contains(&self, controller: ControllerKey, name: &str) -> bool {
        self.get(controller, name).is_some()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<T> Default for HandlerMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for HandlerMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMap")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Registration surface handed to [`Controller::register`].
///
/// Every call appends to the [`MetadataRegistry`]; nothing is overwritten.
pub struct ControllerRoutes<'a, C, T> {
    key: ControllerKey,
    registry: &'a mut MetadataRegistry,
    handlers: &'a mut HandlerMap<T>,
    _controller: PhantomData<fn() -> C>,
}

impl<'a, C, T> ControllerRoutes<'a, C, T>
where
    C: Controller<T>,
    T: 'static,
{
    pub fn new(registry: &'a mut MetadataRegistry, handlers: &'a mut HandlerMap<T>) -> Self {
        Self {
            key: ControllerKey::of::<C>(),
            registry,
            handlers,
            _controller: PhantomData,
        }
    }

    pub fn key(&self) -> ControllerKey {
        self.key
    }

    pub fn base_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.registry.register_controller(self.key, path);
        self
    }

    /// Define the handler `name` without binding it to a route.
    ///
    /// The controller is moved into `handler`, which owns it for the rest of
    /// the request.
    pub fn handler<F, Fut, R>(&mut self, name: &str, handler: F) -> &mut Self
    where
        F: Fn(C, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
        R: Into<Reply>,
    {
        let handler = Arc::new(handler);
        let instantiate: Instantiate<T> = Arc::new(move |ctx: RequestContext, state: &T| {
            let controller = C::new(ctx, state);
            let handler = Arc::clone(&handler);
            Box::new(move |args: Args| -> HandlerFuture {
                Box::pin(async move { handler(controller, args).await.map(Into::into) })
            }) as BoundHandler
        });
        self.handlers.insert(self.key, name, instantiate);
        self
    }

    /// Bind an already defined handler to `method` and `sub_path`.
    ///
    /// A handler may be bound to any number of routes. Binding a name that
    /// was never defined is reported when the application is built.
    pub fn bind(&mut self, method: Method, sub_path: impl Into<String>, name: &str) -> &mut Self {
        self.registry.register_route(self.key, method, sub_path, name);
        self
    }

    /// Define handler `name` and bind it to `method` and `sub_path`.
    pub fn route<F, Fut, R>(&mut self, method: Method, sub_path: impl Into<String>, name: &str, handler: F) -> &mut Self
    where
        F: Fn(C, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.handler(name, handler).bind(method, sub_path, name)
    }

    pub fn get<F, Fut, R>(&mut self, sub_path: impl Into<String>, name: &str, handler: F) -> &mut Self
    where
        F: Fn(C, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route(Method::GET, sub_path, name, handler)
    }

    pub fn post<F, Fut, R>(&mut self, sub_path: impl Into<String>, name: &str, handler: F) -> &mut Self
    where
        F: Fn(C, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route(Method::POST, sub_path, name, handler)
    }

    pub fn put<F, Fut, R>(&mut self, sub_path: impl Into<String>, name: &str, handler: F) -> &mut Self
    where
        F: Fn(C, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route(Method::PUT, sub_path, name, handler)
    }

    pub fn patch<F, Fut, R>(&mut self, sub_path: impl Into<String>, name: &str, handler: F) -> &mut Self
    where
        F: Fn(C, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route(Method::PATCH, sub_path, name, handler)
    }

    pub fn delete<F, Fut, R>(&mut self, sub_path: impl Into<String>, name: &str, handler: F) -> &mut Self
    where
        F: Fn(C, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route(Method::DELETE, sub_path, name, handler)
    }

    /// Bind the conventional resource handlers defined so far under `sub_path`.
    ///
    /// | handler   | route                   |
    /// |-----------|-------------------------|
    /// | `index`   | `GET {sub_path}`        |
    /// | `show`    | `GET {sub_path}/:id`    |
    /// | `create`  | `POST {sub_path}`       |
    /// | `update`  | `PUT {sub_path}/:id`    |
    /// | `destroy` | `DELETE {sub_path}/:id` |
    ///
    /// Names without a handler are skipped. The `id` capture still needs a
    /// [`path_param`](Self::path_param) declaration to reach the handler.
    pub fn resources(&mut self, sub_path: &str) -> &mut Self {
        let member = format!("{sub_path}/:id");
        let conventions = [
            ("index", Method::GET, sub_path),
            ("show", Method::GET, member.as_str()),
            ("create", Method::POST, sub_path),
            ("update", Method::PUT, member.as_str()),
            ("destroy", Method::DELETE, member.as_str()),
        ];
        for (name, method, path) in conventions {
            if self.handlers.contains(self.key, name) {
                self.bind(method, path, name);
            }
        }
        self
    }

    /// Declare argument `index` of handler `name`.
    pub fn param(&mut self, name: &str, index: usize, source: ParamSource, key: Option<&str>) -> &mut Self {
        self.registry
            .register_param(self.key, name, index, source, key.map(str::to_owned));
        self
    }

    /// The decoded request body.
    pub fn body(&mut self, name: &str, index: usize) -> &mut Self {
        self.param(name, index, ParamSource::Body, None)
    }

    /// One query parameter.
    pub fn query(&mut self, name: &str, index: usize, key: &str) -> &mut Self {
        self.param(name, index, ParamSource::Query, Some(key))
    }

    /// All query parameters as an object.
    pub fn queries(&mut self, name: &str, index: usize) -> &mut Self {
        self.param(name, index, ParamSource::Query, None)
    }

    /// One path parameter.
    pub fn path_param(&mut self, name: &str, index: usize, key: &str) -> &mut Self {
        self.param(name, index, ParamSource::PathParam, Some(key))
    }

    /// All path parameters as an object.
    pub fn path_params(&mut self, name: &str, index: usize) -> &mut Self {
        self.param(name, index, ParamSource::PathParam, None)
    }

    /// One header, looked up case-insensitively.
    pub fn header(&mut self, name: &str, index: usize, key: &str) -> &mut Self {
        self.param(name, index, ParamSource::Header, Some(key))
    }

    /// The whole header map.
    pub fn headers(&mut self, name: &str, index: usize) -> &mut Self {
        self.param(name, index, ParamSource::Header, None)
    }

    pub fn request(&mut self, name: &str, index: usize) -> &mut Self {
        self.param(name, index, ParamSource::Request, None)
    }

    pub fn response(&mut self, name: &str, index: usize) -> &mut Self {
        self.param(name, index, ParamSource::Response, None)
    }

    pub fn continuation(&mut self, name: &str, index: usize) -> &mut Self {
        self.param(name, index, ParamSource::Continuation, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::IncomingRequest;
    use crate::http::HeaderMap;

    struct Greeter {
        greeting: String,
    }

    impl Controller<String> for Greeter {
        fn new(_ctx: RequestContext, state: &String) -> Self {
            Self {
                greeting: state.clone(),
            }
        }

        fn register(routes: &mut ControllerRoutes<'_, Self, String>) {
            routes
                .base_path("/greet")
                .get("/:name", "hello", |this: Greeter, args: Args| async move {
                    let name = args.str(0).unwrap_or("stranger").to_owned();
                    Ok::<_, HttpError>(format!("{}, {name}", this.greeting))
                })
                .path_param("hello", 0, "name")
                .bind(Method::HEAD, "/:name", "hello");
        }
    }

    #[tokio::test]
    async fn register_fills_registry_and_handler_map() {
        let mut registry = MetadataRegistry::new();
        let mut handlers = HandlerMap::<String>::new();
        Greeter::register(&mut ControllerRoutes::new(&mut registry, &mut handlers));

        let key = ControllerKey::of::<Greeter>();
        assert_eq!(registry.controller_metadata(key)[0].base_path, "/greet");
        assert_eq!(registry.routes(key).len(), 2);
        assert_eq!(registry.params(key, "hello").len(), 1);
        assert_eq!(handlers.len(), 1);

        let request = IncomingRequest::new(Method::GET, "/greet/ada".parse().unwrap(), HeaderMap::new());
        let ctx = RequestContext::new(request);
        let instantiate = handlers.get(key, "hello").unwrap();
        let bound = instantiate(ctx, &"Hello".to_string());
        let args = Args::new(vec![Some(crate::params::ParamValue::Value("ada".into()))]);
        match bound(args).await.unwrap() {
            Reply::Text(text) => assert_eq!(text, "Hello, ada"),
            other => panic!("unexpected reply {other:?}"),
        }
    }
}
