//! Controller, route and parameter metadata.
//!
//! The registry is append-only: every `register_*` call pushes a new entry
//! and nothing is deduplicated or overwritten. It is written while
//! controllers register themselves on the [`AppBuilder`](crate::AppBuilder)
//! and frozen behind an `Arc` when the application is built, after which it
//! is only ever read.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use crate::http::Method;

/// Identity of a controller type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerKey {
    id: TypeId,
    name: &'static str,
}

impl ControllerKey {
    pub fn of<C: 'static>() -> Self {
        Self {
            id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
        }
    }

    /// Fully qualified type name of the controller.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Base path attached to a controller type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerMeta {
    pub base_path: String,
}

/// One HTTP binding declared on a controller handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMeta {
    pub method: Method,
    pub sub_path: String,
    pub handler: String,
}

/// Where a handler argument is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamSource {
    Body,
    Query,
    PathParam,
    Header,
    Request,
    Response,
    Continuation,
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamSource::Body => "body",
            ParamSource::Query => "query",
            ParamSource::PathParam => "path",
            ParamSource::Header => "header",
            ParamSource::Request => "request",
            ParamSource::Response => "response",
            ParamSource::Continuation => "continuation",
        };
        f.write_str(name)
    }
}

/// A declared handler argument at a fixed position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamMeta {
    pub index: usize,
    pub source: ParamSource,
    pub key: Option<String>,
}

/// Append-only store of controller, route and parameter metadata.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    order: Vec<ControllerKey>,
    controllers: HashMap<ControllerKey, Vec<ControllerMeta>>,
    routes: HashMap<ControllerKey, Vec<RouteMeta>>,
    params: HashMap<ControllerKey, HashMap<String, Vec<ParamMeta>>>,
}

impl MetadataRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_controller(&mut self, controller: ControllerKey, base_path: impl Into<String>) {
        self.track(controller);
        self.controllers
            .entry(controller)
            .or_default()
            .push(ControllerMeta {
                base_path: base_path.into(),
            });
    }

    pub fn register_route(
        &mut self,
        controller: ControllerKey,
        method: Method,
        sub_path: impl Into<String>,
        handler: impl Into<String>,
    ) {
        self.track(controller);
        self.routes.entry(controller).or_default().push(RouteMeta {
            method,
            sub_path: sub_path.into(),
            handler: handler.into(),
        });
    }

    pub fn register_param(
        &mut self,
        controller: ControllerKey,
        handler: impl Into<String>,
        index: usize,
        source: ParamSource,
        key: Option<String>,
    ) {
        self.track(controller);
        self.params
            .entry(controller)
            .or_default()
            .entry(handler.into())
            .or_default()
            .push(ParamMeta { index, source, key });
    }

    /// Every controller metadata entry appended for `controller`, oldest first.
    pub fn controller_metadata(&self, controller: ControllerKey) -> &[ControllerMeta] {
        self.controllers
            .get(&controller)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Routes of `controller` in registration order.
    pub fn routes(&self, controller: ControllerKey) -> &[RouteMeta] {
        self.routes.get(&controller).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Parameter declarations of one handler in registration order.
    pub fn params(&self, controller: ControllerKey, handler: &str) -> &[ParamMeta] {
        self.params
            .get(&controller)
            .and_then(|handlers| handlers.get(handler))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Controllers in the order they first appeared in the registry.
    pub fn controllers(&self) -> &[ControllerKey] {
        &self.order
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn track(&mut self, controller: ControllerKey) {
        if !self.order.contains(&controller) {
            self.order.push(controller);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Users;
    struct Posts;

    #[test]
    fn reads_are_empty_when_nothing_registered() {
        let registry = MetadataRegistry::new();
        let users = ControllerKey::of::<Users>();
        assert!(registry.controller_metadata(users).is_empty());
        assert!(registry.routes(users).is_empty());
        assert!(registry.params(users, "index").is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn writes_append_without_deduplicating() {
        let mut registry = MetadataRegistry::new();
        let users = ControllerKey::of::<Users>();
        registry.register_route(users, Method::GET, "/", "index");
        registry.register_route(users, Method::GET, "/", "index");
        assert_eq!(registry.routes(users).len(), 2);

        registry.register_param(users, "index", 0, ParamSource::Query, None);
        registry.register_param(users, "index", 0, ParamSource::Query, None);
        assert_eq!(registry.params(users, "index").len(), 2);
    }

    #[test]
    fn controllers_keep_encounter_order() {
        let mut registry = MetadataRegistry::new();
        let users = ControllerKey::of::<Users>();
        let posts = ControllerKey::of::<Posts>();
        registry.register_route(posts, Method::GET, "/", "index");
        registry.register_controller(users, "/users");
        registry.register_controller(posts, "/posts");
        assert_eq!(registry.controllers(), &[posts, users]);
    }

    #[test]
    fn params_are_scoped_per_handler() {
        let mut registry = MetadataRegistry::new();
        let users = ControllerKey::of::<Users>();
        let posts = ControllerKey::of::<Posts>();
        registry.register_param(users, "show", 0, ParamSource::PathParam, Some("id".into()));
        registry.register_param(posts, "show", 1, ParamSource::Body, None);

        let params = registry.params(users, "show");
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].source, ParamSource::PathParam);
        assert_eq!(params[0].key.as_deref(), Some("id"));
        assert!(registry.params(users, "index").is_empty());
    }
}
