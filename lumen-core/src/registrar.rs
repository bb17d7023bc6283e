//! Compiling registry entries into a flat route table and binding it to the router.

use std::fmt;
use std::sync::Arc;

use crate::controller::{HandlerMap, Instantiate};
use crate::dispatch::{dispatch, Pipeline};
use crate::error::RegistrationError;
use crate::http::extract::{Request, State};
use crate::http::routing::{on, MethodFilter};
use crate::http::{Method, Router};
use crate::registry::{ControllerKey, MetadataRegistry, ParamMeta};

/// Join a controller base path and a route sub-path.
///
/// Runs of `/` collapse to one, the result always starts with `/`, and a
/// trailing `/` is dropped unless the result is the root path.
///
/// ```
/// use lumen_core::registrar::merge_path;
///
/// assert_eq!(merge_path("/users/", "/:id"), "/users/:id");
/// assert_eq!(merge_path("users", "list"), "/users/list");
/// assert_eq!(merge_path("/users", "/"), "/users");
/// assert_eq!(merge_path("/", ""), "/");
/// ```
pub fn merge_path(base: &str, sub: &str) -> String {
    let segments: Vec<&str> = base
        .split('/')
        .chain(sub.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut path = String::with_capacity(base.len() + sub.len() + 1);
    for segment in segments {
        path.push('/');
        path.push_str(segment);
    }
    path
}

/// Rewrite `:name` segments to `{name}` and `*rest` to `{*rest}`.
pub(crate) fn router_path(path: &str) -> String {
    if path == "/" {
        return path.to_string();
    }
    path.split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                format!("{{{name}}}")
            } else if let Some(name) = segment.strip_prefix('*') {
                format!("{{*{name}}}")
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// One compiled `{method, full path} -> handler` binding.
pub struct RouteTableEntry<T> {
    pub method: Method,
    pub full_path: String,
    pub controller: ControllerKey,
    pub handler: String,
    filter: MethodFilter,
    params: Arc<[ParamMeta]>,
    instantiate: Instantiate<T>,
}

impl<T> RouteTableEntry<T> {
    pub fn params(&self) -> &[ParamMeta] {
        &self.params
    }

    pub(crate) fn instantiate(&self) -> &Instantiate<T> {
        &self.instantiate
    }
}

impl<T> fmt::Debug for RouteTableEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTableEntry")
            .field("method", &self.method)
            .field("full_path", &self.full_path)
            .field("controller", &self.controller.name())
            .field("handler", &self.handler)
            .field("params", &self.params)
            .finish()
    }
}

/// The compiled route table, in registration order.
pub struct RouteTable<T> {
    entries: Vec<Arc<RouteTableEntry<T>>>,
}

impl<T: Clone + Send + Sync + 'static> RouteTable<T> {
    /// Compile every route of every registered controller.
    ///
    /// # Errors
    ///
    /// A [`RegistrationError`] for the first malformed registration found.
    pub fn compile(registry: &MetadataRegistry, handlers: &HandlerMap<T>) -> Result<Self, RegistrationError> {
        if let Some((controller, name)) = handlers.duplicates().next() {
            return Err(RegistrationError::DuplicateHandler {
                controller: controller.name(),
                handler: name.to_owned(),
            });
        }

        let mut entries = Vec::new();

        for &controller in registry.controllers() {
            let routes = registry.routes(controller);
            if routes.is_empty() {
                continue;
            }

            let metadata = registry.controller_metadata(controller);
            let base = match metadata {
                [] => {
                    return Err(RegistrationError::MissingBasePath {
                        controller: controller.name(),
                    })
                }
                [only] => &only.base_path,
                [.., last] => {
                    tracing::warn!(
                        controller = controller.name(),
                        count = metadata.len(),
                        base_path = %last.base_path,
                        "controller registered more than once, using the last base path"
                    );
                    &last.base_path
                }
            };

            for route in routes {
                let full_path = merge_path(base, &route.sub_path);
                let instantiate = handlers
                    .get(controller, &route.handler)
                    .ok_or_else(|| RegistrationError::UnknownHandler {
                        controller: controller.name(),
                        handler: route.handler.clone(),
                        method: route.method.clone(),
                        path: full_path.clone(),
                    })?
                    .clone();
                let filter = MethodFilter::try_from(route.method.clone()).map_err(|_| {
                    RegistrationError::UnsupportedMethod {
                        controller: controller.name(),
                        handler: route.handler.clone(),
                        method: route.method.clone(),
                    }
                })?;

                entries.push(Arc::new(RouteTableEntry {
                    method: route.method.clone(),
                    full_path,
                    controller,
                    handler: route.handler.clone(),
                    filter,
                    params: registry.params(controller, &route.handler).into(),
                    instantiate,
                }));
            }
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> impl Iterator<Item = &RouteTableEntry<T>> {
        self.entries.iter().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add every entry to `router`, in table order.
    ///
    /// Two entries with the same path and different methods share one
    /// method router; the same method twice on one path is rejected by the
    /// router itself.
    pub fn bind(self, router: Router<T>, pipeline: Arc<Pipeline>) -> Router<T> {
        let mut router = router;
        for entry in self.entries {
            tracing::info!(
                method = %entry.method,
                path = %entry.full_path,
                controller = entry.controller.name(),
                handler = %entry.handler,
                "route bound"
            );
            let path = router_path(&entry.full_path);
            let filter = entry.filter;
            let pipeline = Arc::clone(&pipeline);
            let adapter = move |State(state): State<T>, request: Request| {
                let entry = Arc::clone(&entry);
                let pipeline = Arc::clone(&pipeline);
                async move { dispatch(&pipeline, &entry, &state, request).await }
            };
            router = router.route(&path, on(filter, adapter));
        }
        router
    }
}

impl<T> fmt::Debug for RouteTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}
