use std::sync::Arc;

use http_body_util::BodyExt;
use lumen_core::http::header::HttpRequest;
use lumen_core::http::routing::{on, MethodFilter};
use lumen_core::http::{Body, Extension, Method, Router, StatusCode};
use lumen_core::{
    AppBuilder, Args, Controller, ControllerKey, ControllerRoutes, HandlerMap, HttpError,
    MetadataRegistry, NoState, RegistrationError, RequestContext, RouteTable,
};
use serde_json::json;
use tower::ServiceExt;

async fn send_get(router: Router, path: &str) -> (StatusCode, String) {
    let req = HttpRequest::builder().uri(path).body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&bytes).to_string())
}

fn compile(register: impl FnOnce(&mut ControllerRoutes<'_, Blog, NoState>)) -> Result<RouteTable<NoState>, RegistrationError> {
    let mut registry = MetadataRegistry::new();
    let mut handlers = HandlerMap::new();
    register(&mut ControllerRoutes::new(&mut registry, &mut handlers));
    RouteTable::compile(&registry, &handlers)
}

struct Blog;

impl Controller<NoState> for Blog {
    fn new(_ctx: RequestContext, _state: &NoState) -> Self {
        Blog
    }

    fn register(routes: &mut ControllerRoutes<'_, Self, NoState>) {
        routes
            .base_path("blog")
            .get("/", "index", |_this: Blog, _args: Args| async move {
                Ok::<_, HttpError>("index")
            })
            .get("posts/:slug/", "post", |_this: Blog, args: Args| async move {
                Ok::<_, HttpError>(format!("post {}", args.str(0).unwrap_or("?")))
            })
            .path_param("post", 0, "slug")
            .get("/files/*rest", "file", |_this: Blog, args: Args| async move {
                Ok::<_, HttpError>(format!("file {}", args.str(0).unwrap_or("?")))
            })
            .path_param("file", 0, "rest")
            .handler("archive", |_this: Blog, _args: Args| async move {
                Ok::<_, HttpError>("archive")
            })
            .bind(Method::GET, "//archive//", "archive")
            .bind(Method::HEAD, "/archive", "archive");
    }
}

#[test]
fn full_paths_join_base_and_sub_paths() {
    let table = compile(Blog::register).unwrap();
    let routes: Vec<(Method, &str)> = table
        .entries()
        .map(|e| (e.method.clone(), e.full_path.as_str()))
        .collect();
    assert_eq!(
        routes,
        vec![
            (Method::GET, "/blog"),
            (Method::GET, "/blog/posts/:slug"),
            (Method::GET, "/blog/files/*rest"),
            (Method::GET, "/blog/archive"),
            (Method::HEAD, "/blog/archive"),
        ]
    );
    assert_eq!(table.entries().nth(1).unwrap().params().len(), 1);
}

#[test]
fn routes_without_base_path_are_rejected() {
    let err = compile(|routes| {
        routes.get("/", "index", |_this: Blog, _args: Args| async move {
            Ok::<_, HttpError>("index")
        });
    })
    .unwrap_err();
    assert!(matches!(err, RegistrationError::MissingBasePath { .. }));
}

#[test]
fn binding_an_undefined_handler_is_rejected() {
    let err = compile(|routes| {
        routes.base_path("/blog").bind(Method::GET, "/", "ghost");
    })
    .unwrap_err();
    match err {
        RegistrationError::UnknownHandler { handler, path, .. } => {
            assert_eq!(handler, "ghost");
            assert_eq!(path, "/blog");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn extension_methods_cannot_be_routed() {
    let err = compile(|routes| {
        routes.base_path("/blog").route(
            Method::from_bytes(b"PURGE").unwrap(),
            "/cache",
            "purge",
            |_this: Blog, _args: Args| async move { Ok::<_, HttpError>(()) },
        );
    })
    .unwrap_err();
    assert!(matches!(err, RegistrationError::UnsupportedMethod { .. }));
}

#[test]
fn last_base_path_wins() {
    let table = compile(|routes| {
        routes
            .base_path("/old")
            .base_path("/new")
            .get("/", "index", |_this: Blog, _args: Args| async move {
                Ok::<_, HttpError>("index")
            });
    })
    .unwrap();
    assert_eq!(table.entries().next().unwrap().full_path, "/new");
}

#[test]
fn controllers_without_routes_need_no_base_path() {
    let table = compile(|routes| {
        routes.handler("unused", |_this: Blog, _args: Args| async move {
            Ok::<_, HttpError>(())
        });
    })
    .unwrap();
    assert!(table.is_empty());
}

#[test]
fn handler_name_defined_twice_is_rejected() {
    let err = compile(|routes| {
        routes
            .base_path("/d")
            .get("/a", "show", |_this: Blog, _args: Args| async move {
                Ok::<_, HttpError>("one")
            })
            .get("/b", "show", |_this: Blog, _args: Args| async move {
                Ok::<_, HttpError>("two")
            });
    })
    .unwrap_err();

    match &err {
        RegistrationError::DuplicateHandler { controller, handler } => {
            assert!(controller.ends_with("Blog"));
            assert_eq!(handler, "show");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("`show` is defined more than once"));
}

#[test]
fn controller_registered_twice_fails_to_build() {
    let result = AppBuilder::new()
        .register_controller::<Blog>()
        .register_controller::<Blog>()
        .build();
    assert!(matches!(result, Err(RegistrationError::DuplicateHandler { .. })));
}

#[tokio::test]
async fn build_fails_on_malformed_registration() {
    struct Headless;

    impl Controller<NoState> for Headless {
        fn new(_ctx: RequestContext, _state: &NoState) -> Self {
            Headless
        }

        fn register(routes: &mut ControllerRoutes<'_, Self, NoState>) {
            routes.get("/", "index", |_this: Headless, _args: Args| async move {
                Ok::<_, HttpError>(())
            });
        }
    }

    let result = AppBuilder::new().register_controller::<Headless>().build();
    assert!(matches!(result, Err(RegistrationError::MissingBasePath { .. })));
}

#[tokio::test]
async fn bound_routes_receive_path_params() {
    let router = AppBuilder::new().register_controller::<Blog>().build().unwrap();

    assert_eq!(send_get(router.clone(), "/blog").await, (StatusCode::OK, "index".into()));
    assert_eq!(
        send_get(router.clone(), "/blog/posts/hello-world").await,
        (StatusCode::OK, "post hello-world".into())
    );
    assert_eq!(
        send_get(router.clone(), "/blog/files/css/site.css").await,
        (StatusCode::OK, "file css/site.css".into())
    );
    assert_eq!(send_get(router, "/blog/archive").await, (StatusCode::OK, "archive".into()));
}

#[tokio::test]
async fn frozen_registry_is_attached_to_the_router() {
    let introspect = Router::new().route(
        "/_routes",
        on(MethodFilter::GET, |Extension(registry): Extension<Arc<MetadataRegistry>>| async move {
            registry.routes(ControllerKey::of::<Blog>()).len().to_string()
        }),
    );
    let router = AppBuilder::new()
        .register_controller::<Blog>()
        .register_routes(introspect)
        .build()
        .unwrap();

    assert_eq!(send_get(router, "/_routes").await, (StatusCode::OK, "5".into()));
}

struct Photos;

impl Controller<NoState> for Photos {
    fn new(_ctx: RequestContext, _state: &NoState) -> Self {
        Photos
    }

    fn register(routes: &mut ControllerRoutes<'_, Self, NoState>) {
        routes
            .base_path("/photos")
            .handler("index", |_this: Photos, _args: Args| async move {
                Ok::<_, HttpError>("all photos")
            })
            .handler("show", |_this: Photos, args: Args| async move {
                Ok::<_, HttpError>(format!("photo {}", args.str(0).unwrap_or("?")))
            })
            .path_param("show", 0, "id")
            .handler("create", |_this: Photos, _args: Args| async move {
                Ok::<_, HttpError>(json!({"status": 201, "id": 1}))
            })
            .resources("/");
    }
}

#[tokio::test]
async fn resources_bind_only_defined_handlers() {
    let mut registry = MetadataRegistry::new();
    let mut handlers = HandlerMap::new();
    Photos::register(&mut ControllerRoutes::new(&mut registry, &mut handlers));
    let table = RouteTable::compile(&registry, &handlers).unwrap();
    let routes: Vec<(Method, &str, &str)> = table
        .entries()
        .map(|e| (e.method.clone(), e.full_path.as_str(), e.handler.as_str()))
        .collect();
    assert_eq!(
        routes,
        vec![
            (Method::GET, "/photos", "index"),
            (Method::GET, "/photos/:id", "show"),
            (Method::POST, "/photos", "create"),
        ]
    );

    let router = AppBuilder::new().register_controller::<Photos>().build().unwrap();
    assert_eq!(send_get(router.clone(), "/photos").await, (StatusCode::OK, "all photos".into()));
    assert_eq!(send_get(router, "/photos/42").await, (StatusCode::OK, "photo 42".into()));
}
