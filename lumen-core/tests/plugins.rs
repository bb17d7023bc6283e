use http_body_util::BodyExt;
use lumen_core::http::header::{HeaderName, HeaderValue, HttpRequest};
use lumen_core::http::{Body, Response, Router, StatusCode};
use lumen_core::plugins::{ErrorHandling, NormalizePath, Tracing};
use lumen_core::{
    AppBuilder, Args, Controller, ControllerRoutes, HttpError, NoState, Plugin, RequestContext,
};
use tower::util::MapResponseLayer;
use tower::ServiceExt;

struct Health;

impl Controller<NoState> for Health {
    fn new(_ctx: RequestContext, _state: &NoState) -> Self {
        Health
    }

    fn register(routes: &mut ControllerRoutes<'_, Self, NoState>) {
        routes
            .base_path("/health")
            .get("/", "status", |_this: Health, _args: Args| async move {
                Ok::<_, HttpError>("OK")
            })
            .get("/boom", "boom", |_this: Health, _args: Args| async move {
                if true {
                    panic!("probe exploded");
                }
                Ok::<_, HttpError>("unreachable")
            });
    }
}

/// Stamps every response with `x-powered-by: lumen`.
struct PoweredBy;

impl Plugin for PoweredBy {
    fn install<T: Clone + Send + Sync + 'static>(self, app: AppBuilder<T>) -> AppBuilder<T> {
        app.with_layer_fn(|router| {
            router.layer(MapResponseLayer::new(|mut resp: Response| {
                resp.headers_mut().insert(
                    HeaderName::from_static("x-powered-by"),
                    HeaderValue::from_static("lumen"),
                );
                resp
            }))
        })
    }
}

async fn send_get(router: Router, path: &str) -> (StatusCode, String) {
    let req = HttpRequest::builder().uri(path).body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&bytes).to_string())
}

#[tokio::test]
async fn error_handling_turns_panics_into_json_500() {
    let app = AppBuilder::new()
        .register_controller::<Health>()
        .with(ErrorHandling)
        .build()
        .unwrap();

    let (status, body) = send_get(app, "/health/boom").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, r#"{"error":"Internal server error"}"#);
}

#[tokio::test]
async fn tracing_plugin_leaves_responses_untouched() {
    let app = AppBuilder::new()
        .register_controller::<Health>()
        .with(Tracing)
        .build()
        .unwrap();

    assert_eq!(send_get(app, "/health").await, (StatusCode::OK, "OK".into()));
}

#[tokio::test]
async fn normalize_path_keeps_query_strings() {
    let app = AppBuilder::new()
        .with(NormalizePath)
        .register_controller::<Health>()
        .build()
        .unwrap();

    assert_eq!(send_get(app.clone(), "/health/?verbose=1").await, (StatusCode::OK, "OK".into()));
    let (status, _) = send_get(app, "/missing/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn custom_plugins_wrap_the_whole_router() {
    let app = AppBuilder::new()
        .register_controller::<Health>()
        .with(PoweredBy)
        .build()
        .unwrap();

    let req = HttpRequest::builder().uri("/nowhere").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers()["x-powered-by"], "lumen");
}
