use lumen::prelude::*;
use serde_json::json;

use crate::state::Services;
use crate::views::HomePage;

pub struct HomeController {
    ctx: RequestContext,
    services: Services,
}

impl Controller<Services> for HomeController {
    fn new(ctx: RequestContext, state: &Services) -> Self {
        Self { ctx, services: state.clone() }
    }

    fn register(routes: &mut ControllerRoutes<'_, Self, Services>) {
        routes
            .base_path("/")
            .get("/", "index", Self::index)
            .query("index", 0, "greeting")
            .get("/about", "about", |_this: Self, _args: Args| async move {
                Ok::<_, HttpError>(json!({"redirect": "/"}))
            })
            .get("/healthz", "health", |_this: Self, _args: Args| async move {
                Ok::<_, HttpError>("OK")
            });
    }
}

impl HomeController {
    async fn index(self, args: Args) -> ApiResult<RenderTarget> {
        let greeting = args.str(0).unwrap_or("Welcome to Lumen").to_owned();
        let users = self.services.user_service.list().await;

        self.ctx.set_seo(
            SeoProperties::new()
                .title("Lumen Demo")
                .description("Streaming server-side rendering with hydration")
                .og_title("Lumen Demo")
                .canonical("/"),
        );

        Ok(RenderTarget::new(HomePage).props(&json!({
            "greeting": greeting,
            "users": users,
        })))
    }
}
