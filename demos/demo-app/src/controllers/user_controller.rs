use lumen::prelude::*;
use serde_json::json;

use crate::models::CreateUserRequest;
use crate::state::Services;
use crate::views::UserProfile;

pub struct UserController {
    ctx: RequestContext,
    services: Services,
}

impl Controller<Services> for UserController {
    fn new(ctx: RequestContext, state: &Services) -> Self {
        Self { ctx, services: state.clone() }
    }

    fn register(routes: &mut ControllerRoutes<'_, Self, Services>) {
        routes
            .base_path("/users")
            .get("/", "list", Self::list)
            .get("/:id", "show", Self::show)
            .path_param("show", 0, "id")
            .header("show", 1, "Accept")
            .post("/", "create", Self::create)
            .body("create", 0)
            .delete("/:id", "remove", Self::remove)
            .path_param("remove", 0, "id")
            .get("/:id/edit", "edit", Self::edit)
            .path_param("edit", 0, "id");
    }
}

impl UserController {
    async fn list(self, _args: Args) -> ApiResult<serde_json::Value> {
        let users = self.services.user_service.list().await;
        Ok(json!({ "data": users }))
    }

    /// JSON for API clients, a rendered profile page otherwise.
    async fn show(self, args: Args) -> ReplyResult {
        let id: u64 = args.parse(0)?;
        let user = self
            .services
            .user_service
            .get_by_id(id)
            .await
            .ok_or_else(|| HttpError::NotFound(format!("user {id} not found")))?;

        let wants_json = args.str(1).is_some_and(|accept| accept.contains("application/json"));
        if wants_json {
            return Reply::json(&user);
        }

        self.ctx.set_seo(SeoProperties::new().title(format!("{} - Lumen Demo", user.name)));
        Ok(RenderTarget::new(UserProfile).props(&user).into())
    }

    async fn create(self, args: Args) -> ApiResult<serde_json::Value> {
        let body: CreateUserRequest = args.parse(0)?;
        if body.name.trim().is_empty() {
            return Err(HttpError::BadRequest("name must not be empty".into()));
        }
        let user = self.services.user_service.create(body.name, body.email).await;
        Ok(json!({ "status": 201, "data": user }))
    }

    async fn remove(self, args: Args) -> ApiResult<()> {
        let id: u64 = args.parse(0)?;
        if self.services.user_service.delete(id).await {
            Ok(())
        } else {
            Err(HttpError::NotFound(format!("user {id} not found")))
        }
    }

    /// Editing is not supported; send clients back to the profile.
    async fn edit(self, args: Args) -> ApiResult<()> {
        let id: u64 = args.parse(0)?;
        self.ctx.redirect(&format!("/users/{id}"))?;
        Ok(())
    }
}
