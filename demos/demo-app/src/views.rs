use askama::Template;
use bytes::Bytes;
use futures_util::stream;
use lumen::render::MarkupStream;
use lumen::{RenderError, View};
use serde_json::Value;

#[derive(Template)]
#[template(path = "home_header.html")]
struct HomeHeader<'a> {
    greeting: &'a str,
}

struct UserLink<'a> {
    id: &'a Value,
    name: &'a str,
}

#[derive(Template)]
#[template(path = "user_list.html")]
struct UserList<'a> {
    users: Vec<UserLink<'a>>,
}

#[derive(Template)]
#[template(path = "user_profile.html")]
struct UserCard<'a> {
    name: &'a str,
    email: &'a str,
}

fn render_template(template: &impl Template) -> Result<String, RenderError> {
    template.render().map_err(RenderError::failed)
}

/// Landing page. Streams its header before the user list.
pub struct HomePage;

impl HomePage {
    fn header(props: &Value) -> Result<String, RenderError> {
        let greeting = props["greeting"].as_str().unwrap_or("Welcome");
        render_template(&HomeHeader { greeting })
    }

    fn user_list(props: &Value) -> Result<String, RenderError> {
        let users = props["users"]
            .as_array()
            .map(|users| {
                users
                    .iter()
                    .map(|u| UserLink {
                        id: &u["id"],
                        name: u["name"].as_str().unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        render_template(&UserList { users })
    }
}

impl View for HomePage {
    fn name(&self) -> Option<&str> {
        Some("HomePage")
    }

    fn render(&self, props: &Value) -> Result<String, RenderError> {
        Ok(format!("{}{}", Self::header(props)?, Self::user_list(props)?))
    }

    fn render_stream(&self, props: &Value) -> Result<MarkupStream, RenderError> {
        let chunks: Vec<Result<Bytes, RenderError>> = vec![
            Self::header(props).map(Bytes::from),
            Self::user_list(props).map(Bytes::from),
        ];
        Ok(Box::pin(stream::iter(chunks)))
    }
}

/// Single user card. Renders in one piece.
pub struct UserProfile;

impl View for UserProfile {
    fn name(&self) -> Option<&str> {
        Some("UserProfile")
    }

    fn render(&self, props: &Value) -> Result<String, RenderError> {
        let name = props["name"]
            .as_str()
            .ok_or_else(|| RenderError::failed("user profile needs a name"))?;
        let email = props["email"].as_str().unwrap_or_default();
        render_template(&UserCard { name, email })
    }
}
