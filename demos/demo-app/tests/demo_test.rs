use demo_app::state::Services;
use lumen::lumen_test::TestApp;
use lumen::LumenConfig;
use serde_json::json;

fn app() -> TestApp {
    TestApp::from_builder(demo_app::app(LumenConfig::empty(), Services::default()))
}

#[tokio::test]
async fn home_page_streams_the_user_list() {
    let resp = app()
        .get("/")
        .query("greeting", "Hi <there>")
        .send()
        .await
        .assert_ok()
        .assert_html("<title>Lumen Demo</title>")
        .assert_html("<h1>Hi &lt;there&gt;</h1>")
        .assert_html("<a href=\"/users/2\">Bob</a>");

    let data = resp.hydration_data();
    assert_eq!(data["componentName"], "HomePage");
    assert_eq!(data["props"]["users"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn users_are_listed_as_json() {
    app()
        .get("/users")
        .send()
        .await
        .assert_ok()
        .assert_json_path("len()", 2)
        .assert_json_path("[0].name", "Alice");
}

#[tokio::test]
async fn show_negotiates_between_json_and_html() {
    let app = app();
    app.get("/users/1")
        .header("accept", "application/json")
        .send()
        .await
        .assert_ok()
        .assert_json_path("email", "alice@example.com");

    app.get("/users/1")
        .send()
        .await
        .assert_ok()
        .assert_html("<title>Alice - Lumen Demo</title>")
        .assert_html("<h2>Alice</h2>");

    app.get("/users/42").send().await.assert_not_found();
}

#[tokio::test]
async fn created_users_can_be_deleted() {
    let app = app();
    let created = app
        .post("/users")
        .json(&json!({"name": "Carol", "email": "carol@example.com"}))
        .send()
        .await
        .assert_created();
    let id: u64 = created.json_path("id");
    assert_eq!(id, 3);

    app.delete(&format!("/users/{id}")).send().await.assert_no_content();
    app.delete(&format!("/users/{id}")).send().await.assert_not_found();
}

#[tokio::test]
async fn invalid_payloads_are_rejected() {
    app()
        .post("/users")
        .json(&json!({"name": "   ", "email": "blank@example.com"}))
        .send()
        .await
        .assert_bad_request()
        .assert_json_path("error", "name must not be empty");

    app()
        .post("/users")
        .json(&json!({"email": "nameless@example.com"}))
        .send()
        .await
        .assert_bad_request();
}

#[tokio::test]
async fn redirects() {
    let app = app();
    app.get("/about").send().await.assert_redirect("/");
    app.get("/users/2/edit").send().await.assert_redirect("/users/2");
    app.get("/users/").send().await.assert_ok();
}
