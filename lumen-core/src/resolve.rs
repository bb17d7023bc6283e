//! Turning a handler's [`Reply`] into an HTTP response.
//!
//! [`classify`] applies the decision table below, first match wins:
//!
//! | # | Reply                                   | Resolution                        |
//! |---|-----------------------------------------|-----------------------------------|
//! | 1 | absent                                  | `204`, no body                    |
//! | 2 | text containing `<!doctype html`        | HTML document, verbatim           |
//! | 3 | render target                           | rendered document                 |
//! | 4 | object with `redirect`                  | `302` to that location            |
//! | 5 | object with `status`                    | rest of the object, that status   |
//! | 6 | object with `data`                      | the nested value                  |
//! | 7 | any other object                        | the object                        |
//! | 8 | other text                              | `text/plain`                      |
//! | 9 | anything else                           | JSON                              |
//!
//! Changing the order of these checks changes observable behavior.

use serde_json::{Map, Value};

use crate::context::ResponseHandle;
use crate::error::DispatchError;
use crate::http::header::{CONTENT_TYPE, LOCATION};
use crate::http::response::{Html, IntoResponse, Response};
use crate::http::{HeaderValue, Json, StatusCode};
use crate::render::{RenderTarget, TemplateRenderer};
use crate::reply::Reply;

const DOCTYPE_MARKER: &str = "<!doctype html";

/// How a reply will be transmitted.
#[derive(Debug)]
pub enum Resolution {
    NoContent,
    Document(String),
    Render(RenderTarget),
    Redirect(String),
    WithStatus(StatusCode, Value),
    Data(Value),
    Object(Value),
    Text(String),
    Encoded(Value),
}

/// Pick the resolution for `reply`.
///
/// # Errors
///
/// [`DispatchError::InvalidRedirect`] when `redirect` is not a usable
/// location string, [`DispatchError::InvalidStatus`] when `status` is not an
/// HTTP status code.
pub fn classify(reply: Reply) -> Result<Resolution, DispatchError> {
    match reply.normalize() {
        Reply::Absent => Ok(Resolution::NoContent),
        Reply::Text(text) if is_document(&text) => Ok(Resolution::Document(text)),
        Reply::View(target) => Ok(Resolution::Render(target)),
        Reply::Value(Value::Object(object)) => classify_object(object),
        Reply::Text(text) => Ok(Resolution::Text(text)),
        Reply::Value(value) => Ok(Resolution::Encoded(value)),
    }
}

/// Rows 4 to 7: `redirect`, then `status`, then `data`, then the object itself.
fn classify_object(mut object: Map<String, Value>) -> Result<Resolution, DispatchError> {
    if let Some(target) = object.remove("redirect") {
        return match target {
            Value::String(location) if HeaderValue::from_str(&location).is_ok() => {
                Ok(Resolution::Redirect(location))
            }
            other => Err(DispatchError::InvalidRedirect(other)),
        };
    }
    if let Some(status) = object.remove("status") {
        let code = status_code(&status).ok_or(DispatchError::InvalidStatus(status))?;
        return Ok(Resolution::WithStatus(code, Value::Object(object)));
    }
    if let Some(data) = object.remove("data") {
        return Ok(Resolution::Data(data));
    }
    Ok(Resolution::Object(Value::Object(object)))
}

fn is_document(text: &str) -> bool {
    text.len() >= DOCTYPE_MARKER.len()
        && text
            .as_bytes()
            .windows(DOCTYPE_MARKER.len())
            .any(|w| w.eq_ignore_ascii_case(DOCTYPE_MARKER.as_bytes()))
}

/// Accepts numbers and numeric strings in the `100..=999` range.
fn status_code(value: &Value) -> Option<StatusCode> {
    let code = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    u16::try_from(code).ok().and_then(|c| StatusCode::from_u16(c).ok())
}

/// A `302 Found` to `location`, or `None` if it is not a valid header value.
pub(crate) fn redirect_response(location: &str) -> Option<Response> {
    let location = HeaderValue::from_str(location).ok()?;
    Some((StatusCode::FOUND, [(LOCATION, location)]).into_response())
}

/// Transmit a resolution, rendering it first when it is a render target.
///
/// Header overrides on `handle` are applied to every response. A status
/// override is applied unless the resolution picks its own status.
pub async fn transmit(
    resolution: Resolution,
    renderer: &TemplateRenderer,
    handle: &ResponseHandle,
) -> Result<Response, DispatchError> {
    let fixed_status = matches!(
        resolution,
        Resolution::NoContent | Resolution::Redirect(_) | Resolution::WithStatus(..)
    );

    let mut response = match resolution {
        Resolution::NoContent => StatusCode::NO_CONTENT.into_response(),
        Resolution::Document(html) => Html(html).into_response(),
        Resolution::Render(target) => renderer
            .render(&target, &handle.seo())
            .await?
            .into_response(),
        Resolution::Redirect(location) => redirect_response(&location)
            .ok_or(DispatchError::InvalidRedirect(Value::String(location)))?,
        Resolution::WithStatus(status, rest) => (status, Json(rest)).into_response(),
        Resolution::Data(value) | Resolution::Object(value) | Resolution::Encoded(value) => {
            Json(value).into_response()
        }
        Resolution::Text(text) => (
            [(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))],
            text,
        )
            .into_response(),
    };

    let (status, headers) = handle.overrides();
    if let (Some(status), false) = (status, fixed_status) {
        *response.status_mut() = status;
    }
    response.headers_mut().extend(headers);
    Ok(response)
}

/// Classify and transmit in one step.
pub async fn resolve(
    reply: Reply,
    renderer: &TemplateRenderer,
    handle: &ResponseHandle,
) -> Result<Response, DispatchError> {
    transmit(classify(reply)?, renderer, handle).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::view_fn;
    use serde_json::json;

    fn classify_value(value: Value) -> Resolution {
        classify(Reply::from(value)).unwrap()
    }

    #[test]
    fn null_and_unit_are_no_content() {
        assert!(matches!(classify(Reply::from(())).unwrap(), Resolution::NoContent));
        assert!(matches!(classify_value(Value::Null), Resolution::NoContent));
    }

    #[test]
    fn doctype_detection_ignores_case() {
        let html = "<!DOCTYPE html><html></html>";
        assert!(matches!(classify(Reply::from(html)).unwrap(), Resolution::Document(_)));
        let lower = "  <!doctype html>";
        assert!(matches!(classify(Reply::from(lower)).unwrap(), Resolution::Document(_)));
        assert!(matches!(classify(Reply::from("<p>hi</p>")).unwrap(), Resolution::Text(_)));
    }

    #[test]
    fn json_strings_follow_the_text_rules() {
        assert!(matches!(
            classify_value(json!("<!DOCTYPE html>")),
            Resolution::Document(_)
        ));
        assert!(matches!(classify_value(json!("plain")), Resolution::Text(_)));
    }

    #[test]
    fn render_targets_are_rendered() {
        let target = RenderTarget::new(view_fn("Home", |_| Ok(String::new())));
        assert!(matches!(classify(Reply::from(target)).unwrap(), Resolution::Render(_)));
    }

    #[test]
    fn redirect_beats_status_and_data() {
        let resolution = classify_value(json!({"redirect": "/x", "status": 201, "data": 1}));
        assert!(matches!(resolution, Resolution::Redirect(ref l) if l == "/x"));
    }

    #[test]
    fn status_field_is_removed_from_the_body() {
        match classify_value(json!({"status": 201, "foo": "bar"})) {
            Resolution::WithStatus(status, body) => {
                assert_eq!(status, StatusCode::CREATED);
                assert_eq!(body, json!({"foo": "bar"}));
            }
            other => panic!("unexpected resolution {other:?}"),
        }
    }

    #[test]
    fn status_beats_data() {
        assert!(matches!(
            classify_value(json!({"status": 202, "data": [1]})),
            Resolution::WithStatus(StatusCode::ACCEPTED, _)
        ));
    }

    #[test]
    fn data_field_is_unwrapped() {
        match classify_value(json!({"data": [1, 2, 3], "meta": true})) {
            Resolution::Data(data) => assert_eq!(data, json!([1, 2, 3])),
            other => panic!("unexpected resolution {other:?}"),
        }
    }

    #[test]
    fn other_objects_and_values_are_encoded() {
        assert!(matches!(classify_value(json!({"a": 1})), Resolution::Object(_)));
        assert!(matches!(classify_value(json!([1, 2])), Resolution::Encoded(_)));
        assert!(matches!(classify_value(json!(42)), Resolution::Encoded(_)));
        assert!(matches!(classify_value(json!(true)), Resolution::Encoded(_)));
    }

    #[test]
    fn invalid_redirect_and_status_are_errors() {
        assert!(matches!(
            classify(Reply::from(json!({"redirect": 5}))),
            Err(DispatchError::InvalidRedirect(_))
        ));
        assert!(matches!(
            classify(Reply::from(json!({"redirect": "/bad\nlocation"}))),
            Err(DispatchError::InvalidRedirect(_))
        ));
        assert!(matches!(
            classify(Reply::from(json!({"status": 42}))),
            Err(DispatchError::InvalidStatus(_))
        ));
        assert!(matches!(
            classify(Reply::from(json!({"status": "teapot"}))),
            Err(DispatchError::InvalidStatus(_))
        ));
    }

    #[tokio::test]
    async fn status_override_is_ignored_for_no_content() {
        let handle = ResponseHandle::new();
        handle.set_status(StatusCode::ACCEPTED);
        handle.insert_header(
            crate::http::HeaderName::from_static("x-trace"),
            HeaderValue::from_static("1"),
        );
        let renderer = TemplateRenderer::default();

        let empty = resolve(Reply::Absent, &renderer, &handle).await.unwrap();
        assert_eq!(empty.status(), StatusCode::NO_CONTENT);
        assert_eq!(empty.headers()["x-trace"], "1");

        let text = resolve(Reply::from("ok"), &renderer, &handle).await.unwrap();
        assert_eq!(text.status(), StatusCode::ACCEPTED);
        assert_eq!(text.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
    }
}
