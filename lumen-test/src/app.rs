use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, IntoHeaderName, CONTENT_TYPE, LOCATION};
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use lumen_core::http::body::Body;
use lumen_core::http::Router;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tower::util::ServiceExt;

/// Default `window` property carrying the hydration payload.
const HYDRATION_GLOBAL: &str = "__HYDRATION_DATA__";

/// In-process HTTP test client wrapping a built Lumen `Router`.
///
/// Uses `tower::ServiceExt::oneshot` to dispatch requests without binding
/// to a TCP port.
pub struct TestApp {
    router: Router,
}

impl TestApp {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Create a `TestApp` from an `AppBuilder` by calling `.build()`.
    ///
    /// # Panics
    ///
    /// If the route table cannot be compiled.
    pub fn from_builder(builder: lumen_core::AppBuilder<impl Clone + Send + Sync + 'static>) -> Self {
        let router = builder
            .build()
            .unwrap_or_else(|e| panic!("failed to build application: {e}"));
        Self::new(router)
    }

    pub fn get(&self, path: &str) -> TestRequest<'_> {
        TestRequest::new(self, Method::GET, path)
    }

    pub fn post(&self, path: &str) -> TestRequest<'_> {
        TestRequest::new(self, Method::POST, path)
    }

    pub fn put(&self, path: &str) -> TestRequest<'_> {
        TestRequest::new(self, Method::PUT, path)
    }

    pub fn patch(&self, path: &str) -> TestRequest<'_> {
        TestRequest::new(self, Method::PATCH, path)
    }

    pub fn delete(&self, path: &str) -> TestRequest<'_> {
        TestRequest::new(self, Method::DELETE, path)
    }

    /// Start building a request with an arbitrary HTTP method.
    pub fn request(&self, method: Method, path: &str) -> TestRequest<'_> {
        TestRequest::new(self, method, path)
    }
}

/// Builder for constructing and sending a test HTTP request.
pub struct TestRequest<'a> {
    app: &'a TestApp,
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl<'a> TestRequest<'a> {
    fn new(app: &'a TestApp, method: Method, path: &str) -> Self {
        Self {
            app,
            method,
            path: path.to_string(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Append a query parameter. Values are form-encoded on send.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl IntoHeaderName, value: impl AsRef<str>) -> Self {
        self.headers.insert(name, value.as_ref().parse().unwrap());
        self
    }

    /// Set the request body as JSON. Also sets Content-Type to `application/json`.
    pub fn json(mut self, body: &impl Serialize) -> Self {
        self.body = Some(serde_json::to_vec(body).unwrap());
        self.headers
            .insert(CONTENT_TYPE, "application/json".parse().unwrap());
        self
    }

    /// Set a form body. Also sets Content-Type to `application/x-www-form-urlencoded`.
    pub fn form<K: AsRef<str>, V: AsRef<str>>(mut self, fields: &[(K, V)]) -> Self {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
            .finish();
        self.body = Some(encoded.into_bytes());
        self.headers.insert(
            CONTENT_TYPE,
            "application/x-www-form-urlencoded".parse().unwrap(),
        );
        self
    }

    /// Set a raw request body.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    fn uri(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.query)
            .finish();
        let sep = if self.path.contains('?') { '&' } else { '?' };
        format!("{}{sep}{encoded}", self.path)
    }

    /// Send the request and collect the whole response.
    pub async fn send(self) -> TestResponse {
        let uri = self.uri();
        let body = match self.body {
            Some(b) => Body::from(b),
            None => Body::empty(),
        };

        let mut builder = Request::builder().method(self.method).uri(uri);
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        let request = builder.body(body).unwrap();

        let response = self
            .app
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("failed to read response body")
            .to_bytes();

        TestResponse { status, headers, body }
    }
}

// ─── JSON path resolution ───

#[derive(Debug)]
pub enum PathToken {
    Field(String),
    Index(usize),
    Len,
}

/// Split `users[0].name` or `items.len()` into path tokens.
pub fn tokenize_path(path: &str) -> Vec<PathToken> {
    let mut tokens = Vec::new();
    for segment in path.split('.') {
        if segment.is_empty() {
            continue;
        }
        if segment == "len()" {
            tokens.push(PathToken::Len);
            continue;
        }
        match segment.find('[') {
            Some(bracket_pos) => {
                let field = &segment[..bracket_pos];
                if !field.is_empty() {
                    tokens.push(PathToken::Field(field.to_string()));
                }
                let mut rest = &segment[bracket_pos..];
                while let Some(start) = rest.find('[') {
                    let end = rest.find(']').expect("unclosed bracket in JSON path");
                    let index: usize = rest[start + 1..end]
                        .parse()
                        .expect("non-numeric array index in JSON path");
                    tokens.push(PathToken::Index(index));
                    rest = &rest[end + 1..];
                }
            }
            None => tokens.push(PathToken::Field(segment.to_string())),
        }
    }
    tokens
}

/// Resolve `path` against `root`. Missing fields and indices resolve to `null`.
pub fn resolve_path(root: &Value, path: &str) -> Value {
    let mut current = root.clone();
    for token in tokenize_path(path) {
        current = match token {
            PathToken::Field(name) => current.get(&name).cloned().unwrap_or(Value::Null),
            PathToken::Index(idx) => current.get(idx).cloned().unwrap_or(Value::Null),
            PathToken::Len => {
                let len = match &current {
                    Value::Array(a) => a.len(),
                    Value::Object(o) => o.len(),
                    Value::String(s) => s.len(),
                    other => panic!("len() applied to a non-collection in \"{path}\": got {other}"),
                };
                Value::from(len)
            }
        };
    }
    current
}

// ─── TestResponse ───

/// Response wrapper with status, JSON-path and document assertions.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    // ── Status assertions ──

    pub fn assert_ok(self) -> Self {
        self.assert_status(StatusCode::OK)
    }

    pub fn assert_created(self) -> Self {
        self.assert_status(StatusCode::CREATED)
    }

    /// Assert status is 204 and the body is empty.
    pub fn assert_no_content(self) -> Self {
        let resp = self.assert_status(StatusCode::NO_CONTENT);
        assert!(resp.body.is_empty(), "Expected empty body, got: {}", resp.text());
        resp
    }

    pub fn assert_bad_request(self) -> Self {
        self.assert_status(StatusCode::BAD_REQUEST)
    }

    pub fn assert_not_found(self) -> Self {
        self.assert_status(StatusCode::NOT_FOUND)
    }

    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.status,
            expected,
            "Expected {expected}, got {}\nBody: {}",
            self.status,
            self.text()
        );
        self
    }

    /// Assert a `302 Found` pointing at `location`.
    pub fn assert_redirect(self, location: &str) -> Self {
        let resp = self.assert_status(StatusCode::FOUND);
        assert_eq!(
            resp.header(LOCATION.as_str()),
            Some(location),
            "redirect target mismatch"
        );
        resp
    }

    pub fn assert_header(self, name: &str, expected: &str) -> Self {
        assert_eq!(
            self.header(name),
            Some(expected),
            "header \"{name}\" mismatch"
        );
        self
    }

    // ── JSON-path assertions ──

    /// Assert that a JSON path resolves to the expected value.
    ///
    /// ```ignore
    /// resp.assert_json_path("users[0].name", "Alice")
    ///     .assert_json_path("users.len()", 2);
    /// ```
    pub fn assert_json_path(self, path: &str, expected: impl Into<Value>) -> Self {
        let root: Value = self.json();
        let actual = resolve_path(&root, path);
        let expected = expected.into();
        assert_eq!(
            actual, expected,
            "JSON path \"{path}\" assertion failed\n  Expected: {expected}\n  Actual:   {actual}\n  Body: {root}",
        );
        self
    }

    pub fn assert_json_path_fn(self, path: &str, predicate: impl FnOnce(&Value) -> bool) -> Self {
        let root: Value = self.json();
        let actual = resolve_path(&root, path);
        assert!(
            predicate(&actual),
            "JSON path \"{path}\" predicate failed\n  Value: {actual}\n  Body: {root}",
        );
        self
    }

    /// Extract and deserialize a value at a JSON path.
    pub fn json_path<T: DeserializeOwned>(&self, path: &str) -> T {
        let root: Value = self.json();
        let value = resolve_path(&root, path);
        serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            panic!("Failed to deserialize JSON path \"{path}\": {e}\n  Value: {value}\n  Body: {root}")
        })
    }

    // ── Document assertions ──

    /// Assert an HTML response whose body contains `fragment`.
    pub fn assert_html(self, fragment: &str) -> Self {
        let content_type = self.header(CONTENT_TYPE.as_str()).unwrap_or_default();
        assert!(
            content_type.starts_with("text/html"),
            "Expected an HTML response, got content-type {content_type:?}"
        );
        let text = self.text();
        assert!(text.contains(fragment), "fragment {fragment:?} not found in:\n{text}");
        self
    }

    /// The `{componentName, props}` object embedded for hydration.
    pub fn hydration_data(&self) -> Value {
        self.hydration_data_in(HYDRATION_GLOBAL)
    }

    /// Like [`hydration_data`](Self::hydration_data) for a custom `lumen.hydration.global`.
    pub fn hydration_data_in(&self, global: &str) -> Value {
        let text = self.text();
        let marker = format!("window.{global} = ");
        let start = text
            .find(&marker)
            .unwrap_or_else(|| panic!("no hydration script for window.{global} in:\n{text}"))
            + marker.len();
        let end = text[start..]
            .find(";</script>")
            .map(|offset| start + offset)
            .expect("unterminated hydration script");
        serde_json::from_str(&text[start..end])
            .unwrap_or_else(|e| panic!("hydration payload is not JSON: {e}"))
    }

    // ── Accessors ──

    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        let name: HeaderName = name.as_ref().parse().ok()?;
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Deserialize the entire response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body)
            .unwrap_or_else(|e| panic!("Failed to parse JSON: {e}\nBody: {}", self.text()))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}
