use std::path::PathBuf;

use axum::body::{to_bytes, Body};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use rendergold::{load_options, renderer, HtmlOptions, Mode, Options, Render, Renderer};

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures/templates")
}

fn fixture_options() -> Options {
    Options {
        directory: fixture_dir().to_string_lossy().into_owned(),
        ..Default::default()
    }
}

fn app(options: Option<Options>, mode: Mode) -> Router {
    Router::new()
        .route(
            "/",
            get(|mut r: Renderer| async move {
                r.html(StatusCode::OK, "0001", &Value::Null, None);
                r
            }),
        )
        .route(
            "/page",
            get(|mut r: Renderer| async move {
                r.html(StatusCode::OK, "page", &json!({ "body": "<x>" }), None);
                r
            }),
        )
        .route(
            "/layout",
            get(|mut r: Renderer| async move {
                let options = HtmlOptions::layout("layout");
                r.html(
                    StatusCode::OK,
                    "0001",
                    &json!({ "title": "Wrapped" }),
                    Some(&options),
                );
                r
            }),
        )
        .route(
            "/missing",
            get(|mut r: Renderer| async move {
                r.html(StatusCode::OK, "notExistTemplate", &Value::Null, None);
                r
            }),
        )
        .route(
            "/broken",
            get(|mut r: Renderer| async move {
                r.html(StatusCode::OK, "0002", &Value::Null, None);
                r
            }),
        )
        .route(
            "/json",
            get(|mut r: Renderer| async move {
                r.json(StatusCode::OK, &json!("hello world"));
                r
            }),
        )
        .route(
            "/created",
            post(|mut r: Renderer| async move {
                r.status(StatusCode::CREATED);
                r
            }),
        )
        .route(
            "/go",
            get(|mut r: Renderer| async move {
                r.redirect("https://github.com", None);
                r
            }),
        )
        .route(
            "/moved",
            get(|mut r: Renderer| async move {
                r.redirect("https://github.com", Some(StatusCode::MOVED_PERMANENTLY));
                r
            }),
        )
        .layer(renderer(options, mode))
}

async fn send(app: Router, method: &str, uri: &str) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_renders_html() {
    let response = send(app(Some(fixture_options()), Mode::Development), "GET", "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=UTF-8");
    assert_eq!(body_string(response).await, "<h1>Gold</h1>\n");
}

#[tokio::test]
async fn test_renders_include_with_escaping() {
    let response = send(app(Some(fixture_options()), Mode::Production), "GET", "/page").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_string(response).await,
        "<nav>Home</nav>\n<section>&lt;x&gt;</section>\n"
    );
}

#[tokio::test]
async fn test_renders_layout() {
    let response = send(app(Some(fixture_options()), Mode::Development), "GET", "/layout").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_string(response).await,
        "<html><body><h1>Wrapped</h1>\n</body></html>\n"
    );
}

#[tokio::test]
async fn test_missing_template_is_500() {
    let response = send(app(Some(fixture_options()), Mode::Development), "GET", "/missing").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_ne!(response.headers()[CONTENT_TYPE], "text/html; charset=UTF-8");
    let body = body_string(response).await;
    assert!(body.contains("notExistTemplate"), "body was: {body}");
}

#[tokio::test]
async fn test_execution_error_is_500() {
    let response = send(app(Some(fixture_options()), Mode::Production), "GET", "/broken").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(response).await;
    assert!(!body.is_empty());
    assert!(!body.contains("<p>"));
}

#[tokio::test]
async fn test_default_directory_is_templates() {
    // No "templates" directory exists next to the crate manifest.
    let response = send(app(None, Mode::Development), "GET", "/").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(response).await;
    assert!(body.contains("templates"), "body was: {body}");
}

#[tokio::test]
async fn test_json_writes_status_only() {
    let response = send(app(Some(fixture_options()), Mode::Development), "GET", "/json").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(CONTENT_TYPE).is_none());
    assert!(body_string(response).await.is_empty());
}

#[tokio::test]
async fn test_status_writes_status_only() {
    let response = send(app(Some(fixture_options()), Mode::Development), "POST", "/created").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(body_string(response).await.is_empty());
}

#[tokio::test]
async fn test_redirect_defaults_to_found() {
    let response = send(app(Some(fixture_options()), Mode::Development), "GET", "/go").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[LOCATION], "https://github.com");
}

#[tokio::test]
async fn test_redirect_with_status() {
    let response = send(app(Some(fixture_options()), Mode::Development), "GET", "/moved").await;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()[LOCATION], "https://github.com");
}

#[tokio::test]
async fn test_missing_middleware_is_rejected() {
    let app = Router::new().route(
        "/",
        get(|mut r: Renderer| async move {
            r.status(StatusCode::OK);
            r
        }),
    );
    let response = send(app, "GET", "/").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_options_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let views = dir.path().join("views");
    std::fs::create_dir_all(&views).unwrap();
    std::fs::write(views.join("0001.gold"), "<h1>{{ title | default(value=\"File\") }}</h1>").unwrap();
    std::fs::write(
        dir.path().join("rendergold.toml"),
        format!(
            "directory = {:?}\ncharset = \"ISO-8859-1\"\nhtml_content_type = \"application/xhtml+xml\"\n",
            views.to_string_lossy()
        ),
    )
    .unwrap();

    let options = load_options(dir.path()).unwrap();
    let response = send(app(Some(options), Mode::Production), "GET", "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[CONTENT_TYPE],
        "application/xhtml+xml; charset=ISO-8859-1"
    );
    assert_eq!(body_string(response).await, "<h1>File</h1>");
}
