use super::*;
use crate::test_helpers::FakeTools;
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use serde_json::Value;
use tower::ServiceExt;


const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

fn app(tools: &FakeTools) -> Router {
    create_router(Arc::new(tools.config()))
}

/// `path?url=<encoded video url>&<extra>`
fn with_url(path: &str, extra: &str) -> String {
    let mut uri = format!("{}?url={}", path, urlencoding::encode(VIDEO_URL));
    if !extra.is_empty() {
        uri.push('&');
        uri.push_str(extra);
    }
    uri
}

async fn get(app: Router, uri: &str) -> axum::response::Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

async fn body_bytes(response: axum::response::Response) -> axum::body::Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_api_server_serves_until_shutdown() {
    let tools = FakeTools::builder().build();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(serve(listener, Arc::new(tools.config()), async move {
        let _ = stop_rx.await;
    }));

    let response = reqwest::get(format!("http://{}/", address)).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "OK");

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_cors_enabled() {
    let tools = FakeTools::builder().build();
    let mut config = tools.config();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = create_router(Arc::new(config));

    let request = Request::builder()
        .uri("/")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_cors_disabled() {
    let tools = FakeTools::builder().build();
    let mut config = tools.config();
    config.server.api.cors_enabled = false;
    let app = create_router(Arc::new(config));

    let request = Request::builder()
        .uri("/")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        response
            .headers()
            .get("access-control-allow-origin")
            .is_none()
    );
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let tools = FakeTools::builder().build();
    let response = get(app(&tools), "/nope").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Not found");
}

#[tokio::test]
async fn test_swagger_ui_toggle() {
    let tools = FakeTools::builder().build();

    let response = get(app(&tools), "/swagger-ui/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut config = tools.config();
    config.server.api.swagger_ui = false;
    let response = get(create_router(Arc::new(config)), "/swagger-ui/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_panic_message_extracts_text() {
    let payload: Box<dyn Any + Send> = Box::new("boom");
    assert_eq!(panic_message(payload.as_ref()), "boom");

    let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
    assert_eq!(panic_message(payload.as_ref()), "bang");

    let payload: Box<dyn Any + Send> = Box::new(7_u8);
    assert_eq!(panic_message(payload.as_ref()), "unknown panic");
}
