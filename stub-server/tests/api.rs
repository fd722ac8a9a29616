use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use stub_server::{app, StubRegistry, StubResponse};
use tower::ServiceExt;

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get_request(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

#[tokio::test]
async fn unstubbed_path_returns_404() {
    let app = app(StubRegistry::default());
    let resp = app.oneshot(get_request("/missing")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stubbed_path_returns_the_canned_response() {
    let registry = StubRegistry::default();
    registry.stub(
        "/greeting",
        StubResponse::new(200)
            .with_header("Content-Type", "text/plain; charset=utf-8")
            .with_body("hello"),
    );

    let resp = app(registry).oneshot(get_request("/greeting")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap().to_str().unwrap(),
        "text/plain; charset=utf-8"
    );
    let body = body_bytes(resp).await;
    assert_eq!(body.as_ref(), b"hello");
}

#[tokio::test]
async fn no_content_stub_has_an_empty_body() {
    let registry = StubRegistry::default();
    registry.stub("/empty", StubResponse::new(204));

    let resp = app(registry).oneshot(get_request("/empty")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let body = body_bytes(resp).await;
    assert!(body.is_empty());
}

#[tokio::test]
async fn requests_are_recorded() {
    let registry = StubRegistry::default();
    registry.stub("/orders", StubResponse::new(201).with_body("stored"));

    let request = Request::builder()
        .method("POST")
        .uri("/orders")
        .header("X-Request-Id", "abc-123")
        .body("order body".to_string())
        .unwrap();
    app(registry.clone()).oneshot(request).await.unwrap();

    let received = registry.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].method, "POST");
    assert_eq!(received[0].path, "/orders");
    assert_eq!(received[0].header("x-request-id"), Some("abc-123"));
    assert_eq!(received[0].body_text(), "order body");
}

#[tokio::test]
async fn unmatched_requests_are_recorded_too() {
    let registry = StubRegistry::default();

    let resp = app(registry.clone()).oneshot(get_request("/nowhere")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let received = registry.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].path, "/nowhere");
}

#[tokio::test]
async fn each_path_serves_its_own_stub() {
    let registry = StubRegistry::default();
    registry.stub("/a", StubResponse::new(200).with_body("alpha"));
    registry.stub("/b", StubResponse::new(200).with_body("beta"));

    let resp = app(registry).oneshot(get_request("/b")).await.unwrap();

    let body = body_bytes(resp).await;
    assert_eq!(body.as_ref(), b"beta");
}
