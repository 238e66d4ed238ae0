use std::time::Duration;

use api_client::{ApiClient, ApiConfig, ApiConfigOverrides, ApiError, Method, RequestOptions};
use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};

async fn spawn_server() -> String {
    let router = Router::new()
        .route("/json", get(|| async { Json(json!({ "hello": "world" })) }))
        .route("/text", get(|| async { "plain text" }))
        .route(
            "/broken",
            get(|| async { ([(header::CONTENT_TYPE, "application/json")], "{not json") }),
        )
        .route(
            "/fail",
            get(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "message": "page out of range" })),
                )
            }),
        )
        .route(
            "/fail-text",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down for maintenance") }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                "late"
            }),
        )
        .route("/echo", post(echo).get(echo).delete(echo));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn echo(headers: HeaderMap, body: String) -> impl IntoResponse {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "body": body,
        "content_type": header_value("content-type"),
        "accept": header_value("accept"),
        "x_trace": header_value("x-trace"),
    }))
}

fn client_for(base_url: &str) -> ApiClient {
    ApiClient::new(ApiConfig {
        base_url: base_url.to_string(),
        ..ApiConfig::default()
    })
}

#[tokio::test]
async fn test_json_body_is_parsed() {
    let client = client_for(&spawn_server().await);
    let body = client.get("/json").await.unwrap();
    assert_eq!(body, json!({ "hello": "world" }));
}

#[tokio::test]
async fn test_text_body_is_returned_as_string() {
    let client = client_for(&spawn_server().await);
    let body = client.get("/text").await.unwrap();
    assert_eq!(body, Value::String("plain text".to_string()));
}

#[tokio::test]
async fn test_malformed_json_becomes_null() {
    let client = client_for(&spawn_server().await);
    let body = client.get("/broken").await.unwrap();
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_non_2xx_carries_status_and_message() {
    let client = client_for(&spawn_server().await);
    let err = client.get("/fail").await.unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert!(!err.is_transport());
    match err {
        ApiError::Status { message, body, .. } => {
            assert_eq!(message, "page out of range");
            assert_eq!(body["message"], "page out of range");
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_2xx_without_message_uses_status_text() {
    let client = client_for(&spawn_server().await);
    let err = client.get("/fail-text").await.unwrap_err();

    match err {
        ApiError::Status {
            status,
            message,
            body,
        } => {
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(message, "Service Unavailable");
            assert_eq!(body, Value::String("down for maintenance".to_string()));
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_request_times_out() {
    let client = client_for(&spawn_server().await);
    let options = RequestOptions::new(Method::GET).timeout(Duration::from_millis(50));
    let err = client.request("/slow", options).await.unwrap_err();

    assert!(matches!(err, ApiError::Timeout { after } if after == Duration::from_millis(50)));
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_configured_timeout_applies_to_every_request() {
    let mut client = client_for(&spawn_server().await);
    client.configure(ApiConfigOverrides {
        timeout: Some(Duration::from_millis(50)),
        ..ApiConfigOverrides::default()
    });
    let err = client.get("/slow").await.unwrap_err();
    assert!(matches!(err, ApiError::Timeout { .. }));
}

#[tokio::test]
async fn test_post_sends_json_body_with_default_headers() {
    let client = client_for(&spawn_server().await);
    let body = client
        .post("/echo", &json!({ "reaction": "heart" }))
        .await
        .unwrap();

    let sent: Value = serde_json::from_str(body["body"].as_str().unwrap()).unwrap();
    assert_eq!(sent, json!({ "reaction": "heart" }));
    assert_eq!(body["content_type"], "application/json");
    assert_eq!(body["accept"], "application/json");
}

#[tokio::test]
async fn test_string_body_is_sent_verbatim() {
    let client = client_for(&spawn_server().await);
    let options = RequestOptions::new(Method::POST).body(Value::String("raw=1".to_string()));
    let body = client.request("/echo", options).await.unwrap();
    assert_eq!(body["body"], "raw=1");
}

#[tokio::test]
async fn test_get_never_sends_a_body() {
    let client = client_for(&spawn_server().await);
    let options = RequestOptions::new(Method::GET).body(json!({ "ignored": true }));
    let body = client.request("/echo", options).await.unwrap();
    assert_eq!(body["body"], "");
}

#[tokio::test]
async fn test_request_headers_override_defaults() {
    let client = client_for(&spawn_server().await);
    let options = RequestOptions::new(Method::DELETE)
        .header("Accept", "text/plain")
        .header("X-Trace", "abc");
    let body = client.request("/echo", options).await.unwrap();

    assert_eq!(body["accept"], "text/plain");
    assert_eq!(body["x_trace"], "abc");
}

#[tokio::test]
async fn test_configure_switches_base_url() {
    let base_url = spawn_server().await;
    let mut client = client_for("http://127.0.0.1:9");

    client.configure(ApiConfigOverrides {
        base_url: Some(format!("{base_url}/")),
        ..ApiConfigOverrides::default()
    });
    let body = client.get("json").await.unwrap();
    assert_eq!(body["hello"], "world");
}

#[tokio::test]
async fn test_request_with_invalid_url_fails_before_sending() {
    let client = client_for("not a url");
    let err = client.get("/health").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidUrl { url } if url == "not a url/health"));
}
