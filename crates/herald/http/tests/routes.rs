//! Router tests with in-process fakes.

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use herald_core::{BroadcastRecord, BroadcastSummary, Platform, Registration};
use herald_service::{BroadcastRequest, Broadcaster, Registrar};
use tower::ServiceExt as _;

#[derive(Clone, Default)]
struct FakeRegistrar {
    registered: Arc<Mutex<Vec<Registration>>>,
    unregistered: Arc<Mutex<Vec<(String, String)>>>,
    fail: bool,
}

impl Registrar for FakeRegistrar {
    async fn register(&self, registration: &Registration) -> color_eyre::eyre::Result<()> {
        if self.fail {
            color_eyre::eyre::bail!("database is locked");
        }
        self.registered.lock().unwrap().push(registration.clone());
        Ok(())
    }

    async fn unregister(&self, token: &str, user_id: &str) -> color_eyre::eyre::Result<()> {
        self.unregistered
            .lock()
            .unwrap()
            .push((token.to_string(), user_id.to_string()));
        Ok(())
    }
}

#[derive(Clone, Default)]
struct FakeBroadcaster {
    requests: Arc<Mutex<Vec<BroadcastRequest>>>,
}

const SUMMARY: BroadcastSummary = BroadcastSummary {
    total_tokens: 3,
    success_count: 2,
    failure_count: 1,
};

impl Broadcaster for FakeBroadcaster {
    async fn send_broadcast(
        &self,
        request: &BroadcastRequest,
    ) -> color_eyre::eyre::Result<BroadcastSummary> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(SUMMARY)
    }

    async fn recent_broadcasts(
        &self,
        limit: usize,
    ) -> color_eyre::eyre::Result<Vec<BroadcastRecord>> {
        let record = BroadcastRecord {
            id: 1,
            title: "New release".into(),
            body: "Watch it now".into(),
            data: "{}".into(),
            platform: None,
            summary: SUMMARY,
            sent_by: Some("admin".into()),
            created_at: chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };
        Ok(std::iter::repeat_n(record, limit.min(2)).collect())
    }
}

fn json_request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
}

async fn call(
    router: axum::Router,
    request: Request<Body>,
) -> (StatusCode, serde_json::Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn with_body(builder: axum::http::request::Builder, body: serde_json::Value) -> Request<Body> {
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_register_requires_caller() {
    let registrar = FakeRegistrar::default();
    let router = herald_http::registration_router(registrar.clone());
    let body = serde_json::json!({"device_token": "tok", "platform": "android"});

    let (status, json) = call(
        router,
        with_body(json_request("POST", "/api/push/register"), body),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json, serde_json::json!({"error": "Unauthorized"}));
    assert!(registrar.registered.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_register() {
    let registrar = FakeRegistrar::default();
    let router = herald_http::registration_router(registrar.clone());
    let body = serde_json::json!({
        "device_token": "fcm-token-1",
        "platform": "ios",
        "device_info": {"platform": "ios", "userAgent": "Capacitor", "language": "en", "timezone": "UTC"},
        "app_version": "2.3.0"
    });

    let request = with_body(
        json_request("POST", "/api/push/register").header("x-user-id", "user-42"),
        body,
    );
    let (status, json) = call(router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        serde_json::json!({"success": true, "message": "Device token registered"})
    );

    let registered = registrar.registered.lock().unwrap();
    assert_eq!(registered.len(), 1);
    assert_eq!(registered[0].token, "fcm-token-1");
    assert_eq!(registered[0].platform, Platform::Ios);
    assert_eq!(registered[0].user_id.as_deref(), Some("user-42"));
    assert_eq!(registered[0].app_version.as_deref(), Some("2.3.0"));
}

#[tokio::test]
async fn test_register_validation() {
    let router = herald_http::registration_router(FakeRegistrar::default());

    let body = serde_json::json!({"device_token": "tok"});
    let request = with_body(
        json_request("POST", "/api/push/register").header("x-user-id", "u"),
        body,
    );
    let (status, json) = call(router.clone(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "device_token and platform are required");

    let body = serde_json::json!({"device_token": "tok", "platform": "blackberry"});
    let request = with_body(
        json_request("POST", "/api/push/register").header("x-user-id", "u"),
        body,
    );
    let (status, json) = call(router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "unknown platform: blackberry");
}

#[tokio::test]
async fn test_register_storage_failure_is_generic() {
    let registrar = FakeRegistrar {
        fail: true,
        ..Default::default()
    };
    let router = herald_http::registration_router(registrar);
    let body = serde_json::json!({"device_token": "tok", "platform": "web"});
    let request = with_body(
        json_request("POST", "/api/push/register").header("x-user-id", "u"),
        body,
    );

    let (status, json) = call(router, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Failed to register device token");
}

#[tokio::test]
async fn test_unregister() {
    let registrar = FakeRegistrar::default();
    let router = herald_http::registration_router(registrar.clone());
    let body = serde_json::json!({"device_token": "tok"});
    let request = with_body(
        json_request("DELETE", "/api/push/register").header("x-user-id", "owner"),
        body,
    );

    let (status, json) = call(router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Device token unregistered");
    assert_eq!(
        *registrar.unregistered.lock().unwrap(),
        vec![("tok".to_string(), "owner".to_string())]
    );
}

fn admin(broadcaster: FakeBroadcaster) -> axum::Router {
    herald_http::admin_router(broadcaster, Some("s3cret".into()))
}

#[tokio::test]
async fn test_admin_requires_token() {
    let body = serde_json::json!({"title": "t", "body": "b"});

    let (status, _) = call(
        admin(FakeBroadcaster::default()),
        with_body(json_request("POST", "/api/admin/push/send"), body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        admin(FakeBroadcaster::default()),
        with_body(
            json_request("POST", "/api/admin/push/send")
                .header("authorization", "Bearer wrong"),
            body.clone(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // No configured token locks the admin routes.
    let unconfigured = herald_http::admin_router(FakeBroadcaster::default(), None);
    let (status, _) = call(
        unconfigured,
        with_body(
            json_request("POST", "/api/admin/push/send")
                .header("authorization", "Bearer "),
            body,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_send() {
    let broadcaster = FakeBroadcaster::default();
    let body = serde_json::json!({
        "title": "New release",
        "body": "Watch it now",
        "data": {"movie_id": 42, "url": "/movies/42"},
        "platform": "android",
        "limit": 500
    });
    let request = with_body(
        json_request("POST", "/api/admin/push/send")
            .header("authorization", "Bearer s3cret")
            .header("x-user-id", "admin-1"),
        body,
    );

    let (status, json) = call(admin(broadcaster.clone()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        serde_json::json!({
            "success": true,
            "message": "Push notification sent",
            "results": {"totalTokens": 3, "successCount": 2, "failureCount": 1}
        })
    );

    let requests = broadcaster.requests.lock().unwrap();
    let sent = &requests[0];
    assert_eq!(sent.filter.platform, Some(Platform::Android));
    assert_eq!(sent.filter.limit, Some(500));
    assert_eq!(sent.sent_by.as_deref(), Some("admin-1"));
    assert_eq!(sent.payload.data()["movie_id"], "42");
    assert_eq!(sent.payload.data()["url"], "/movies/42");
}

#[tokio::test]
async fn test_admin_send_validation() {
    let body = serde_json::json!({"title": "", "body": "b"});
    let request = with_body(
        json_request("POST", "/api/admin/push/send")
            .header("authorization", "Bearer s3cret"),
        body,
    );

    let (status, json) = call(admin(FakeBroadcaster::default()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, serde_json::json!({"error": "title and body are required"}));

    let body = serde_json::json!({"title": "x".repeat(257), "body": "b"});
    let request = with_body(
        json_request("POST", "/api/admin/push/send")
            .header("authorization", "Bearer s3cret"),
        body,
    );
    let (status, json) = call(admin(FakeBroadcaster::default()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "title must be at most 256 characters");
}

#[tokio::test]
async fn test_admin_send_rejects_reserved_data_keys() {
    let broadcaster = FakeBroadcaster::default();
    let body = serde_json::json!({
        "title": "New release",
        "body": "Watch it now",
        "data": {"url": "/movies/42", "google.sent_time": 1}
    });
    let request = with_body(
        json_request("POST", "/api/admin/push/send").header("authorization", "Bearer s3cret"),
        body,
    );

    let (status, json) = call(admin(broadcaster.clone()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "data key \"google.sent_time\" is reserved");
    assert!(broadcaster.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_log() {
    let request = Request::builder()
        .uri("/api/admin/push/log?limit=5")
        .header("authorization", "Bearer s3cret")
        .body(Body::empty())
        .unwrap();

    let (status, json) = call(admin(FakeBroadcaster::default()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["broadcasts"].as_array().unwrap().len(), 2);
    assert_eq!(json["broadcasts"][0]["summary"]["totalTokens"], 3);
    assert_eq!(json["broadcasts"][0]["sentBy"], "admin");
}
