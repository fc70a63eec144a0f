//! Client behavior against a local stub controller.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use broadcast_relay::{RelayClient, RelayError};

type Seen = Arc<Mutex<Option<(String, Value)>>>;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    address
}

fn client() -> RelayClient {
    RelayClient::new(Duration::from_secs(2))
}

#[tokio::test]
async fn start_carries_bearer_and_stream_details() {
    let seen: Seen = Arc::new(Mutex::new(None));
    let app = Router::new()
        .route(
            "/stream/start",
            post(
                |State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    *seen.lock().unwrap() = Some((auth, body));
                    Json(json!({"status": "ok"}))
                },
            ),
        )
        .with_state(Arc::clone(&seen));
    let address = serve(app).await;

    client()
        .start(&address, "s3cret", "rtmp://cdn/app", "key123")
        .await
        .unwrap();

    let (auth, body) = seen.lock().unwrap().clone().unwrap();
    assert_eq!(auth, "Bearer s3cret");
    assert_eq!(body["stream_url"], "rtmp://cdn/app");
    assert_eq!(body["stream_key"], "key123");
}

#[tokio::test]
async fn status_reports_streaming_flag() {
    let app = Router::new().route(
        "/stream/status",
        get(|| async { Json(json!({"streaming": true})) }),
    );
    let address = serve(app).await;

    let status = client().status(&address, "pw").await.unwrap();
    assert!(status.streaming);
}

#[tokio::test]
async fn refusal_maps_to_refused() {
    let app = Router::new().route("/stream/stop", post(|| async { StatusCode::FORBIDDEN }));
    let address = serve(app).await;

    match client().stop(&address, "bad").await {
        Err(RelayError::Refused { status, .. }) => assert_eq!(status, 403),
        other => panic!("expected Refused, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_relay_maps_to_unreachable() {
    match client().status("127.0.0.1:9", "pw").await {
        Err(RelayError::Unreachable { .. }) => {}
        other => panic!("expected Unreachable, got {other:?}"),
    }
}

#[tokio::test]
async fn unreadable_status_body_maps_to_bad_reply() {
    let app = Router::new().route("/stream/status", get(|| async { "not json" }));
    let address = serve(app).await;

    match client().status(&address, "pw").await {
        Err(RelayError::BadReply { .. }) => {}
        other => panic!("expected BadReply, got {other:?}"),
    }
}
