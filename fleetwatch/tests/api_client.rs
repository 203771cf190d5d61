//! HTTP client against small local routers and the demo fleet.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use fleetwatch::api::{ApiClient, ApiError};
use fleetwatch::types::CommandAction;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn fetch_status_parses_document() {
    let app = Router::new().route(
        "/api/status",
        get(|| async {
            (
                [("content-type", "application/json")],
                r#"{"serverTime":42,"clients":[{"clientId":"a","online":false}]}"#,
            )
        }),
    );
    let api = ApiClient::new(&serve(app).await, None).unwrap();
    let doc = api.fetch_status().await.expect("status");
    assert_eq!(doc.server_time, Some(42));
    assert_eq!(doc.clients.len(), 1);
    assert!(!doc.clients[0].is_online());
}

#[tokio::test]
async fn fetch_status_non_success_is_an_error() {
    let app = Router::new().route("/api/status", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
    let api = ApiClient::new(&serve(app).await, None).unwrap();
    match api.fetch_status().await {
        Err(ApiError::UnexpectedStatus(s)) => assert_eq!(s.as_u16(), 503),
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn send_command_passes_client_and_action() {
    let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::default();
    let app = Router::new()
        .route(
            "/api/command",
            post(
                |State(seen): State<Arc<Mutex<Vec<(String, String)>>>>,
                 Query(q): Query<HashMap<String, String>>| async move {
                    let id = q.get("clientId").cloned().unwrap_or_default();
                    let action = q.get("action").cloned().unwrap_or_default();
                    let ok = action == "request_monitoring";
                    seen.lock().unwrap().push((id, action));
                    if ok { StatusCode::ACCEPTED } else { StatusCode::NOT_FOUND }
                },
            ),
        )
        .with_state(seen.clone());
    let api = ApiClient::new(&serve(app).await, None).unwrap();

    api.send_command("pc 1", CommandAction::RequestMonitoring)
        .await
        .expect("accepted");
    let err = api.send_command("pc 1", CommandAction::RequestScreenshot).await;
    assert!(matches!(err, Err(ApiError::UnexpectedStatus(_))));

    let seen = seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            ("pc 1".to_string(), "request_monitoring".to_string()),
            ("pc 1".to_string(), "request_screenshot".to_string()),
        ]
    );
}

#[tokio::test]
async fn screenshot_not_found_means_not_ready() {
    let app = Router::new().route("/api/screenshot", get(|| async { StatusCode::NOT_FOUND }));
    let api = ApiClient::new(&serve(app).await, None).unwrap();
    assert!(api.fetch_screenshot("a").await.unwrap().is_none());
}

#[tokio::test]
async fn screenshot_bytes_are_returned() {
    let app = Router::new().route(
        "/api/screenshot",
        get(|Query(q): Query<HashMap<String, String>>| async move {
            if q.contains_key("ts") && q.get("clientId").map(String::as_str) == Some("a") {
                (StatusCode::OK, vec![1u8, 2, 3])
            } else {
                (StatusCode::BAD_REQUEST, Vec::new())
            }
        }),
    );
    let api = ApiClient::new(&serve(app).await, None).unwrap();
    let bytes = api.fetch_screenshot("a").await.unwrap().expect("payload");
    assert_eq!(bytes.as_ref(), &[1, 2, 3]);
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    // bind then drop to get a port nobody listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let api = ApiClient::new(&format!("http://{addr}"), None).unwrap();
    assert!(matches!(api.fetch_status().await, Err(ApiError::Http(_))));
}

#[tokio::test]
async fn silent_server_times_out() {
    // accepts connections and never writes a byte
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((sock, _)) = listener.accept().await {
            held.push(sock);
        }
    });

    let api =
        ApiClient::with_timeout(&format!("http://{addr}"), None, Duration::from_millis(300)).unwrap();
    let res = tokio::time::timeout(Duration::from_secs(10), api.fetch_status())
        .await
        .expect("fetch_status must resolve on its own");
    assert!(matches!(res, Err(ApiError::Http(_))), "got {res:?}");

    let shot = tokio::time::timeout(Duration::from_secs(10), api.fetch_screenshot("a"))
        .await
        .expect("fetch_screenshot must resolve on its own");
    assert!(shot.is_err());
}

#[test]
fn invalid_url_and_missing_ca_are_rejected() {
    assert!(matches!(ApiClient::new("not a url", None), Err(ApiError::InvalidUrl { .. })));
    let missing = std::path::Path::new("/definitely/not/here.pem");
    assert!(matches!(
        ApiClient::new("https://example.com", Some(missing)),
        Err(ApiError::CertificateRead { .. })
    ));
}

#[tokio::test]
async fn demo_fleet_serves_the_status_api() {
    let (addr, server) = fleetwatch::demo::spawn(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .expect("demo");
    let api = ApiClient::new(&format!("http://{addr}"), None).unwrap();

    let doc = api.fetch_status().await.expect("status");
    assert_eq!(doc.clients.len(), 5);
    assert!(doc.server_time.is_some());

    let first = doc.clients[0].id().to_string();
    // screenshots need approval first
    assert!(api.send_command(&first, CommandAction::RequestScreenshot).await.is_err());
    api.send_command(&first, CommandAction::RequestMonitoring).await.expect("monitoring");
    let doc = api.fetch_status().await.expect("status");
    let c = doc.clients.iter().find(|c| c.id() == first).unwrap();
    assert!(c.is_pending());
    assert!(api.fetch_screenshot(&first).await.unwrap().is_none());
    server.abort();
}
