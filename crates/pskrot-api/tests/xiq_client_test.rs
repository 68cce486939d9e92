#![allow(clippy::unwrap_used)]
// Integration tests for `XiqClient` using wiremock.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use url::Url;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pskrot_api::{ClientConfig, Credential, DeviceQuery, Error, PskChange, XiqClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, XiqClient) {
    let server = MockServer::start().await;
    let client = XiqClient::with_client(reqwest::Client::new(), Url::parse(&server.uri()).unwrap())
        .with_lro_delay(Duration::ZERO);
    (server, client)
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

fn device_page(page: u32, total_pages: u32, ids: &[i64]) -> serde_json::Value {
    let data: Vec<_> = ids
        .iter()
        .map(|id| json!({ "id": id, "hostname": format!("ap-{id}"), "config_mismatch": true }))
        .collect();
    json!({
        "page": page,
        "count": data.len(),
        "total_pages": total_pages,
        "total_count": 99,
        "data": data
    })
}

/// Records the message of every WARN event emitted while installed.
#[derive(Clone, Default)]
struct WarnRecorder(Arc<Mutex<Vec<String>>>);

impl WarnRecorder {
    fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for WarnRecorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::WARN {
            return;
        }
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.0.lock().unwrap().push(visitor.0);
    }
}

// ── Retry behaviour ─────────────────────────────────────────────────

#[tokio::test]
async fn test_retries_until_success() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream unavailable"))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_page(1, 1, &[1])))
        .mount(&server)
        .await;

    let recorder = WarnRecorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let devices = client.list_devices(&DeviceQuery::online()).await.unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(request_count(&server).await, 4);
    let failures = recorder
        .messages()
        .iter()
        .filter(|m| m.as_str() == "API call failed")
        .count();
    assert_eq!(failures, 3);
}

#[tokio::test]
async fn test_connection_refused_is_retried() {
    // Bind then drop a listener so the port is known to be closed.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let client = XiqClient::with_client(
        reqwest::Client::new(),
        Url::parse(&format!("http://{addr}/")).unwrap(),
    );

    let err = client.list_devices(&DeviceQuery::online()).await.unwrap_err();

    match err {
        Error::RetriesExhausted {
            attempts, ref last, ..
        } => {
            assert_eq!(attempts, 5);
            assert!(matches!(**last, Error::Transport(_)), "got: {last:?}");
        }
        other => panic!("expected RetriesExhausted, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_retries_exhausted_after_five_attempts() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error_code": "SERVICE_UNAVAILABLE",
            "error_message": "try again later"
        })))
        .mount(&server)
        .await;

    let result = client.list_devices(&DeviceQuery::mismatched()).await;

    match result {
        Err(Error::RetriesExhausted {
            ref operation,
            attempts,
            ref last,
        }) => {
            assert_eq!(operation, "collect mismatched devices");
            assert_eq!(attempts, 5);
            assert!(
                matches!(**last, Error::HttpStatus { status: 503, .. }),
                "expected HttpStatus 503, got: {last:?}"
            );
        }
        other => panic!("expected RetriesExhausted, got: {other:?}"),
    }
    assert_eq!(request_count(&server).await, 5);
}

#[tokio::test]
async fn test_malformed_body_is_retried() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client.list_devices(&DeviceQuery::online()).await.unwrap_err();

    match err {
        Error::RetriesExhausted { ref last, .. } => {
            assert!(matches!(**last, Error::Decode { .. }), "got: {last:?}");
        }
        other => panic!("expected RetriesExhausted, got: {other:?}"),
    }
    assert_eq!(request_count(&server).await, 5);
}

#[tokio::test]
async fn test_error_object_in_200_is_failure() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "error_id": "a1b2", "error_message": "location not found" }
        })))
        .mount(&server)
        .await;

    let err = client.list_devices(&DeviceQuery::online()).await.unwrap_err();

    match err {
        Error::Api {
            ref code,
            ref message,
            ..
        } => {
            assert_eq!(code.as_deref(), Some("a1b2"));
            assert_eq!(message, "location not found");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
    assert!(err.is_api_call_failed());
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_error_object_without_message_is_failure() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "error_id": "E42", "error_code": "SSID_LOCKED" },
            "total_pages": 1,
            "data": []
        })))
        .mount(&server)
        .await;

    let err = client.list_devices(&DeviceQuery::online()).await.unwrap_err();

    match err {
        Error::Api {
            ref code,
            ref message,
            ..
        } => {
            assert_eq!(code.as_deref(), Some("E42"));
            assert_eq!(message, "unknown error");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
    assert_eq!(request_count(&server).await, 1);
}

// ── Pagination ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_pagination_walks_every_page_in_order() {
    let (server, client) = setup().await;

    // Later pages report a different page count; only the first is trusted.
    for (page, total_pages, ids) in [(1, 3, vec![1, 2]), (2, 7, vec![3, 4]), (3, 7, vec![5])] {
        Mock::given(method("GET"))
            .and(path("/devices"))
            .and(query_param("page", page.to_string()))
            .and(query_param("limit", "2"))
            .and(query_param("views", "FULL"))
            .and(query_param("connected", "true"))
            .and(query_param("configMismatch", "true"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(device_page(page, total_pages, &ids)),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let devices = client
        .list_mismatched_devices(2, None, Duration::ZERO)
        .await
        .unwrap();

    let ids: Vec<i64> = devices.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    assert_eq!(devices[4].hostname, "ap-5");
}

#[tokio::test]
async fn test_location_filter_is_forwarded() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .and(query_param("locationId", "4242"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_page(1, 1, &[9])))
        .expect(1)
        .mount(&server)
        .await;

    let devices = client.list_online_devices(100, Some(4242)).await.unwrap();
    assert_eq!(devices.len(), 1);
}

// ── PSK change ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_change_psk_success() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/ssids/1234/psk/password"))
        .and(body_string("correct-horse-battery"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let change = client
        .change_psk("1234", "correct-horse-battery")
        .await
        .unwrap();
    assert_eq!(change, PskChange::Changed);
}

#[tokio::test]
async fn test_change_psk_failure_is_a_value() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/ssids/1234/psk/password"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let change = client.change_psk("1234", "next-key").await.unwrap();

    match change {
        PskChange::Failed { reason } => assert!(reason.contains("change psk"), "reason: {reason}"),
        PskChange::Changed => panic!("expected failure"),
    }
    assert_eq!(request_count(&server).await, 5);
}

// ── Configuration push ──────────────────────────────────────────────

#[tokio::test]
async fn test_push_config_checks_operation_once() {
    let (server, client) = setup().await;
    let location = format!("{}/operations/lro-77", server.uri());

    Mock::given(method("POST"))
        .and(path("/deployments"))
        .and(query_param("async", "true"))
        .and(body_json(json!({
            "devices": { "ids": [11, 12] },
            "policy": {
                "enable_complete_configuration_update": false,
                "firmware_upgrade_policy": {
                    "enable_enforce_upgrade": false,
                    "enable_distributed_upgrade": false
                },
                "firmware_activate_option": {
                    "enable_activate_at_next_reboot": false,
                    "activation_delay_seconds": 0,
                    "activation_time": 0
                }
            }
        })))
        .respond_with(ResponseTemplate::new(202).insert_header("Location", location.as_str()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/operations/lro-77"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": { "status": "PENDING", "done": false }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let status = client.push_config(&[11, 12]).await.unwrap();
    assert_eq!(status, "PENDING");
}

#[tokio::test]
async fn test_push_config_without_location() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/deployments"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let err = client.push_config(&[1]).await.unwrap_err();
    assert!(matches!(err, Error::MissingLocation { .. }), "got: {err:?}");
}

#[tokio::test]
async fn test_rejected_post_is_not_retried() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/deployments"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_code": "INVALID_ARGUMENT",
            "error_message": "device 1 is not managed"
        })))
        .mount(&server)
        .await;

    let err = client.push_config(&[1]).await.unwrap_err();

    match err {
        Error::Aborted { ref source, .. } => {
            assert!(
                matches!(**source, Error::Rejected { status: 400, .. }),
                "got: {source:?}"
            );
        }
        other => panic!("expected Aborted, got: {other:?}"),
    }
    assert_eq!(request_count(&server).await, 1);
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_with_login_installs_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({ "username": "ops@example.com", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-123",
            "token_type": "Bearer",
            "expires_in": 86400
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .and(header("Authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_page(1, 1, &[5])))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(Url::parse(&server.uri()).unwrap());
    let credential = Credential::Login {
        username: "ops@example.com".into(),
        password: "hunter2".to_string().into(),
    };

    let client = XiqClient::connect(&config, &credential).await.unwrap();
    let devices = client.list_devices(&DeviceQuery::online()).await.unwrap();
    assert_eq!(devices[0].id, 5);
}

#[tokio::test]
async fn test_connect_with_token_skips_login() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .and(header("Authorization", "Bearer static-token"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_page(1, 1, &[])))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(Url::parse(&server.uri()).unwrap());
    let credential = Credential::Token("static-token".to_string().into());

    let client = XiqClient::connect(&config, &credential).await.unwrap();
    let devices = client.list_devices(&DeviceQuery::online()).await.unwrap();
    assert!(devices.is_empty());
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_login_without_access_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token_type": "Bearer" })))
        .mount(&server)
        .await;

    let config = ClientConfig::new(Url::parse(&server.uri()).unwrap());
    let credential = Credential::Login {
        username: "ops@example.com".into(),
        password: "wrong".to_string().into(),
    };

    let result = XiqClient::connect(&config, &credential).await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error"
    );
}
