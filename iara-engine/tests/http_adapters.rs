//! HTTP adapters against a local axum stub

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use iara_engine::pricing::{CheckoutKind, CheckoutOrder, OrderDetails};
use iara_engine::services::gateway::{extract_pairing_artifact, is_connected_response};
use iara_engine::services::{
    CheckoutProvider, ConfigStore, ConversationRequest, ConversationWebhook, GatewayAction,
    HttpCheckoutProvider, HttpConversationWebhook, HttpGateway, MessagingGateway,
    RestConfigStore,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use shared::error::ErrorCode;
use shared::models::{ChatMessage, ChatRole, ConfigPatch, ConnectionState};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

const TIMEOUT: Duration = Duration::from_secs(5);

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ============================================================================
// Gateway
// ============================================================================

async fn gateway_hook(Json(body): Json<Value>) -> (StatusCode, String) {
    match body["action"].as_str() {
        Some("qr") => (
            StatusCode::OK,
            json!({ "base64": body["instanceName"] }).to_string(),
        ),
        Some("status") => (StatusCode::OK, r#"{"instance":{"state":"open"}}"#.to_string()),
        Some("logout") => (StatusCode::OK, String::new()),
        Some("restart") => (StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string()),
        _ => (StatusCode::OK, "{}".to_string()),
    }
}

#[tokio::test]
async fn test_http_gateway() {
    let base = serve(Router::new().route("/webhook/evolution", post(gateway_hook))).await;
    let gateway = HttpGateway::new(format!("{base}/webhook/evolution"), TIMEOUT).unwrap();

    let qr = gateway.call(GatewayAction::Qr, "academia").await.unwrap();
    assert_eq!(
        extract_pairing_artifact(&qr).as_deref(),
        Some("data:image/png;base64,academia")
    );

    let status = gateway.call(GatewayAction::Status, "academia").await.unwrap();
    assert!(is_connected_response(&status));

    let err = gateway.call(GatewayAction::Logout, "academia").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::GatewayUnavailable);

    let err = gateway.call(GatewayAction::Restart, "academia").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::GatewayUnavailable);
    assert!(err.message.contains("boom"));
}

// ============================================================================
// Conversation webhook
// ============================================================================

fn request(message: &str) -> ConversationRequest {
    ConversationRequest::user_message("tenant-1", "owner@gym.com", message, "conv-1", chrono::Utc::now())
}

#[tokio::test]
async fn test_http_conversation_webhook() {
    let app = Router::new()
        .route(
            "/raw",
            post(|| async { "{\"output\":\"Linha 1\nLinha 2\"}" }),
        )
        .route("/text", post(|| async { "Bom dia!" }))
        .route(
            "/echo",
            post(|Json(body): Json<Value>| async move {
                Json(json!([{ "reply": body["message"] }]))
            }),
        )
        .route(
            "/fail",
            post(|| async { (StatusCode::BAD_GATEWAY, "workflow error") }),
        )
        .route(
            "/slow",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "late"
            }),
        );
    let base = serve(app).await;

    let hook = |path: &str, timeout| {
        HttpConversationWebhook::new(format!("{base}{path}"), timeout).unwrap()
    };

    let reply = hook("/raw", TIMEOUT).send(&request("oi")).await.unwrap();
    assert_eq!(reply, "Linha 1 Linha 2");

    let reply = hook("/text", TIMEOUT).send(&request("oi")).await.unwrap();
    assert_eq!(reply, "Bom dia!");

    let reply = hook("/echo", TIMEOUT)
        .send(&request("quais\nplanos?"))
        .await
        .unwrap();
    assert_eq!(reply, "quais planos?");

    let err = hook("/fail", TIMEOUT).send(&request("oi")).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::WebhookFailed);
    assert!(err.message.contains("workflow error"));

    let err = hook("/slow", Duration::from_millis(200))
        .send(&request("oi"))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::WebhookTimeout);
}

// ============================================================================
// Checkout
// ============================================================================

fn order() -> CheckoutOrder {
    CheckoutOrder {
        user_id: "tenant-1".to_string(),
        email: "owner@gym.com".to_string(),
        total: Decimal::from(400),
        coupon_code: None,
        onboarding_discount: Decimal::ZERO,
        kind: CheckoutKind::New,
        details: OrderDetails::from_snapshot(&Default::default(), 0),
    }
}

#[tokio::test]
async fn test_http_checkout_provider() {
    let app = Router::new()
        .route(
            "/sales",
            post(|Json(body): Json<Value>| async move {
                format!("<div data-total=\"{}\">checkout</div>", body["valor_total"])
            }),
        )
        .route(
            "/sales-fail",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
    let base = serve(app).await;

    let provider = HttpCheckoutProvider::new(format!("{base}/sales"), TIMEOUT).unwrap();
    let markup = provider.submit(&order()).await.unwrap();
    assert_eq!(markup, "<div data-total=\"400.0\">checkout</div>");

    let provider = HttpCheckoutProvider::new(format!("{base}/sales-fail"), TIMEOUT).unwrap();
    let err = provider.submit(&order()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::CheckoutFailed);
}

// ============================================================================
// REST store
// ============================================================================

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    uri: String,
    apikey: Option<String>,
    authorization: Option<String>,
    prefer: Option<String>,
    body: Value,
}

type Log = Arc<Mutex<Vec<Recorded>>>;

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn record(log: &Log, method: Method, uri: &Uri, headers: &HeaderMap, body: Value) {
    log.lock().push(Recorded {
        method,
        uri: uri.to_string(),
        apikey: header(headers, "apikey"),
        authorization: header(headers, "authorization"),
        prefer: header(headers, "prefer"),
        body,
    });
}

async fn read_rows(
    State(log): State<Log>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    record(&log, method, &uri, &headers, Value::Null);
    match uri.path() {
        "/rest/v1/gym_configs" => (
            StatusCode::OK,
            Json(json!([{
                "user_id": "tenant-1",
                "omnichannel": true,
                "integrate_agenda": null,
                "branches": null,
                "email": "owner@gym.com",
                "password": "secret",
                "connection_status": "open",
                "gym_name": "Academia Forte"
            }])),
        ),
        "/rest/v1/subscriptions" => (StatusCode::OK, Json(json!([]))),
        "/rest/v1/chat_messages" => (
            StatusCode::OK,
            Json(json!([
                {"conversation_id": "c-9", "role": "assistant", "content": "Olá!", "created_at": "2026-03-02T12:01:00Z"},
                {"conversation_id": "c-9", "role": "user", "content": "Oi", "created_at": "2026-03-02T12:00:00Z"}
            ])),
        ),
        "/rest/v1/interaction_logs" => (
            StatusCode::OK,
            Json(json!([
                {"created_at": "2026-03-02T12:00:00Z", "question": "oi"},
                {"created_at": "2026-03-01T12:00:00Z", "question": "planos"}
            ])),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "relation does not exist"})),
        ),
    }
}

async fn write_rows(
    State(log): State<Log>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    record(&log, method, &uri, &headers, body);
    StatusCode::NO_CONTENT
}

async fn delete_rows(
    State(log): State<Log>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> StatusCode {
    record(&log, method, &uri, &headers, Value::Null);
    StatusCode::NO_CONTENT
}

#[tokio::test]
async fn test_rest_config_store() {
    let log: Log = Arc::default();
    let app = Router::new()
        .route(
            "/rest/v1/gym_configs",
            get(read_rows).post(write_rows).patch(write_rows),
        )
        .route("/rest/v1/subscriptions", get(read_rows).post(write_rows))
        .route("/rest/v1/user_trial_settings", get(read_rows))
        .route("/rest/v1/interaction_logs", get(read_rows))
        .route(
            "/rest/v1/chat_messages",
            get(read_rows).post(write_rows).delete(delete_rows),
        )
        .with_state(log.clone());
    let base = serve(app).await;
    let store = RestConfigStore::new(format!("{base}/"), "anon-key", TIMEOUT).unwrap();

    // reads
    let config = store.get_config("tenant-1").await.unwrap().unwrap();
    assert!(config.snapshot.omnichannel);
    assert!(!config.snapshot.calendar_integration);
    assert!(config.snapshot.branches.is_empty());
    assert_eq!(config.connection_status, ConnectionState::Connected);
    assert_eq!(config.other["gym_name"], "Academia Forte");

    let first = log.lock()[0].clone();
    assert_eq!(first.method, Method::GET);
    assert_eq!(first.uri, "/rest/v1/gym_configs?user_id=eq.tenant-1&select=*");
    assert_eq!(first.apikey.as_deref(), Some("anon-key"));
    assert_eq!(first.authorization.as_deref(), Some("Bearer anon-key"));

    assert!(store.get_subscription("tenant-1").await.unwrap().is_none());

    let err = store.get_trial_override("tenant-1").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::PersistenceFailed);

    let logs = store.recent_interaction_logs("tenant-1", 10).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].fields["question"], "oi");
    assert!(log.lock().last().unwrap().uri.contains("order=created_at.desc&limit=10"));

    // full upsert never carries credentials
    store.upsert_config("tenant-1", &config).await.unwrap();
    let upsert = log.lock().last().unwrap().clone();
    assert_eq!(upsert.method, Method::POST);
    assert!(upsert.uri.ends_with("?on_conflict=user_id"));
    assert_eq!(upsert.prefer.as_deref(), Some("resolution=merge-duplicates"));
    assert_eq!(upsert.body["user_id"], "tenant-1");
    assert_eq!(upsert.body["gym_name"], "Academia Forte");
    assert_eq!(upsert.body["connection_status"], "connected");
    assert!(upsert.body["updated_at"].is_string());
    assert!(upsert.body.get("email").is_none());
    assert!(upsert.body.get("password").is_none());

    // patches carry only their own fields
    store
        .patch_config("tenant-1", &ConfigPatch::paused_and_disconnected())
        .await
        .unwrap();
    let patch = log.lock().last().unwrap().clone();
    assert_eq!(patch.method, Method::PATCH);
    assert_eq!(patch.uri, "/rest/v1/gym_configs?user_id=eq.tenant-1");
    assert_eq!(
        patch.body,
        json!({"ai_active": false, "connection_status": "disconnected"})
    );

    let before = log.lock().len();
    store
        .patch_config("tenant-1", &ConfigPatch::default())
        .await
        .unwrap();
    assert_eq!(log.lock().len(), before);

    // chat history is inserted plainly and deleted per tenant
    let history = store.recent_chat_messages("tenant-1", 50).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, ChatRole::Assistant);
    assert_eq!(history[1].conversation_id, "c-9");
    let read = log.lock().last().unwrap().clone();
    assert!(read.uri.starts_with("/rest/v1/chat_messages?user_id=eq.tenant-1&select="));
    assert!(read.uri.ends_with("order=created_at.desc&limit=50"));

    let message = ChatMessage {
        conversation_id: "c-9".into(),
        role: ChatRole::User,
        content: "Linha 1\nLinha 2".into(),
        created_at: None,
    };
    store.append_chat_message("tenant-1", &message).await.unwrap();
    let insert = log.lock().last().unwrap().clone();
    assert_eq!(insert.method, Method::POST);
    assert_eq!(insert.uri, "/rest/v1/chat_messages");
    assert_eq!(insert.prefer, None);
    assert_eq!(
        insert.body,
        json!({"conversation_id": "c-9", "role": "user", "content": "Linha 1\nLinha 2", "user_id": "tenant-1"})
    );

    store.clear_chat_messages("tenant-1").await.unwrap();
    let delete = log.lock().last().unwrap().clone();
    assert_eq!(delete.method, Method::DELETE);
    assert_eq!(delete.uri, "/rest/v1/chat_messages?user_id=eq.tenant-1");
}
