//! Messaging gateway adapter
//!
//! The gateway is a workflow webhook that fronts the WhatsApp instance
//! manager. Its responses come in several shapes, so the pairing artifact
//! and the connected signal are read through ordered extractors.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use shared::error::{AppError, AppResult};
use std::time::Duration;

use super::{GatewayAction, MessagingGateway};

/// Paths tried in order for the pairing QR
const QR_PATHS: &[&[&str]] = &[
    &["base64"],
    &["qrCodeBase64"],
    &["qrcode"],
    &["qr"],
    &["data", "base64"],
    &["data", "qrcode", "base64"],
    &["body", "base64"],
    &["response", "base64"],
];

/// Paths that may carry the session state
const STATUS_PATHS: &[&[&str]] = &[&["status"], &["state"], &["instance", "state"]];

const DATA_URI_PREFIX: &str = "data:image";
const PNG_BASE64_PREFIX: &str = "data:image/png;base64,";

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(key))
}

/// Raw base64 becomes a PNG data URI; data URIs pass through
pub fn normalize_qr(raw: &str) -> String {
    if raw.starts_with(DATA_URI_PREFIX) {
        raw.to_string()
    } else {
        format!("{PNG_BASE64_PREFIX}{raw}")
    }
}

/// First non-empty QR string found in a gateway response
pub fn extract_pairing_artifact(response: &Value) -> Option<String> {
    QR_PATHS.iter().find_map(|path| {
        lookup(response, path)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(normalize_qr)
    })
}

/// Whether the response reports an open session (`open` or `connected`)
pub fn is_connected_response(response: &Value) -> bool {
    STATUS_PATHS.iter().any(|path| {
        lookup(response, path)
            .and_then(Value::as_str)
            .is_some_and(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "open" | "connected"))
    })
}

/// Gateway instance name: local part of the email, lowercase alphanumerics
pub fn instance_name_from_email(email: &str) -> String {
    email
        .split('@')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GatewayRequest<'a> {
    action: GatewayAction,
    instance_name: &'a str,
}

/// HTTP adapter posting `{action, instanceName}` to the gateway webhook
pub struct HttpGateway {
    client: Client,
    url: String,
}

impl HttpGateway {
    pub fn new(url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl MessagingGateway for HttpGateway {
    async fn call(&self, action: GatewayAction, instance: &str) -> AppResult<Value> {
        let response = self
            .client
            .post(&self.url)
            .json(&GatewayRequest {
                action,
                instance_name: instance,
            })
            .send()
            .await
            .map_err(|e| {
                AppError::gateway(format!("Gateway {action} request failed: {e}"))
                    .with_detail("action", action.as_str())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::gateway(format!("Gateway {action} read failed: {e}")))?;

        if !status.is_success() {
            return Err(AppError::gateway(format!(
                "Gateway {action} failed with status {status}: {body}"
            ))
            .with_detail("action", action.as_str()));
        }
        if body.trim().is_empty() {
            return Err(AppError::gateway(format!("Gateway {action} returned no body"))
                .with_detail("action", action.as_str()));
        }

        serde_json::from_str(&body).map_err(|e| {
            AppError::gateway(format!("Gateway {action} returned invalid JSON: {e}"))
                .with_detail("action", action.as_str())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extractor_order() {
        let resp = json!({"qr": "QQQ", "base64": "BBB"});
        assert_eq!(
            extract_pairing_artifact(&resp).as_deref(),
            Some("data:image/png;base64,BBB")
        );

        let resp = json!({"data": {"qrcode": {"base64": "data:image/jpeg;base64,XYZ"}}});
        assert_eq!(
            extract_pairing_artifact(&resp).as_deref(),
            Some("data:image/jpeg;base64,XYZ")
        );

        let resp = json!({"response": {"base64": "RRR"}});
        assert_eq!(
            extract_pairing_artifact(&resp).as_deref(),
            Some("data:image/png;base64,RRR")
        );
    }

    #[test]
    fn test_extractor_skips_empty_and_non_strings() {
        let resp = json!({"base64": "", "qrcode": {"code": "x"}, "body": {"base64": "BODY"}});
        assert_eq!(
            extract_pairing_artifact(&resp).as_deref(),
            Some("data:image/png;base64,BODY")
        );
        assert_eq!(extract_pairing_artifact(&json!({"status": "open"})), None);
        assert_eq!(extract_pairing_artifact(&json!([1, 2])), None);
    }

    #[test]
    fn test_connected_signal() {
        assert!(is_connected_response(&json!({"status": "open"})));
        assert!(is_connected_response(&json!({"status": "CONNECTED"})));
        assert!(is_connected_response(&json!({"instance": {"state": "open"}})));
        assert!(!is_connected_response(&json!({"status": "close"})));
        assert!(!is_connected_response(&json!({"status": 1})));
        assert!(!is_connected_response(&json!(null)));
    }

    #[test]
    fn test_instance_name() {
        assert_eq!(instance_name_from_email("Joao.Silva+gym@mail.com"), "joaosilvagym");
        assert_eq!(instance_name_from_email("academia_01@x.io"), "academia01");
        assert_eq!(instance_name_from_email(""), "");
    }

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(GatewayRequest {
            action: GatewayAction::Status,
            instance_name: "gym",
        })
        .unwrap();
        assert_eq!(body, json!({"action": "status", "instanceName": "gym"}));
    }
}
