//! Assistant conversation webhook adapter

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::error::{AppError, AppResult, ErrorCode};
use std::time::Duration;

use super::{ConversationRequest, ConversationWebhook};

/// Shown when the workflow answers without any reply text
pub const FALLBACK_REPLY: &str = "Resposta processada.";

const REPLY_FIELDS: &[&str] = &["reply", "output", "message", "text", "content"];

/// Webhook responses occasionally embed raw control characters inside
/// string literals; those are swapped for spaces before a second parse.
fn sanitize_control_chars(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '\u{0000}'..='\u{001F}' | '\u{007F}'..='\u{009F}' => ' ',
            other => other,
        })
        .collect()
}

/// Parse a webhook body: JSON, then sanitized JSON, then plain text
pub fn parse_webhook_response(body: &str) -> Value {
    if let Ok(value) = serde_json::from_str(body) {
        return value;
    }
    if let Ok(value) = serde_json::from_str(&sanitize_control_chars(body)) {
        return value;
    }
    Value::String(body.to_string())
}

/// Pick the reply text out of a parsed webhook body
pub fn reply_text(value: &Value) -> String {
    let value = match value {
        Value::Array(items) => match items.first() {
            Some(first) => first,
            None => return FALLBACK_REPLY.to_string(),
        },
        other => other,
    };

    match value {
        Value::String(s) if !s.trim().is_empty() => s.clone(),
        Value::Object(map) => REPLY_FIELDS
            .iter()
            .filter_map(|key| map.get(*key))
            .filter_map(Value::as_str)
            .find(|s| !s.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| FALLBACK_REPLY.to_string()),
        _ => FALLBACK_REPLY.to_string(),
    }
}

/// HTTP adapter for the conversation workflow
pub struct HttpConversationWebhook {
    client: Client,
    url: String,
}

impl HttpConversationWebhook {
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
impl ConversationWebhook for HttpConversationWebhook {
    async fn send(&self, request: &ConversationRequest) -> AppResult<String> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::new(ErrorCode::WebhookTimeout)
                } else {
                    AppError::webhook(format!("Conversation webhook request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                AppError::new(ErrorCode::WebhookTimeout)
            } else {
                AppError::webhook(format!("Conversation webhook read failed: {e}"))
            }
        })?;

        if !status.is_success() {
            return Err(AppError::webhook(format!(
                "Conversation webhook returned {}: {body}",
                status.as_u16()
            ))
            .with_detail("status", status.as_u16()));
        }

        Ok(reply_text(&parse_webhook_response(&body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_plain_json() {
        let v = parse_webhook_response(r#"{"reply":"Olá!"}"#);
        assert_eq!(reply_text(&v), "Olá!");
    }

    #[test]
    fn test_parse_with_control_chars() {
        let body = "{\"output\":\"linha 1\nlinha 2\"}";
        assert!(serde_json::from_str::<Value>(body).is_err());
        let v = parse_webhook_response(body);
        assert_eq!(reply_text(&v), "linha 1 linha 2");
    }

    #[test]
    fn test_parse_plain_text() {
        let v = parse_webhook_response("Bom dia, tudo certo");
        assert_eq!(reply_text(&v), "Bom dia, tudo certo");
    }

    #[test]
    fn test_reply_field_order() {
        let v = json!({"text": "t", "message": "m", "output": ""});
        assert_eq!(reply_text(&v), "m");
        let v = json!([{"content": "first"}, {"reply": "second"}]);
        assert_eq!(reply_text(&v), "first");
    }

    #[test]
    fn test_fallback_reply() {
        assert_eq!(reply_text(&json!({"ok": true})), FALLBACK_REPLY);
        assert_eq!(reply_text(&json!([])), FALLBACK_REPLY);
        assert_eq!(reply_text(&json!(42)), FALLBACK_REPLY);
        assert_eq!(reply_text(&parse_webhook_response("")), FALLBACK_REPLY);
    }
}
