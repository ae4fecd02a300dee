//! REST persistence adapter
//!
//! Talks to a PostgREST-style endpoint. Every table is keyed by `user_id`;
//! reads return arrays and the first row wins.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::error::{AppError, AppResult};
use shared::models::{
    ChatMessage, ConfigPatch, InteractionLog, SubscriptionRecord, TenantConfig, TrialOverride,
};
use std::time::Duration;

use super::ConfigStore;

const CONFIG_TABLE: &str = "gym_configs";
const SUBSCRIPTION_TABLE: &str = "subscriptions";
const TRIAL_TABLE: &str = "user_trial_settings";
const LOG_TABLE: &str = "interaction_logs";
const CHAT_TABLE: &str = "chat_messages";
const CHAT_COLUMNS: &str = "conversation_id,role,content,created_at";

pub struct RestConfigStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestConfigStore {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn execute(&self, table: &str, request: RequestBuilder) -> AppResult<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| {
                AppError::persistence(format!("{table} request failed: {e}"))
                    .with_detail("table", table)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(
                AppError::persistence(format!("{table} returned {}: {body}", status.as_u16()))
                    .with_detail("table", table)
                    .with_detail("status", status.as_u16()),
            );
        }
        Ok(response)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> AppResult<Vec<T>> {
        let request = self.client.get(self.table_url(table)).query(query);
        self.execute(table, request)
            .await?
            .json()
            .await
            .map_err(|e| {
                AppError::persistence(format!("{table} returned unreadable rows: {e}"))
                    .with_detail("table", table)
            })
    }

    async fn first_row<T: DeserializeOwned>(
        &self,
        table: &str,
        tenant_id: &str,
    ) -> AppResult<Option<T>> {
        let rows = self
            .select(
                table,
                &[
                    ("user_id", format!("eq.{tenant_id}")),
                    ("select", "*".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert<T: Serialize>(&self, table: &str, tenant_id: &str, row: &T) -> AppResult<()> {
        let body = stamped_row(row, tenant_id)?;
        let request = self
            .client
            .post(self.table_url(table))
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&body);
        self.execute(table, request).await.map(|_| ())
    }

    fn tenant_filter(tenant_id: &str) -> [(&'static str, String); 1] {
        [("user_id", format!("eq.{tenant_id}"))]
    }
}

/// Row body with `user_id` merged in
fn owned_row<T: Serialize>(row: &T, tenant_id: &str) -> AppResult<Value> {
    let mut body = serde_json::to_value(row)
        .map_err(|e| AppError::internal(format!("Failed to encode row: {e}")))?;
    let Some(fields) = body.as_object_mut() else {
        return Err(AppError::internal("Row must encode as an object"));
    };
    fields.insert("user_id".into(), Value::from(tenant_id));
    Ok(body)
}

/// Row body with `user_id` and `updated_at` merged in
fn stamped_row<T: Serialize>(row: &T, tenant_id: &str) -> AppResult<Value> {
    let mut body = owned_row(row, tenant_id)?;
    if let Some(fields) = body.as_object_mut() {
        fields.insert("updated_at".into(), Value::from(Utc::now().to_rfc3339()));
    }
    Ok(body)
}

#[async_trait]
impl ConfigStore for RestConfigStore {
    async fn get_config(&self, tenant_id: &str) -> AppResult<Option<TenantConfig>> {
        self.first_row(CONFIG_TABLE, tenant_id).await
    }

    async fn upsert_config(&self, tenant_id: &str, config: &TenantConfig) -> AppResult<()> {
        let clean = config.clone().without_credentials();
        self.upsert(CONFIG_TABLE, tenant_id, &clean).await
    }

    async fn patch_config(&self, tenant_id: &str, patch: &ConfigPatch) -> AppResult<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let request = self
            .client
            .patch(self.table_url(CONFIG_TABLE))
            .query(&Self::tenant_filter(tenant_id))
            .json(patch);
        self.execute(CONFIG_TABLE, request).await.map(|_| ())
    }

    async fn get_subscription(&self, tenant_id: &str) -> AppResult<Option<SubscriptionRecord>> {
        self.first_row(SUBSCRIPTION_TABLE, tenant_id).await
    }

    async fn upsert_subscription(
        &self,
        tenant_id: &str,
        record: &SubscriptionRecord,
    ) -> AppResult<()> {
        self.upsert(SUBSCRIPTION_TABLE, tenant_id, record).await
    }

    async fn get_trial_override(&self, tenant_id: &str) -> AppResult<Option<TrialOverride>> {
        self.first_row(TRIAL_TABLE, tenant_id).await
    }

    async fn recent_interaction_logs(
        &self,
        tenant_id: &str,
        limit: usize,
    ) -> AppResult<Vec<InteractionLog>> {
        self.select(
            LOG_TABLE,
            &[
                ("user_id", format!("eq.{tenant_id}")),
                ("select", "*".to_string()),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn append_chat_message(&self, tenant_id: &str, message: &ChatMessage) -> AppResult<()> {
        let body = owned_row(message, tenant_id)?;
        let request = self.client.post(self.table_url(CHAT_TABLE)).json(&body);
        self.execute(CHAT_TABLE, request).await.map(|_| ())
    }

    async fn recent_chat_messages(
        &self,
        tenant_id: &str,
        limit: usize,
    ) -> AppResult<Vec<ChatMessage>> {
        self.select(
            CHAT_TABLE,
            &[
                ("user_id", format!("eq.{tenant_id}")),
                ("select", CHAT_COLUMNS.to_string()),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn clear_chat_messages(&self, tenant_id: &str) -> AppResult<()> {
        let request = self
            .client
            .delete(self.table_url(CHAT_TABLE))
            .query(&Self::tenant_filter(tenant_id));
        self.execute(CHAT_TABLE, request).await.map(|_| ())
    }
}
