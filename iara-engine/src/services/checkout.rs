//! Checkout provider adapter

use async_trait::async_trait;
use reqwest::Client;
use shared::error::{AppError, AppResult};
use std::time::Duration;

use super::CheckoutProvider;
use crate::pricing::CheckoutOrder;

/// Posts orders to the sales workflow, which answers with checkout markup
pub struct HttpCheckoutProvider {
    client: Client,
    url: String,
}

impl HttpCheckoutProvider {
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
impl CheckoutProvider for HttpCheckoutProvider {
    async fn submit(&self, order: &CheckoutOrder) -> AppResult<String> {
        let response = self
            .client
            .post(&self.url)
            .json(order)
            .send()
            .await
            .map_err(|e| AppError::checkout(format!("Checkout request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::checkout(format!(
                "Checkout returned status {}",
                status.as_u16()
            ))
            .with_detail("status", status.as_u16()));
        }

        let markup = response
            .text()
            .await
            .map_err(|e| AppError::checkout(format!("Checkout read failed: {e}")))?;
        if markup.trim().is_empty() {
            return Err(AppError::checkout("Checkout returned an empty page"));
        }
        Ok(markup)
    }
}
