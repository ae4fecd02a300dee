use anyhow::Context;
use iara_engine::lifecycle::SessionRunner;
use iara_engine::services::{
    HttpCheckoutProvider, HttpConversationWebhook, HttpGateway, RestConfigStore, SystemClock,
};
use iara_engine::{
    BackgroundTasks, Collaborators, Config, PricingTable, Session, TaskKind, TenantIdentity,
    init_logger_with_file,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment and logging
    dotenv::dotenv().ok();
    let config = Config::from_env();
    let _log_guard = init_logger_with_file(
        Some(config.log_level.as_str()),
        config.is_production(),
        config.log_dir.as_deref(),
    );

    tracing::info!(environment = %config.environment, "IARA engine starting...");

    config.validate().context("invalid configuration")?;

    // 2. Collaborators
    let services = Collaborators {
        store: Arc::new(
            RestConfigStore::new(&config.store_url, &config.store_api_key, config.request_timeout())
                .context("store client")?,
        ),
        gateway: Arc::new(
            HttpGateway::new(&config.gateway_url, config.request_timeout())
                .context("gateway client")?,
        ),
        conversation: Arc::new(
            HttpConversationWebhook::new(&config.conversation_url, config.conversation_timeout())
                .context("conversation client")?,
        ),
        checkout: Arc::new(
            HttpCheckoutProvider::new(&config.sales_url, config.request_timeout())
                .context("checkout client")?,
        ),
        clock: Arc::new(SystemClock),
    };

    // 3. Session
    let identity = TenantIdentity {
        user_id: config.tenant_id.clone(),
        email: config.tenant_email.clone(),
        created_at: config.tenant_created_at,
    };
    let session = Session::open(
        identity,
        config.session_settings(),
        PricingTable::from_env(),
        services,
    )
    .await
    .context("failed to load tenant session")?;

    let quote = session.quote();
    tracing::info!(
        plan = quote.plan_label,
        total = %quote.total,
        countdown = %session.countdown(),
        "Tenant session ready"
    );

    // 4. Runner until Ctrl+C
    let mut tasks = BackgroundTasks::new();
    let (runner, _handle) = SessionRunner::new(session, tasks.shutdown_token());
    tasks.spawn(config.tenant_id.clone(), TaskKind::SessionRunner, async move {
        runner.run().await;
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");
    tasks.shutdown().await;

    Ok(())
}
