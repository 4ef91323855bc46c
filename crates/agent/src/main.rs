//! smsrelay agent binary.
//!
//! Wires the delivery pipeline together - gateway client, SMS channel,
//! stats store, delivery service, scheduler - and runs until interrupted.
//! Configuration comes from the environment or a probed config file; see
//! `smsrelay_infra::config` for the variable names.

use std::sync::Arc;

use anyhow::Context;
use smsrelay_core::{DeliveryService, StatsStore};
use smsrelay_infra::{DeliveryScheduler, GatewayClient, HttpSmsChannel, SqliteStatsStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = smsrelay_infra::config::load().context("loading configuration")?;

    let gateway =
        Arc::new(GatewayClient::with_config((&config.gateway).into()).context("gateway client")?);
    let channel = Arc::new(HttpSmsChannel::with_config(&config.channel).context("sms channel")?);
    let stats =
        Arc::new(SqliteStatsStore::open(&config.storage.stats_path).context("stats store")?);

    if let Ok(count) = stats.sent_count() {
        info!(sent_total = count, "Stats store ready");
    }

    let service = Arc::new(DeliveryService::new(
        gateway,
        channel,
        Arc::clone(&stats) as Arc<dyn StatsStore>,
        config.delivery.clone(),
    ));

    let mut scheduler = DeliveryScheduler::new(service, config.scheduler.clone());
    scheduler.start().await.context("starting scheduler")?;

    info!("smsrelay agent running; waiting for shutdown signal");

    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    info!("Shutdown signal received");

    scheduler.stop().await.context("stopping scheduler")?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).compact().init();
}
