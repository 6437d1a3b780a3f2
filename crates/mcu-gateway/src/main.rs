//! MCU gateway binary.
//!
//! Runs the gateway over in-memory stores. Configuration comes from
//! defaults plus `MCU_*` environment overrides:
//!
//! - `MCU_HOST`, `MCU_PORT`: listener address
//! - `MCU_ADMIN_PATH`, `MCU_CLUSTER_PATH`: connection path prefixes
//! - `MCU_READY_DELAY_MS`: delay before `authonload`
//! - `MCU_SNAPSHOT_KEY`: cache key of the telemetry snapshot
//! - `MCU_ADMIN_USERNAME` + `MCU_ADMIN_PASSWORD`: seed one admin credential
//! - `MCU_CLUSTER_ADDRESSES`: comma-separated cluster node addresses to register

use anyhow::{Context, Result};
use mcu_bus::{AuditLog, AuditSink, EventChannel, InMemoryEventBus};
use mcu_gateway::{
    AdminCredential, ClusterRecord, GatewayConfig, GatewayService, InMemoryCache,
    InMemoryClusterRegistry,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config();
    config.validate().context("invalid gateway configuration")?;

    let cache = Arc::new(InMemoryCache::new());
    let registry = Arc::new(InMemoryClusterRegistry::new());
    seed_stores(&cache, &registry)?;

    let bus = Arc::new(InMemoryEventBus::with_capacity(config.bus.capacity));
    let audit = Arc::new(AuditLog::new());
    let _audit_task = AuditSink::spawn(&bus, Arc::clone(&audit));

    let service = GatewayService::new(config, cache, registry, Arc::clone(&bus))
        .context("failed to create gateway")?;
    let _error_log = service.on(EventChannel::Error, |event| {
        warn!(kind = ?event.kind, event = %event.event, message = %event.message, "Gateway error event");
    });

    info!("Gateway is starting. Press Ctrl+C to stop.");
    service
        .start(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await
        .context("gateway terminated")?;

    let unread = audit.unread_counts();
    info!(
        recorded = audit.len(),
        unread_errors = unread.get(&EventChannel::Error).copied().unwrap_or(0),
        "Shutdown complete"
    );
    Ok(())
}

/// Load configuration from defaults and environment.
fn load_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();

    if let Ok(host) = std::env::var("MCU_HOST") {
        match host.parse() {
            Ok(h) => config.server.host = h,
            Err(_) => warn!(host = %host, "Ignoring invalid MCU_HOST"),
        }
    }
    if let Ok(port) = std::env::var("MCU_PORT") {
        match port.parse() {
            Ok(p) => config.server.port = p,
            Err(_) => warn!(port = %port, "Ignoring invalid MCU_PORT"),
        }
    }
    if let Ok(path) = std::env::var("MCU_ADMIN_PATH") {
        config.routes.admin_path = path;
    }
    if let Ok(path) = std::env::var("MCU_CLUSTER_PATH") {
        config.routes.cluster_path = path;
    }
    if let Ok(delay) = std::env::var("MCU_READY_DELAY_MS") {
        match delay.parse() {
            Ok(ms) => config.session.ready_delay = Duration::from_millis(ms),
            Err(_) => warn!(delay = %delay, "Ignoring invalid MCU_READY_DELAY_MS"),
        }
    }
    if let Ok(key) = std::env::var("MCU_SNAPSHOT_KEY") {
        config.telemetry.snapshot_key = key;
    }

    config
}

/// Seed the in-memory stores from the environment.
fn seed_stores(cache: &InMemoryCache, registry: &InMemoryClusterRegistry) -> Result<()> {
    match (
        std::env::var("MCU_ADMIN_USERNAME"),
        std::env::var("MCU_ADMIN_PASSWORD"),
    ) {
        (Ok(username), Ok(password)) => {
            cache
                .insert_credential(&AdminCredential::new(username.clone(), password))
                .context("failed to seed admin credential")?;
            info!(username = %username, "Seeded admin credential");
        }
        (Ok(_), Err(_)) | (Err(_), Ok(_)) => {
            warn!("MCU_ADMIN_USERNAME and MCU_ADMIN_PASSWORD must be set together");
        }
        _ => {}
    }

    if let Ok(addresses) = std::env::var("MCU_CLUSTER_ADDRESSES") {
        for address in addresses.split(',').map(str::trim).filter(|a| !a.is_empty()) {
            registry.register(ClusterRecord::new(address));
            info!(address = %address, "Registered cluster node");
        }
    }

    Ok(())
}
