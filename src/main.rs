//! Promotion Rebate Engine
//!
//! Serves the broker promotion catalogue and computes trading rebates:
//! - Promotion listing with filters, facets, and pagination
//! - Tiered rebate calculation with eligibility checks
//! - Per-caller rate limiting
//! - Background engagement tracking and expiry sweeps

mod settings;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use api::{router_with_cors, AppState, EventTracker};
use promotion_store::{load_seed_file, CachedStore, InMemoryStore, PromotionStore, StoreConfig};
use rebate_core::RebateCalculator;
use telemetry::{health, init_tracing_from_env};

use crate::settings::Settings;

/// How long shutdown waits for queued tracking events.
const TRACKING_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing_from_env();

    let settings = Settings::load()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %settings.environment,
        origins = ?settings.cors.allowed_origins,
        commission_per_lot = settings.calculator.standard_commission_per_lot,
        "Starting rebate engine"
    );

    let catalogue = Arc::new(seed_catalogue(&settings.store).await?);
    health().store.set_healthy();
    info!(promotions = catalogue.len(), "Promotion catalogue loaded");

    let store: Arc<dyn PromotionStore> = Arc::new(CachedStore::new(catalogue, &settings.store));
    let (tracker, tracking_task) = EventTracker::spawn(store.clone(), &settings.tracking);

    let state = AppState::new(
        store,
        tracker,
        RebateCalculator::new(settings.calculator.clone()),
    )
    .with_environment(settings.environment.clone());

    let _rate_limit_cleanup = state.start_rate_limiter_cleanup();
    let _expiry_sweep = state.start_expiry_sweep(settings.expiry_sweep_interval());

    let addr = settings.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Accepting connections");

    axum::serve(listener, router_with_cors(state, &settings.cors))
        .with_graceful_shutdown(shutdown_requested())
        .await
        .context("HTTP server failed")?;

    drain_tracking(tracking_task).await;
    info!("Stopped");
    Ok(())
}

/// Build the in-memory catalogue. An invalid promotion aborts startup.
async fn seed_catalogue(config: &StoreConfig) -> Result<InMemoryStore> {
    let Some(path) = config.seed_path.as_deref() else {
        warn!("No seed file configured, catalogue is empty");
        return Ok(InMemoryStore::new());
    };

    let promotions = load_seed_file(path)
        .await
        .with_context(|| format!("Failed to load seed file {path}"))?;

    InMemoryStore::from_promotions(promotions)
        .with_context(|| format!("Seed file {path} contains an invalid promotion"))
}

/// The router held the last tracker handle, so the consumer ends once the
/// queue is empty.
async fn drain_tracking(task: JoinHandle<()>) {
    match tokio::time::timeout(TRACKING_DRAIN_TIMEOUT, task).await {
        Ok(Ok(())) => info!("Tracking queue drained"),
        Ok(Err(e)) => error!(error = %e, "Tracking consumer panicked"),
        Err(_) => warn!(
            timeout_secs = TRACKING_DRAIN_TIMEOUT.as_secs(),
            "Gave up waiting for the tracking queue"
        ),
    }
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_requested() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!(signal = "SIGINT", "Shutdown requested"),
                    _ = sigterm.recv() => info!(signal = "SIGTERM", "Shutdown requested"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl+C only"),
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!(signal = "SIGINT", "Shutdown requested"),
        Err(e) => {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
