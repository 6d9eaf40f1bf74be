// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `campaigner serve` and `campaigner dispatch` implementations.
//!
//! Both open the SQLite store, build the transport registry and wire the
//! dispatcher. `serve` then hands the dispatcher to one scheduler worker per
//! enabled channel and runs until a shutdown signal arrives.

use std::sync::Arc;

use campaigner_config::CampaignerConfig;
use campaigner_core::{CampaignerError, ChannelKind};
use campaigner_dispatch::{
    CampaignDispatcher, DeliveryHandler, DispatchStep, RunOutcome, Scheduler, shutdown,
};
use campaigner_storage::{Database, SqliteStore};
use campaigner_transport::TransportRegistry;
use tracing::{debug, info, warn};

/// The wired dispatch stack over one database.
pub struct Engine {
    pub db: Database,
    pub registry: Arc<TransportRegistry>,
    pub dispatcher: Arc<CampaignDispatcher>,
}

pub async fn build_engine(config: &CampaignerConfig) -> Result<Engine, CampaignerError> {
    let db = Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;
    info!(path = %config.storage.database_path, "database ready");
    let store = Arc::new(SqliteStore::new(db.clone()));

    let registry = Arc::new(TransportRegistry::with_builtin());
    debug!(service_types = ?registry.service_types(), "transport registry ready");

    let handler = DeliveryHandler::new(store.clone(), store.clone(), Arc::clone(&registry))
        .with_send_timeout(config.queue.send_timeout());
    let dispatcher = CampaignDispatcher::new(store.clone(), store, Arc::new(handler))
        .with_queue_depth(config.queue.depth);

    Ok(Engine {
        db,
        registry,
        dispatcher: Arc::new(dispatcher),
    })
}

/// Run the `campaigner serve` command.
pub async fn run_serve(config: CampaignerConfig) -> Result<(), CampaignerError> {
    init_tracing(&config.daemon.log_level);
    info!("starting campaigner serve");

    let engine = build_engine(&config).await?;
    let cancel = shutdown::install_signal_handler();
    let mut scheduler = Scheduler::new(cancel.clone());

    let workers = &config.scheduler;
    if workers.email.enabled {
        let step: Arc<dyn DispatchStep> = engine.dispatcher.clone();
        scheduler.spawn(ChannelKind::Email, workers.email.interval(), step);
    }
    for (channel, worker) in [
        (ChannelKind::Mobile, &workers.mobile),
        (ChannelKind::Notification, &workers.notification),
    ] {
        if worker.enabled {
            warn!(%channel, "no dispatcher for channel, worker not started");
        }
    }
    if scheduler.worker_count() == 0 {
        warn!("no scheduler workers enabled, idling until shutdown");
    }

    cancel.cancelled().await;
    info!("shutdown requested");

    if !scheduler.shutdown(config.daemon.shutdown_timeout()).await {
        warn!("scheduler workers aborted after shutdown timeout");
    }
    engine.db.close().await?;

    info!("campaigner serve shutdown complete");
    Ok(())
}

/// Run the `campaigner dispatch` command: exactly one dispatch step.
pub async fn run_dispatch(config: CampaignerConfig) -> Result<RunOutcome, CampaignerError> {
    init_tracing(&config.daemon.log_level);

    let engine = build_engine(&config).await?;
    let outcome = engine.dispatcher.run().await;
    engine.db.close().await?;
    outcome
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("campaigner={log_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}
