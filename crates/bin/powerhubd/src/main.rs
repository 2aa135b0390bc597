//! # powerhubd — powerhub daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (`powerhub.toml` plus env overrides) and init logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Register the devices declared in the configuration
//! - Construct the control plane: locks, state writer, command executor,
//!   reconciler and schedule engine, sharing one notification bus
//! - Build the axum router and serve until SIGINT/SIGTERM
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use powerhub_adapter_http_axum::state::AppState;
use powerhub_adapter_storage_sqlite_sqlx::{
    Config as DbConfig, SqliteDeviceRepository, SqliteScheduleRepository,
};
use powerhub_adapter_virtual::VirtualFleet;
use powerhub_app::lock_manager::LockManager;
use powerhub_app::notification_bus::NotificationBus;
use powerhub_app::ports::DriverRegistry;
use powerhub_app::reconciler::Reconciler;
use powerhub_app::schedule_engine::ScheduleEngine;
use powerhub_app::services::command_executor::CommandExecutor;
use powerhub_app::services::device_service::DeviceService;
use powerhub_app::services::schedule_service::ScheduleService;
use powerhub_app::state_writer::StateWriter;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Database
    let db = DbConfig {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let device_repo = SqliteDeviceRepository::new(db.pool().clone());
    let schedule_repo = SqliteScheduleRepository::new(db.pool().clone());

    // Seed devices
    let device_service = Arc::new(DeviceService::new(device_repo.clone()));
    for device in config.seed_devices()? {
        let device = device_service.register_device(device).await?;
        tracing::info!(device = %device.name, category = %device.category, "device registered");
    }

    // Drivers
    let drivers = if config.virtual_drivers.enabled {
        tracing::info!("routing every category to virtual drivers");
        VirtualFleet::new(config.virtual_settings()).registry()
    } else {
        tracing::warn!("no drivers configured, power commands will fail");
        DriverRegistry::new()
    };

    // Control plane
    let profiles = Arc::new(config.profiles());
    let locks = Arc::new(LockManager::new());
    let bus = Arc::new(NotificationBus::new(config.notifications.observer_buffer));
    let writer = Arc::new(StateWriter::new(device_repo.clone(), Arc::clone(&bus)));
    let executor = Arc::new(CommandExecutor::new(
        Arc::clone(&writer),
        Arc::clone(&locks),
        drivers.clone(),
        Arc::clone(&profiles),
    ));

    let mut tasks: Vec<JoinHandle<()>> = Vec::new();
    if config.reconciliation.enabled {
        let reconciler = Arc::new(Reconciler::new(writer, locks, drivers, profiles));
        tasks.extend(reconciler.spawn());
    }
    if config.scheduler.enabled {
        let engine = Arc::new(ScheduleEngine::new(
            schedule_repo.clone(),
            Arc::clone(&executor),
            config.scheduler_settings(),
        ));
        tasks.push(engine.spawn());
    }

    // HTTP
    let state = AppState::from_arcs(
        executor,
        device_service,
        Arc::new(ScheduleService::new(schedule_repo, device_repo)),
        bus,
    );
    let app = powerhub_adapter_http_axum::router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "powerhubd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down");
    for task in tasks {
        task.abort();
    }
    db.close().await;

    Ok(())
}

/// Resolve when SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received ctrl-c"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
