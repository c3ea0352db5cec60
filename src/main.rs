//! EventHub registration backend
//!
//! Main application entry point

use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};

use EventHub::{
    config::Settings,
    database::{create_pool, run_migrations, DatabaseService, EntityStore},
    handlers::{router, AppState},
    services::{AttendeeCounter, LogEmailSender, NotificationService, ServiceFactory, StoreNotificationSink},
    utils::{clock::SystemClock, logging, Clock},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("failed to load configuration")?;
    settings.validate()?;

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", EventHub::info());

    // Initialize database connection
    info!("Connecting to database...");
    let pool = create_pool(&settings.database).await?;
    run_migrations(&pool).await?;

    let store: Arc<dyn EntityStore> = Arc::new(DatabaseService::new(pool));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Notification dispatch runs on its own task
    let (dispatcher, dispatch_worker) = NotificationService::spawn(
        Arc::new(StoreNotificationSink::new(store.clone())),
        Arc::new(LogEmailSender),
        clock.clone(),
        &settings.notifications,
    );

    info!("Initializing services...");
    let services = ServiceFactory::new(store, clock, Arc::new(dispatcher), &settings);

    let sweep = match settings.registration.reconcile_interval_seconds {
        0 => None,
        seconds => Some(tokio::spawn(run_counter_sweep(
            services.counter.clone(),
            Duration::from_secs(seconds),
        ))),
    };

    let app = router(AppState::new(services));

    let address = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    info!("Listening on http://{}", address);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }

    if let Some(sweep) = sweep {
        sweep.abort();
    }
    // The router owned the last dispatcher handle, so the worker drains and stops
    if tokio::time::timeout(Duration::from_secs(5), dispatch_worker).await.is_err() {
        warn!("Dispatch worker did not drain in time");
    }

    info!("EventHub has been shut down.");
    Ok(())
}

/// Periodically rebuild every attendee counter from its registrations
async fn run_counter_sweep(counter: AttendeeCounter, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        if let Err(e) = counter.recompute_all().await {
            error!(error = %e, "Attendee counter sweep failed");
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
