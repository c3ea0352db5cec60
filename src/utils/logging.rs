//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the EventHub application.

use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;
use crate::config::LoggingConfig;
use crate::utils::errors::{EventHubError, Result};

/// Initialize logging based on configuration
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| EventHubError::Config(format!("Invalid log filter '{}': {}", config.level, e)))?;

    let stdout_layer = if config.json {
        tracing_subscriber::fmt::layer().json().with_writer(std::io::stdout).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_writer(std::io::stdout).boxed()
    };

    let (file_layer, guard) = match &config.file_path {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "eventhub.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| EventHubError::Config(format!("Logging already initialized: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log registration lifecycle actions with structured data
pub fn log_registration_action(registration_id: Uuid, event_id: Uuid, user_id: Uuid, action: &str, status: &str) {
    info!(
        registration_id = %registration_id,
        event_id = %event_id,
        user_id = %user_id,
        action = action,
        status = status,
        "Registration action performed"
    );
}

/// Log attendee counter adjustments
pub fn log_counter_adjustment(event_id: Uuid, delta: i32, attendees_count: Option<i32>) {
    debug!(
        event_id = %event_id,
        delta = delta,
        attendees_count = attendees_count,
        "Attendee counter adjusted"
    );
}

/// Log drift detected while recounting attendees
pub fn log_counter_drift(event_id: Uuid, stored: i32, recomputed: i32) {
    warn!(
        event_id = %event_id,
        stored = stored,
        recomputed = recomputed,
        "Attendee counter drift repaired"
    );
}

/// Log notification or email dispatch failures
pub fn log_dispatch_failure(channel: &str, recipient: &str, error: &EventHubError) {
    warn!(
        channel = channel,
        recipient = recipient,
        error = %error,
        "Dispatch failed"
    );
}

/// Log staff actions on events
pub fn log_admin_action(actor_id: Uuid, action: &str, target: Option<&str>, details: Option<&str>) {
    warn!(
        actor_id = %actor_id,
        action = action,
        target = target,
        details = details,
        "Staff action performed"
    );
}
