//! Configuration validation module
//! 
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{EventHubError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_server_config(&settings.server)?;
    validate_database_config(&settings.database)?;
    validate_registration_config(&settings.registration)?;
    validate_notification_config(&settings.notifications)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate server configuration
fn validate_server_config(config: &super::ServerConfig) -> Result<()> {
    if config.host.is_empty() {
        return Err(EventHubError::Config(
            "Server host is required".to_string()
        ));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(EventHubError::Config(
            "Database URL is required".to_string()
        ));
    }
    
    if config.max_connections == 0 {
        return Err(EventHubError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }
    
    if config.min_connections > config.max_connections {
        return Err(EventHubError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }
    
    Ok(())
}

/// Validate registration configuration
fn validate_registration_config(config: &super::RegistrationConfig) -> Result<()> {
    if config.cancellation_window_hours < 0 {
        return Err(EventHubError::Config(
            "Cancellation window cannot be negative".to_string()
        ));
    }

    if config.default_ticket_type.trim().is_empty() {
        return Err(EventHubError::Config(
            "Default ticket type is required".to_string()
        ));
    }

    Ok(())
}

/// Validate notification configuration
fn validate_notification_config(config: &super::NotificationConfig) -> Result<()> {
    if config.enabled && !crate::utils::helpers::is_valid_email(&config.email_from) {
        return Err(EventHubError::Config(
            format!("Invalid sender address: {}", config.email_from)
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(EventHubError::Config(
            "Log level is required".to_string()
        ));
    }
    
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(EventHubError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }
    
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_inverted_pool_bounds() {
        let mut settings = Settings::default();
        settings.database.min_connections = 20;
        assert!(matches!(validate_settings(&settings), Err(EventHubError::Config(_))));
    }

    #[test]
    fn test_rejects_negative_window() {
        let mut settings = Settings::default();
        settings.registration.cancellation_window_hours = -1;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_sender_only_checked_when_enabled() {
        let mut settings = Settings::default();
        settings.notifications.email_from = "nobody".to_string();
        assert!(validate_settings(&settings).is_err());

        settings.notifications.enabled = false;
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let mut settings = Settings::default();
        settings.logging.level = "verbose".to_string();
        assert!(validate_settings(&settings).is_err());
    }
}
