use super::*;
use anyhow::{anyhow, Result};

/// Validate the complete configuration
pub fn validate_config(config: &WatchdogConfig) -> Result<()> {
    validate_watchdog_settings(&config.watchdog)?;
    validate_hang_detection(&config.hang_detection)?;

    if config.targets().is_empty() {
        return Err(anyhow!(
            "process_address is not configured: at least one executable path is required"
        ));
    }

    Ok(())
}

fn validate_watchdog_settings(settings: &WatchdogSettings) -> Result<()> {
    if settings.poll_interval.is_zero() {
        return Err(anyhow!("Poll interval must be greater than 0"));
    }

    if settings.kill_timeout.is_zero() {
        return Err(anyhow!("Kill timeout must be greater than 0"));
    }

    if let Some(dir) = &settings.log_directory {
        if dir.trim().is_empty() {
            return Err(anyhow!("Log directory cannot be empty when specified"));
        }
    }

    match settings.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(anyhow!(
            "Invalid log level: {}, must be one of: trace, debug, info, warn, error",
            settings.log_level
        )),
    }
}

fn validate_hang_detection(config: &HangDetectionConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    if config.window_class.trim().is_empty() {
        return Err(anyhow!("Hang detection window class cannot be empty"));
    }

    if config.markers.iter().all(|marker| marker.trim().is_empty()) {
        return Err(anyhow!("Hang detection requires at least one non-empty marker"));
    }

    if config.consecutive_polls == 0 {
        return Err(anyhow!("Hang detection consecutive_polls must be at least 1"));
    }

    Ok(())
}
