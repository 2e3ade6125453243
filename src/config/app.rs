//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! arena-matchmaker service, including environment variable loading,
//! TOML file loading, and validation.

use crate::config::tuning::MatchmakingTuning;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub matchmaking: MatchmakingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for health check and metrics endpoints
    pub health_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
    /// Token required for admin-only operations
    pub admin_token: String,
}

/// Matchmaking-specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchmakingSettings {
    /// Matcher pass interval in seconds
    pub matcher_tick_seconds: u64,
    /// Timeout sweeper pass interval in seconds
    pub sweeper_tick_seconds: u64,
    /// Initial threshold tuning (runtime-adjustable via the admin API)
    pub tuning: MatchmakingTuning,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "arena-matchmaker".to_string(),
            log_level: "info".to_string(),
            health_port: 8080,
            shutdown_timeout_seconds: 30,
            admin_token: "change-me".to_string(),
        }
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            matcher_tick_seconds: 1,
            sweeper_tick_seconds: 30,
            tuning: MatchmakingTuning::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(port) = env::var("HEALTH_PORT") {
            config.service.health_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HEALTH_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }
        if let Ok(token) = env::var("ADMIN_TOKEN") {
            config.service.admin_token = token;
        }

        // Matchmaking settings
        if let Ok(tick) = env::var("MATCHER_TICK_SECONDS") {
            config.matchmaking.matcher_tick_seconds = tick
                .parse()
                .map_err(|_| anyhow!("Invalid MATCHER_TICK_SECONDS value: {}", tick))?;
        }
        if let Ok(tick) = env::var("SWEEPER_TICK_SECONDS") {
            config.matchmaking.sweeper_tick_seconds = tick
                .parse()
                .map_err(|_| anyhow!("Invalid SWEEPER_TICK_SECONDS value: {}", tick))?;
        }
        if let Ok(threshold) = env::var("MMR_BASE_THRESHOLD") {
            config.matchmaking.tuning.base_threshold = threshold
                .parse()
                .map_err(|_| anyhow!("Invalid MMR_BASE_THRESHOLD value: {}", threshold))?;
        }
        if let Ok(grace) = env::var("MMR_THRESHOLD_RAISE_SECONDS") {
            config.matchmaking.tuning.threshold_raise_seconds = grace
                .parse()
                .map_err(|_| anyhow!("Invalid MMR_THRESHOLD_RAISE_SECONDS value: {}", grace))?;
        }
        if let Ok(step) = env::var("MMR_THRESHOLD_RAISE_STEP") {
            config.matchmaking.tuning.threshold_raise_step = step
                .parse()
                .map_err(|_| anyhow!("Invalid MMR_THRESHOLD_RAISE_STEP value: {}", step))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get matcher tick interval as Duration
    pub fn matcher_tick(&self) -> Duration {
        Duration::from_secs(self.matchmaking.matcher_tick_seconds)
    }

    /// Get sweeper tick interval as Duration
    pub fn sweeper_tick(&self) -> Duration {
        Duration::from_secs(self.matchmaking.sweeper_tick_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.health_port == 0 {
        return Err(anyhow!("Health port cannot be 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }
    if config.service.admin_token.is_empty() {
        return Err(anyhow!("Admin token cannot be empty"));
    }

    if config.matchmaking.matcher_tick_seconds == 0 {
        return Err(anyhow!("Matcher tick must be greater than 0"));
    }
    if config.matchmaking.sweeper_tick_seconds == 0 {
        return Err(anyhow!("Sweeper tick must be greater than 0"));
    }
    config.matchmaking.tuning.validate()?;

    Ok(())
}
