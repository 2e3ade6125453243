//! Health check logic and service statistics
//!
//! Readiness and liveness probes over the shared engine handle, plus the
//! statistics payload served by the `/stats` endpoint.

use crate::service::app::EngineHandle;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Service statistics
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Players currently waiting across all queues
    pub players_waiting: usize,
    /// Live matches
    pub active_matches: usize,
    /// Matches concluded with a result since start
    pub finished_matches: usize,
    /// Matches concluded without a result since start
    pub cancelled_matches: usize,
    /// Matcher passes run since start
    pub matcher_passes: u64,
    /// Matches formed by the matcher since start
    pub matches_created: u64,
    /// Service uptime information
    pub uptime_info: String,
}

impl HealthCheck {
    /// Perform a comprehensive health check of the service
    pub async fn check(engine: Arc<EngineHandle>) -> Result<Self> {
        let mut checks = Vec::new();
        let mut overall_status = HealthStatus::Healthy;

        let service_check = Self::check_service_running(&engine).await;
        if service_check.status != HealthStatus::Healthy {
            overall_status = HealthStatus::Unhealthy;
        }
        checks.push(service_check);

        let engine_check = Self::check_engine(&engine);
        if engine_check.status == HealthStatus::Unhealthy {
            overall_status = HealthStatus::Unhealthy;
        } else if engine_check.status == HealthStatus::Degraded
            && overall_status == HealthStatus::Healthy
        {
            overall_status = HealthStatus::Degraded;
        }
        checks.push(engine_check);

        let stats = engine.stats().unwrap_or_else(|e| {
            debug!("Failed to gather stats for health check: {}", e);
            ServiceStats::default()
        });

        Ok(HealthCheck {
            status: overall_status,
            service: engine.config().service.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats,
        })
    }

    /// Simple liveness check, just verify the service is running
    pub async fn liveness_check(engine: Arc<EngineHandle>) -> Result<HealthStatus> {
        if engine.is_running().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    /// Readiness check, verify the engine can answer queries
    pub async fn readiness_check(engine: Arc<EngineHandle>) -> Result<HealthStatus> {
        if !engine.is_running().await {
            return Ok(HealthStatus::Unhealthy);
        }
        Ok(Self::check_engine(&engine).status)
    }

    async fn check_service_running(engine: &EngineHandle) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = if engine.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Verify the queue store and registry locks are answerable
    fn check_engine(engine: &EngineHandle) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = match engine.stats() {
            Ok(_) => (HealthStatus::Healthy, None),
            Err(e) => (
                HealthStatus::Degraded,
                Some(format!("Stats check failed: {}", e)),
            ),
        };

        ComponentCheck {
            name: "engine".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::service::app::AppState;

    #[tokio::test]
    async fn test_liveness_reflects_running_flag() {
        let mut config = AppConfig::default();
        config.service.health_port = 18081;
        let app = AppState::new(config).unwrap();
        let engine = app.engine();

        let status = HealthCheck::liveness_check(engine.clone()).await.unwrap();
        assert_eq!(status, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_full_check_reports_stats() {
        let mut config = AppConfig::default();
        config.service.health_port = 18082;
        let app = AppState::new(config).unwrap();

        let health = HealthCheck::check(app.engine()).await.unwrap();
        assert_eq!(health.service, "arena-matchmaker");
        assert_eq!(health.stats.players_waiting, 0);
        assert_eq!(health.checks.len(), 2);
        assert!(health.to_json().unwrap().contains("players_waiting"));
    }
}
