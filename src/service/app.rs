//! Main application state and service coordination
//!
//! This module wires the queue store, match registry, matcher, and sweeper
//! together, runs them on their configured intervals, and manages graceful
//! startup and shutdown.

use crate::api::MatchmakingApi;
use crate::config::AppConfig;
use crate::directory::{InMemoryPlayerDirectory, PlayerDirectory};
use crate::error::Result as MatchmakingResult;
use crate::matches::{MatchRegistry, TimeoutSweeper};
use crate::metrics::health::HealthServerConfig;
use crate::metrics::{HealthServer, MetricsCollector, MetricsService};
use crate::queue::{Matcher, QueueStore};
use crate::service::health::ServiceStats;
use crate::types::MatchType;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Shared handle to the running engine.
///
/// Everything the health endpoints and background tasks need lives here so
/// it can be cloned into tasks and the HTTP server without touching the
/// task-owning [`AppState`].
pub struct EngineHandle {
    config: AppConfig,
    directory: Arc<InMemoryPlayerDirectory>,
    store: Arc<QueueStore>,
    registry: Arc<MatchRegistry>,
    matcher: Arc<Matcher>,
    sweeper: Arc<TimeoutSweeper>,
    api: Arc<MatchmakingApi>,
    is_running: Arc<RwLock<bool>>,
    started_at: Instant,
}

impl EngineHandle {
    fn new(config: AppConfig, metrics: Arc<MetricsCollector>) -> Self {
        let directory = Arc::new(InMemoryPlayerDirectory::new());
        let store = Arc::new(QueueStore::new(
            directory.clone() as Arc<dyn PlayerDirectory>,
            config.matchmaking.tuning,
        ));
        let registry = Arc::new(MatchRegistry::new(
            directory.clone() as Arc<dyn PlayerDirectory>,
        ));
        let matcher = Arc::new(Matcher::with_metrics(
            store.clone(),
            registry.clone(),
            metrics.clone(),
        ));
        let sweeper = Arc::new(TimeoutSweeper::new(registry.clone()));
        let api = Arc::new(
            MatchmakingApi::new(
                store.clone(),
                registry.clone(),
                config.service.admin_token.clone(),
            )
            .with_metrics(metrics),
        );

        Self {
            config,
            directory,
            store,
            registry,
            matcher,
            sweeper,
            api,
            is_running: Arc::new(RwLock::new(false)),
            started_at: Instant::now(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn directory(&self) -> Arc<InMemoryPlayerDirectory> {
        self.directory.clone()
    }

    pub fn store(&self) -> Arc<QueueStore> {
        self.store.clone()
    }

    pub fn registry(&self) -> Arc<MatchRegistry> {
        self.registry.clone()
    }

    pub fn matcher(&self) -> Arc<Matcher> {
        self.matcher.clone()
    }

    pub fn sweeper(&self) -> Arc<TimeoutSweeper> {
        self.sweeper.clone()
    }

    pub fn api(&self) -> Arc<MatchmakingApi> {
        self.api.clone()
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Gather current service statistics
    pub fn stats(&self) -> MatchmakingResult<ServiceStats> {
        let registry_stats = self.registry.stats()?;
        let matcher_stats = self.matcher.stats()?;
        Ok(ServiceStats {
            players_waiting: self.store.total_len()?,
            active_matches: registry_stats.active_matches,
            finished_matches: registry_stats.finished_matches,
            cancelled_matches: registry_stats.cancelled_matches,
            matcher_passes: matcher_stats.passes,
            matches_created: matcher_stats.matches_created,
            uptime_info: format!("{}s", self.uptime().as_secs()),
        })
    }
}

/// Main application state containing all service components
pub struct AppState {
    engine: Arc<EngineHandle>,
    metrics_service: Arc<MetricsService>,
    background_tasks: Vec<JoinHandle<()>>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing arena-matchmaker service");
        info!(
            "Configuration: service={}, health_port={}",
            config.service.name, config.service.health_port
        );

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let engine = Arc::new(EngineHandle::new(config, metrics_collector.clone()));
        let metrics_service = Self::initialize_metrics(&engine, metrics_collector);

        Ok(Self {
            engine,
            metrics_service,
            background_tasks: Vec::new(),
        })
    }

    /// Start all background services
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting arena-matchmaker service");

        *self.engine.is_running.write().await = true;

        self.start_metrics_service().await?;
        self.start_background_tasks();

        info!("Arena-matchmaker service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of arena-matchmaker service");

        *self.engine.is_running.write().await = false;

        self.stop_background_tasks().await;

        if let Err(e) = self.metrics_service.stop().await {
            warn!("Failed to stop metrics service: {}", e);
        }

        let final_stats = self
            .engine
            .stats()
            .map_err(|e| ServiceError::BackgroundTask {
                message: format!("Failed to get final stats: {}", e),
            })?;
        info!("Final service statistics: {:?}", final_stats);
        info!("Arena-matchmaker service shutdown completed");

        Ok(())
    }

    /// Shared engine handle
    pub fn engine(&self) -> Arc<EngineHandle> {
        self.engine.clone()
    }

    /// Get metrics service
    pub fn metrics_service(&self) -> Arc<MetricsService> {
        self.metrics_service.clone()
    }

    fn initialize_metrics(
        engine: &Arc<EngineHandle>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Arc<MetricsService> {
        let health_config = HealthServerConfig {
            port: engine.config.service.health_port,
            host: "0.0.0.0".to_string(),
        };

        let health_server = Arc::new(
            HealthServer::new(health_config, metrics_collector.clone())
                .with_engine(engine.clone()),
        );
        Arc::new(MetricsService::new(metrics_collector, health_server))
    }

    async fn start_metrics_service(&mut self) -> Result<(), ServiceError> {
        let metrics_service = self.metrics_service.clone();
        let port = self.engine.config.service.health_port;

        let metrics_handle = tokio::spawn(async move {
            if let Err(e) = metrics_service.start().await {
                error!("Metrics service failed: {}", e);
            }
        });
        self.background_tasks.push(metrics_handle);

        // Give the server a moment to bind
        tokio::time::sleep(Duration::from_millis(100)).await;

        info!("Health and metrics endpoints started on port {}", port);
        Ok(())
    }

    fn start_background_tasks(&mut self) {
        // Matcher pass task
        let matcher_task = {
            let engine = self.engine.clone();
            let collector = self.metrics_service.collector();
            let tick = engine.config.matcher_tick();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(tick);
                info!(
                    "Matcher task started ({}s interval)",
                    tick.as_secs()
                );

                while *engine.is_running.read().await {
                    interval.tick().await;

                    let pass_start = std::time::Instant::now();
                    match engine.matcher.run_pass() {
                        Ok(created) => {
                            if created > 0 {
                                debug!("Matcher pass formed {} matches", created);
                            }
                        }
                        Err(e) => {
                            warn!("Matcher pass failed: {}", e);
                        }
                    }
                    collector.record_matcher_pass(pass_start.elapsed());
                }

                info!("Matcher task stopped");
            })
        };

        // Timeout sweeper task
        let sweeper_task = {
            let engine = self.engine.clone();
            let collector = self.metrics_service.collector();
            let tick = engine.config.sweeper_tick();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(tick);
                info!(
                    "Timeout sweeper task started ({}s interval)",
                    tick.as_secs()
                );

                while *engine.is_running.read().await {
                    interval.tick().await;

                    match engine.sweeper.run_pass() {
                        Ok(cancelled) => {
                            for _ in 0..cancelled {
                                collector.record_match_cancelled("timeout");
                            }
                        }
                        Err(e) => {
                            warn!("Timeout sweep failed: {}", e);
                        }
                    }
                }

                info!("Timeout sweeper task stopped");
            })
        };

        // Gauge and uptime refresh task
        let metrics_task = {
            let engine = self.engine.clone();
            let collector = self.metrics_service.collector();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(30));
                info!("Metrics refresh task started");

                while *engine.is_running.read().await {
                    interval.tick().await;

                    collector.update_uptime(engine.uptime());
                    collector.update_health_status(1);

                    for match_type in MatchType::all() {
                        match engine.store.queue_len(match_type) {
                            Ok(waiting) => collector.set_players_waiting(match_type, waiting),
                            Err(e) => warn!("Failed to read queue depth: {}", e),
                        }
                    }

                    match engine.registry.list_active() {
                        Ok(active) => {
                            for match_type in MatchType::all() {
                                let count = active
                                    .iter()
                                    .filter(|m| m.match_type() == match_type)
                                    .count();
                                collector.set_active_matches(match_type, count);
                            }
                        }
                        Err(e) => warn!("Failed to list active matches: {}", e),
                    }
                }

                info!("Metrics refresh task stopped");
            })
        };

        self.background_tasks.push(matcher_task);
        self.background_tasks.push(sweeper_task);
        self.background_tasks.push(metrics_task);

        info!("Background tasks started");
    }

    async fn stop_background_tasks(&mut self) {
        let task_count = self.background_tasks.len();
        if task_count == 0 {
            return;
        }

        info!("Stopping {} background tasks", task_count);
        for task in self.background_tasks.drain(..) {
            task.abort();
        }

        // Give tasks time to observe cancellation
        tokio::time::sleep(Duration::from_millis(200)).await;
        info!("All background tasks stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.service.health_port = 18080;
        config
    }

    #[tokio::test]
    async fn test_engine_wiring() {
        let app = AppState::new(test_config()).unwrap();
        let engine = app.engine();

        assert!(!engine.is_running().await);

        engine.directory().register_player("p1", 1000).unwrap();
        engine
            .api()
            .join_queue(&"p1".to_string(), MatchType::OneVsOne)
            .unwrap();
        assert_eq!(engine.store().total_len().unwrap(), 1);

        let stats = engine.stats().unwrap();
        assert_eq!(stats.players_waiting, 1);
        assert_eq!(stats.active_matches, 0);
    }

    #[tokio::test]
    async fn test_manual_pass_through_engine() {
        let app = AppState::new(test_config()).unwrap();
        let engine = app.engine();

        for (id, mmr) in [("p1", 1000), ("p2", 1010)] {
            engine.directory().register_player(id, mmr).unwrap();
            engine
                .api()
                .join_queue(&id.to_string(), MatchType::OneVsOne)
                .unwrap();
        }

        assert_eq!(engine.matcher().run_pass().unwrap(), 1);
        assert_eq!(engine.stats().unwrap().active_matches, 1);
        assert_eq!(engine.sweeper().run_pass().unwrap(), 0);
    }
}
