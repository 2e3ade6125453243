//! Metrics collection using Prometheus
//!
//! Counters and gauges for the queue and match lifecycle, exported through
//! the health server's `/metrics` endpoint.

use crate::types::MatchType;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;

/// Main metrics collector for the matchmaking service
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,
    service_metrics: ServiceMetrics,
    queue_metrics: QueueMetrics,
    match_metrics: MatchMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=healthy)
    pub health_status: IntGauge,

    /// Matcher pass duration
    pub matcher_pass_duration: Histogram,
}

/// Queue-related metrics
#[derive(Clone)]
pub struct QueueMetrics {
    /// Players currently waiting, by match type
    pub players_waiting: IntGaugeVec,

    /// Total players that joined a queue
    pub players_queued_total: IntCounterVec,

    /// Total players that left a queue before matching
    pub players_left_total: IntCounterVec,

    /// Time spent in queue before a match formed
    pub queue_wait_time_seconds: HistogramVec,
}

/// Match-related metrics
#[derive(Clone)]
pub struct MatchMetrics {
    /// Live matches, by match type
    pub active_matches: IntGaugeVec,

    /// Total matches formed
    pub matches_created_total: IntCounterVec,

    /// Total matches finished with a result
    pub matches_finished_total: IntCounter,

    /// Total matches cancelled, by reason
    pub matches_cancelled_total: IntCounterVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let queue_metrics = QueueMetrics::new(&registry)?;
        let match_metrics = MatchMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            queue_metrics,
            match_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn queue(&self) -> &QueueMetrics {
        &self.queue_metrics
    }

    pub fn matches(&self) -> &MatchMetrics {
        &self.match_metrics
    }

    /// Record a player joining a queue
    pub fn record_player_queued(&self, match_type: MatchType) {
        let label = match_type.to_string();
        self.queue_metrics
            .players_queued_total
            .with_label_values(&[&label])
            .inc();
    }

    /// Record a player leaving a queue unmatched
    pub fn record_player_left(&self, match_type: MatchType) {
        let label = match_type.to_string();
        self.queue_metrics
            .players_left_total
            .with_label_values(&[&label])
            .inc();
    }

    /// Record a match being formed from queued tickets
    pub fn record_match_created(&self, match_type: MatchType, wait_times: &[Duration]) {
        let label = match_type.to_string();
        self.match_metrics
            .matches_created_total
            .with_label_values(&[&label])
            .inc();
        for wait in wait_times {
            self.queue_metrics
                .queue_wait_time_seconds
                .with_label_values(&[&label])
                .observe(wait.as_secs_f64());
        }
    }

    /// Record a match finishing with a result
    pub fn record_match_finished(&self) {
        self.match_metrics.matches_finished_total.inc();
    }

    /// Record a match being cancelled
    pub fn record_match_cancelled(&self, reason: &str) {
        self.match_metrics
            .matches_cancelled_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Record how long one matcher pass took
    pub fn record_matcher_pass(&self, duration: Duration) {
        self.service_metrics
            .matcher_pass_duration
            .observe(duration.as_secs_f64());
    }

    /// Update the waiting-player gauge for one match type
    pub fn set_players_waiting(&self, match_type: MatchType, count: usize) {
        let label = match_type.to_string();
        self.queue_metrics
            .players_waiting
            .with_label_values(&[&label])
            .set(count as i64);
    }

    /// Update the live-match gauge for one match type
    pub fn set_active_matches(&self, match_type: MatchType, count: usize) {
        let label = match_type.to_string();
        self.match_metrics
            .active_matches
            .with_label_values(&[&label])
            .set(count as i64);
    }

    /// Update service uptime
    pub fn update_uptime(&self, uptime: Duration) {
        self.service_metrics
            .uptime_seconds
            .set(uptime.as_secs() as i64);
    }

    /// Update health status (0=unhealthy, 1=healthy)
    pub fn update_health_status(&self, status: i64) {
        self.service_metrics.health_status.set(status);
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds = IntGauge::with_opts(Opts::new(
            "arena_matchmaker_uptime_seconds",
            "Service uptime in seconds",
        ))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::with_opts(Opts::new(
            "arena_matchmaker_health_status",
            "Health status (0=unhealthy, 1=healthy)",
        ))?;
        registry.register(Box::new(health_status.clone()))?;

        let matcher_pass_duration = Histogram::with_opts(HistogramOpts::new(
            "arena_matchmaker_matcher_pass_duration_seconds",
            "Duration of one matcher pass",
        ))?;
        registry.register(Box::new(matcher_pass_duration.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            matcher_pass_duration,
        })
    }
}

impl QueueMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let players_waiting = IntGaugeVec::new(
            Opts::new(
                "arena_matchmaker_players_waiting",
                "Players currently waiting in queue",
            ),
            &["match_type"],
        )?;
        registry.register(Box::new(players_waiting.clone()))?;

        let players_queued_total = IntCounterVec::new(
            Opts::new(
                "arena_matchmaker_players_queued_total",
                "Total players that joined a queue",
            ),
            &["match_type"],
        )?;
        registry.register(Box::new(players_queued_total.clone()))?;

        let players_left_total = IntCounterVec::new(
            Opts::new(
                "arena_matchmaker_players_left_total",
                "Total players that left a queue before matching",
            ),
            &["match_type"],
        )?;
        registry.register(Box::new(players_left_total.clone()))?;

        let queue_wait_time_seconds = HistogramVec::new(
            HistogramOpts::new(
                "arena_matchmaker_queue_wait_time_seconds",
                "Time spent in queue before a match formed",
            )
            .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
            &["match_type"],
        )?;
        registry.register(Box::new(queue_wait_time_seconds.clone()))?;

        Ok(Self {
            players_waiting,
            players_queued_total,
            players_left_total,
            queue_wait_time_seconds,
        })
    }
}

impl MatchMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let active_matches = IntGaugeVec::new(
            Opts::new("arena_matchmaker_active_matches", "Live matches"),
            &["match_type"],
        )?;
        registry.register(Box::new(active_matches.clone()))?;

        let matches_created_total = IntCounterVec::new(
            Opts::new(
                "arena_matchmaker_matches_created_total",
                "Total matches formed",
            ),
            &["match_type"],
        )?;
        registry.register(Box::new(matches_created_total.clone()))?;

        let matches_finished_total = IntCounter::with_opts(Opts::new(
            "arena_matchmaker_matches_finished_total",
            "Total matches finished with a result",
        ))?;
        registry.register(Box::new(matches_finished_total.clone()))?;

        let matches_cancelled_total = IntCounterVec::new(
            Opts::new(
                "arena_matchmaker_matches_cancelled_total",
                "Total matches cancelled",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(matches_cancelled_total.clone()))?;

        Ok(Self {
            active_matches,
            matches_created_total,
            matches_finished_total,
            matches_cancelled_total,
        })
    }
}
