//! Service-facing operation surface
//!
//! `MatchmakingApi` is the one entry point an embedding service calls into:
//! queue verbs, match lifecycle verbs, read-only queries, and token-guarded
//! admin operations. It owns no state of its own; every call delegates to the
//! queue store or the match registry.

use crate::config::tuning::MatchmakingTuning;
use crate::error::{MatchmakingError, Result};
use crate::matches::{MatchInstance, MatchRegistry};
use crate::metrics::MetricsCollector;
use crate::queue::QueueStore;
use crate::types::{
    ActionId, MatchId, MatchOutcome, MatchType, PlayerId, PlayerQueueStatus, QueueTicket,
    QueueView,
};
use std::sync::Arc;

/// Unified operation surface over the queue store and match registry
pub struct MatchmakingApi {
    store: Arc<QueueStore>,
    registry: Arc<MatchRegistry>,
    admin_token: String,
    metrics: Option<Arc<MetricsCollector>>,
}

impl MatchmakingApi {
    pub fn new(store: Arc<QueueStore>, registry: Arc<MatchRegistry>, admin_token: String) -> Self {
        Self {
            store,
            registry,
            admin_token,
            metrics: None,
        }
    }

    /// Attach a metrics collector recording queue and lifecycle counters
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn authorize(&self, token: &str) -> Result<()> {
        if token != self.admin_token {
            return Err(MatchmakingError::Unauthorized {
                reason: "Invalid admin token".to_string(),
            }
            .into());
        }
        Ok(())
    }

    // Queue operations

    /// Put a player into the queue for one match type
    pub fn join_queue(&self, player_id: &PlayerId, match_type: MatchType) -> Result<QueueTicket> {
        let ticket = self.store.join(player_id, match_type)?;
        if let Some(metrics) = &self.metrics {
            metrics.record_player_queued(match_type);
        }
        Ok(ticket)
    }

    /// Remove a player's outstanding ticket
    pub fn leave_queue(&self, player_id: &PlayerId) -> Result<QueueTicket> {
        let ticket = self.store.leave(player_id)?;
        if let Some(metrics) = &self.metrics {
            metrics.record_player_left(ticket.match_type);
        }
        Ok(ticket)
    }

    /// One player's queue status with live wait time and threshold
    pub fn player_queue_status(&self, player_id: &PlayerId) -> Result<PlayerQueueStatus> {
        self.store.status_of(player_id)
    }

    /// Snapshot of every queue with live computed thresholds
    pub fn queue_snapshot(&self) -> Result<Vec<QueueView>> {
        self.store.snapshot()
    }

    // Match lifecycle operations

    /// Mark a match as in play
    pub fn start_match(&self, match_id: MatchId) -> Result<()> {
        self.registry.activate(match_id)
    }

    /// Append one action to a live match's log
    pub fn log_action(
        &self,
        match_id: MatchId,
        player_id: &PlayerId,
        action_type: String,
        payload: serde_json::Value,
    ) -> Result<ActionId> {
        if action_type.trim().is_empty() {
            return Err(MatchmakingError::InvalidInput {
                reason: "Action type cannot be empty".to_string(),
            }
            .into());
        }
        self.registry
            .log_action(match_id, player_id, action_type, payload)
    }

    /// Record a participant's surrender; the match keeps running
    pub fn surrender(
        &self,
        match_id: MatchId,
        player_id: &PlayerId,
        reason: Option<String>,
    ) -> Result<()> {
        self.registry.surrender(match_id, player_id, reason)
    }

    /// Conclude a match with an explicit result
    pub fn finish_match(&self, match_id: MatchId, outcome: &MatchOutcome) -> Result<()> {
        self.registry.finish(match_id, outcome)?;
        if let Some(metrics) = &self.metrics {
            metrics.record_match_finished();
        }
        Ok(())
    }

    /// Conclude a match without a result
    pub fn cancel_match(&self, match_id: MatchId, reason: &str) -> Result<()> {
        self.registry.cancel(match_id, reason)?;
        if let Some(metrics) = &self.metrics {
            metrics.record_match_cancelled(reason);
        }
        Ok(())
    }

    // Read-only match queries

    pub fn get_match(&self, match_id: MatchId) -> Result<MatchInstance> {
        self.registry.get(match_id)
    }

    pub fn list_active_matches(&self) -> Result<Vec<MatchInstance>> {
        self.registry.list_active()
    }

    pub fn list_match_history(&self) -> Result<Vec<MatchInstance>> {
        self.registry.list_history()
    }

    pub fn list_player_matches(&self, player_id: &PlayerId) -> Result<Vec<MatchInstance>> {
        self.registry.list_by_player(player_id)
    }

    // Admin operations

    /// Create a match directly from a player list, bypassing the queues
    pub fn create_match(
        &self,
        token: &str,
        match_type: MatchType,
        players: Vec<PlayerId>,
    ) -> Result<MatchId> {
        self.authorize(token)?;
        self.registry.create_admin(match_type, players)
    }

    /// Drop every outstanding ticket; returns how many were removed
    pub fn clear_queues(&self, token: &str) -> Result<usize> {
        self.authorize(token)?;
        self.store.clear()
    }

    /// Drop all concluded matches; returns how many were removed
    pub fn clear_match_history(&self, token: &str) -> Result<usize> {
        self.authorize(token)?;
        self.registry.clear_history()
    }

    /// Current threshold tuning constants
    pub fn tuning(&self) -> Result<MatchmakingTuning> {
        self.store.tuning()
    }

    /// Replace the threshold tuning; returns the settings now in effect
    pub fn update_tuning(&self, token: &str, tuning: MatchmakingTuning) -> Result<MatchmakingTuning> {
        self.authorize(token)?;
        self.store.set_tuning(tuning)?;
        self.store.tuning()
    }
}
