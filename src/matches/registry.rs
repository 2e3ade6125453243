//! Match registry with serialized lifecycle transitions
//!
//! The registry owns every live match and the append-only history of
//! concluded ones. A single mutex guards both tables so that concurrent
//! finish/cancel/surrender calls observe a consistent lifecycle: the first
//! terminal transition wins and later ones are rejected. Directory reference
//! updates happen after the registry lock is released and are best effort;
//! the registry tables are the source of truth.

use crate::directory::PlayerDirectory;
use crate::error::{MatchmakingError, Result};
use crate::matches::instance::MatchInstance;
use crate::types::{
    ActionId, MatchId, MatchOutcome, MatchType, PlayerId, QueueTicket,
};
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct RegistryInner {
    active: HashMap<MatchId, MatchInstance>,
    history: Vec<MatchInstance>,
}

/// Registry statistics for monitoring
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistryStats {
    pub active_matches: usize,
    pub finished_matches: usize,
    pub cancelled_matches: usize,
}

/// Owns all matches and serializes their lifecycle transitions
pub struct MatchRegistry {
    inner: Mutex<RegistryInner>,
    directory: Arc<dyn PlayerDirectory>,
}

impl MatchRegistry {
    pub fn new(directory: Arc<dyn PlayerDirectory>) -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
            directory,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, RegistryInner>> {
        self.inner.lock().map_err(|_| {
            MatchmakingError::InternalError {
                message: "Failed to acquire match registry lock".to_string(),
            }
            .into()
        })
    }

    /// Create a match from a full ticket group pulled out of a queue.
    ///
    /// The new match starts in `Starting`. Each participant's directory
    /// reference is pointed at the match and their ticket reference cleared;
    /// failures there are logged and do not undo the creation.
    pub fn create_from_tickets(
        &self,
        match_type: MatchType,
        tickets: &[QueueTicket],
    ) -> Result<MatchId> {
        let players: Vec<PlayerId> = tickets.iter().map(|t| t.player_id.clone()).collect();
        self.create_internal(match_type, players)
    }

    /// Create a match directly from a player list (admin path, bypasses queues)
    pub fn create_admin(&self, match_type: MatchType, players: Vec<PlayerId>) -> Result<MatchId> {
        if players.is_empty() {
            return Err(MatchmakingError::InvalidInput {
                reason: "Cannot create a match with no players".to_string(),
            }
            .into());
        }
        self.create_internal(match_type, players)
    }

    fn create_internal(&self, match_type: MatchType, players: Vec<PlayerId>) -> Result<MatchId> {
        let instance = MatchInstance::new(match_type, players.clone(), current_timestamp());
        let match_id = instance.id();

        {
            let mut inner = self.lock()?;
            inner.active.insert(match_id, instance);
        }

        for player_id in &players {
            if let Err(e) = self.directory.set_current_match(player_id, Some(match_id)) {
                warn!("Failed to set current match for player {}: {}", player_id, e);
            }
            if let Err(e) = self.directory.set_current_ticket(player_id, None) {
                warn!("Failed to clear ticket for player {}: {}", player_id, e);
            }
        }

        info!(
            "Created {} match {} with players {:?}",
            match_type, match_id, players
        );
        Ok(match_id)
    }

    /// Transition a match from `Starting` to `Active`
    pub fn activate(&self, match_id: MatchId) -> Result<()> {
        let mut inner = self.lock()?;
        let instance = Self::active_mut(&mut inner, match_id)?;
        instance.activate()?;
        debug!("Match {} is now active", match_id);
        Ok(())
    }

    /// Append one action to a live match's log
    pub fn log_action(
        &self,
        match_id: MatchId,
        player_id: &PlayerId,
        action_type: String,
        payload: serde_json::Value,
    ) -> Result<ActionId> {
        let mut inner = self.lock()?;
        let instance = Self::active_mut(&mut inner, match_id)?;
        instance.record_action(player_id, action_type, payload, current_timestamp())
    }

    /// Mark a participant as surrendered; the match keeps running
    pub fn surrender(
        &self,
        match_id: MatchId,
        player_id: &PlayerId,
        reason: Option<String>,
    ) -> Result<()> {
        let mut inner = self.lock()?;
        let instance = Self::active_mut(&mut inner, match_id)?;
        instance.record_surrender(player_id, reason, current_timestamp())?;
        info!("Player {} surrendered in match {}", player_id, match_id);
        Ok(())
    }

    /// Conclude a match with an explicit result and move it to history.
    ///
    /// An invalid outcome leaves the match active and unchanged.
    pub fn finish(&self, match_id: MatchId, outcome: &MatchOutcome) -> Result<()> {
        let players = {
            let mut inner = self.lock()?;
            let mut instance = Self::take_active(&mut inner, match_id)?;
            if let Err(e) = instance.finish(outcome, current_timestamp()) {
                inner.active.insert(match_id, instance);
                return Err(e);
            }
            let players = instance.players().to_vec();
            inner.history.push(instance);
            players
        };

        self.release_players(&players);
        info!("Match {} finished", match_id);
        Ok(())
    }

    /// Conclude a match without a result and move it to history
    pub fn cancel(&self, match_id: MatchId, reason: &str) -> Result<()> {
        let players = {
            let mut inner = self.lock()?;
            let mut instance = Self::take_active(&mut inner, match_id)?;
            instance.cancel(reason.to_string(), current_timestamp());
            let players = instance.players().to_vec();
            inner.history.push(instance);
            players
        };

        self.release_players(&players);
        info!("Match {} cancelled: {}", match_id, reason);
        Ok(())
    }

    /// Cancel every live match that has outlived its time budget at `now`.
    ///
    /// Returns the cancelled match IDs. Taking `now` as a parameter keeps the
    /// sweep deterministic under simulated time.
    pub fn cancel_expired(&self, now: DateTime<Utc>) -> Result<Vec<MatchId>> {
        let (expired, released) = {
            let mut inner = self.lock()?;
            let expired: Vec<MatchId> = inner
                .active
                .values()
                .filter(|m| m.is_expired(now))
                .map(|m| m.id())
                .collect();

            let mut released = Vec::new();
            for match_id in &expired {
                if let Some(mut instance) = inner.active.remove(match_id) {
                    instance.cancel("timeout".to_string(), now);
                    released.extend(instance.players().iter().cloned());
                    inner.history.push(instance);
                }
            }
            (expired, released)
        };

        self.release_players(&released);
        for match_id in &expired {
            info!("Match {} cancelled: exceeded time budget", match_id);
        }
        Ok(expired)
    }

    /// Look up a match in the active table or history
    pub fn get(&self, match_id: MatchId) -> Result<MatchInstance> {
        let inner = self.lock()?;
        if let Some(instance) = inner.active.get(&match_id) {
            return Ok(instance.clone());
        }
        inner
            .history
            .iter()
            .find(|m| m.id() == match_id)
            .cloned()
            .ok_or_else(|| MatchmakingError::MatchNotFound { match_id: match_id.to_string() }.into())
    }

    /// All live matches
    pub fn list_active(&self) -> Result<Vec<MatchInstance>> {
        let inner = self.lock()?;
        Ok(inner.active.values().cloned().collect())
    }

    /// All concluded matches in conclusion order
    pub fn list_history(&self) -> Result<Vec<MatchInstance>> {
        let inner = self.lock()?;
        Ok(inner.history.clone())
    }

    /// Every match, live or concluded, this player took part in
    pub fn list_by_player(&self, player_id: &PlayerId) -> Result<Vec<MatchInstance>> {
        let inner = self.lock()?;
        let mut matches: Vec<MatchInstance> = inner
            .active
            .values()
            .filter(|m| m.is_participant(player_id))
            .cloned()
            .collect();
        matches.extend(
            inner
                .history
                .iter()
                .filter(|m| m.is_participant(player_id))
                .cloned(),
        );
        Ok(matches)
    }

    /// Drop all concluded matches; returns how many were removed
    pub fn clear_history(&self) -> Result<usize> {
        let mut inner = self.lock()?;
        let removed = inner.history.len();
        inner.history.clear();
        info!("Cleared {} matches from history", removed);
        Ok(removed)
    }

    pub fn stats(&self) -> Result<RegistryStats> {
        use crate::types::MatchStatus;
        let inner = self.lock()?;
        Ok(RegistryStats {
            active_matches: inner.active.len(),
            finished_matches: inner
                .history
                .iter()
                .filter(|m| m.status() == MatchStatus::Finished)
                .count(),
            cancelled_matches: inner
                .history
                .iter()
                .filter(|m| m.status() == MatchStatus::Cancelled)
                .count(),
        })
    }

    fn active_mut(
        inner: &mut RegistryInner,
        match_id: MatchId,
    ) -> Result<&mut MatchInstance> {
        let in_history = inner.history.iter().any(|m| m.id() == match_id);
        match inner.active.get_mut(&match_id) {
            Some(instance) => Ok(instance),
            None if in_history => Err(MatchmakingError::MatchNotActive { match_id: match_id.to_string() }.into()),
            None => Err(MatchmakingError::MatchNotFound { match_id: match_id.to_string() }.into()),
        }
    }

    fn take_active(inner: &mut RegistryInner, match_id: MatchId) -> Result<MatchInstance> {
        if let Some(instance) = inner.active.remove(&match_id) {
            Ok(instance)
        } else if inner.history.iter().any(|m| m.id() == match_id) {
            Err(MatchmakingError::MatchNotActive { match_id: match_id.to_string() }.into())
        } else {
            Err(MatchmakingError::MatchNotFound { match_id: match_id.to_string() }.into())
        }
    }

    fn release_players(&self, players: &[PlayerId]) {
        for player_id in players {
            if let Err(e) = self.directory.set_current_match(player_id, None) {
                warn!(
                    "Failed to clear current match for player {}: {}",
                    player_id, e
                );
            }
        }
    }

    /// Clock advanced by `seconds` for simulated-time sweep tests
    #[cfg(test)]
    pub(crate) fn simulated_now(seconds: i64) -> DateTime<Utc> {
        current_timestamp() + chrono::Duration::seconds(seconds)
    }
}
