//! Queue store implementation and admission control
//!
//! The store owns every per-match-type ticket queue behind one exclusive lock.
//! Match formation has to remove tickets from possibly-overlapping views, so
//! the lock is scoped to the whole store, not per queue.

use crate::config::tuning::MatchmakingTuning;
use crate::directory::PlayerDirectory;
use crate::error::{MatchmakingError, Result};
use crate::types::{
    MatchType, Mmr, PlayerId, PlayerQueueStatus, QueueTicket, QueueView, TicketView,
};
use crate::utils::{current_timestamp, elapsed_seconds, generate_ticket_id};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Lock-guarded queue state; all mutation goes through [`QueueStore`]
pub(crate) struct QueueStoreInner {
    queues: HashMap<MatchType, Vec<QueueTicket>>,
    tuning: MatchmakingTuning,
}

impl QueueStoreInner {
    fn new(tuning: MatchmakingTuning) -> Self {
        let mut queues = HashMap::new();
        for match_type in MatchType::all() {
            queues.insert(match_type, Vec::new());
        }
        Self { queues, tuning }
    }

    fn find_ticket(&self, player_id: &PlayerId) -> Option<&QueueTicket> {
        self.queues
            .values()
            .flat_map(|tickets| tickets.iter())
            .find(|ticket| &ticket.player_id == player_id)
    }

    fn tickets(&self, match_type: MatchType) -> &[QueueTicket] {
        self.queues
            .get(&match_type)
            .map(|t| t.as_slice())
            .unwrap_or(&[])
    }

    /// Greedy group selection around the longest-waiting ticket.
    ///
    /// Returns the tickets to consume, or None when no full group exists.
    /// The queue itself is not modified; removal happens only after the
    /// registry has accepted the group.
    pub(crate) fn select_group(&self, match_type: MatchType) -> Option<Vec<QueueTicket>> {
        let required = match_type.required_players();
        let tickets = self.tickets(match_type);
        if tickets.len() < required {
            return None;
        }

        // Longest-waiting first; queue order is the only tie-break.
        let mut sorted: Vec<&QueueTicket> = tickets.iter().collect();
        sorted.sort_by(|a, b| a.registered_at.cmp(&b.registered_at));

        let pivot = sorted[0];
        let pivot_threshold = self.threshold_of(pivot);

        let mut group: Vec<QueueTicket> = Vec::with_capacity(required);
        for candidate in sorted {
            if group.len() >= required {
                break;
            }
            let gap = (pivot.mmr - candidate.mmr).abs();
            if gap <= pivot_threshold.max(self.threshold_of(candidate)) {
                group.push(candidate.clone());
            }
        }

        if group.len() >= required {
            group.truncate(required);
            Some(group)
        } else {
            None
        }
    }

    /// Remove exactly the given tickets from their queue
    pub(crate) fn remove_group(&mut self, match_type: MatchType, group: &[QueueTicket]) {
        if let Some(tickets) = self.queues.get_mut(&match_type) {
            tickets.retain(|ticket| !group.iter().any(|g| g.id == ticket.id));
        }
    }

    /// Current threshold for a ticket, derived from its wait time
    pub(crate) fn threshold_of(&self, ticket: &QueueTicket) -> Mmr {
        self.tuning
            .threshold_for_wait(elapsed_seconds(ticket.registered_at))
    }
}

/// In-memory store of outstanding queue tickets, one queue per match type
pub struct QueueStore {
    inner: Mutex<QueueStoreInner>,
    directory: Arc<dyn PlayerDirectory>,
}

impl QueueStore {
    pub fn new(directory: Arc<dyn PlayerDirectory>, tuning: MatchmakingTuning) -> Self {
        Self {
            inner: Mutex::new(QueueStoreInner::new(tuning)),
            directory,
        }
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, QueueStoreInner>> {
        self.inner.lock().map_err(|_| {
            MatchmakingError::InternalError {
                message: "Failed to acquire queue store lock".to_string(),
            }
            .into()
        })
    }

    /// Admit a player into the queue for one match type.
    ///
    /// Fails closed: no ticket is created when the player is unknown, already
    /// committed to a match, or already holds a ticket anywhere.
    pub fn join(&self, player_id: &PlayerId, match_type: MatchType) -> Result<QueueTicket> {
        if !self.directory.player_exists(player_id)? {
            return Err(MatchmakingError::PlayerNotFound {
                player_id: player_id.clone(),
            }
            .into());
        }

        if self.directory.current_match(player_id)?.is_some() {
            return Err(MatchmakingError::AlreadyInMatch {
                player_id: player_id.clone(),
            }
            .into());
        }

        // Rating snapshot is taken at admission time and never refreshed.
        let mmr = self.directory.rating(player_id, match_type)?;

        let ticket = {
            let mut inner = self.lock()?;
            if inner.find_ticket(player_id).is_some() {
                return Err(MatchmakingError::AlreadyQueued {
                    player_id: player_id.clone(),
                }
                .into());
            }

            let ticket = QueueTicket {
                id: generate_ticket_id(),
                match_type,
                player_id: player_id.clone(),
                registered_at: current_timestamp(),
                mmr,
            };

            inner
                .queues
                .get_mut(&match_type)
                .ok_or_else(|| MatchmakingError::InvalidInput {
                    reason: format!("Unknown match type: {}", match_type),
                })?
                .push(ticket.clone());
            ticket
        };

        // The ticket is committed; the directory reference is best-effort.
        if let Err(e) = self
            .directory
            .set_current_ticket(player_id, Some(ticket.id))
        {
            warn!(
                "Failed to record ticket reference for player '{}': {}",
                player_id, e
            );
        }

        info!(
            "Player '{}' joined {} queue with ticket {} (mmr: {})",
            player_id, match_type, ticket.id, mmr
        );
        Ok(ticket)
    }

    /// Remove a player's ticket, whatever queue it is in
    pub fn leave(&self, player_id: &PlayerId) -> Result<QueueTicket> {
        let removed = {
            let mut inner = self.lock()?;
            let mut removed = None;
            for tickets in inner.queues.values_mut() {
                if let Some(pos) = tickets.iter().position(|t| &t.player_id == player_id) {
                    removed = Some(tickets.remove(pos));
                    break;
                }
            }
            removed
        };

        let ticket = removed.ok_or_else(|| MatchmakingError::NotQueued {
            player_id: player_id.clone(),
        })?;

        if let Err(e) = self.directory.set_current_ticket(player_id, None) {
            warn!(
                "Failed to clear ticket reference for player '{}': {}",
                player_id, e
            );
        }

        info!(
            "Player '{}' left {} queue (ticket {})",
            player_id, ticket.match_type, ticket.id
        );
        Ok(ticket)
    }

    /// Read-only queue status for one player
    pub fn status_of(&self, player_id: &PlayerId) -> Result<PlayerQueueStatus> {
        let inner = self.lock()?;
        match inner.find_ticket(player_id) {
            Some(ticket) => Ok(PlayerQueueStatus {
                in_queue: true,
                queue_type: Some(ticket.match_type),
                queue_seconds: elapsed_seconds(ticket.registered_at),
                current_mmr_threshold: inner.threshold_of(ticket),
                player_mmr: ticket.mmr,
            }),
            None => Ok(PlayerQueueStatus::not_queued()),
        }
    }

    /// Read-only snapshot of every queue with live computed thresholds
    pub fn snapshot(&self) -> Result<Vec<QueueView>> {
        let inner = self.lock()?;
        let mut views = Vec::with_capacity(MatchType::all().len());
        for match_type in MatchType::all() {
            let tickets = inner
                .tickets(match_type)
                .iter()
                .map(|ticket| TicketView {
                    ticket_id: ticket.id,
                    player_id: ticket.player_id.clone(),
                    mmr: ticket.mmr,
                    wait_seconds: elapsed_seconds(ticket.registered_at),
                    mmr_threshold: inner.threshold_of(ticket),
                })
                .collect::<Vec<_>>();

            views.push(QueueView {
                match_type,
                players_required: match_type.required_players(),
                current_players: tickets.len(),
                tickets,
            });
        }
        Ok(views)
    }

    /// Drop every outstanding ticket (admin operation)
    pub fn clear(&self) -> Result<usize> {
        let dropped: Vec<QueueTicket> = {
            let mut inner = self.lock()?;
            inner
                .queues
                .values_mut()
                .flat_map(|tickets| tickets.drain(..))
                .collect()
        };

        for ticket in &dropped {
            if let Err(e) = self.directory.set_current_ticket(&ticket.player_id, None) {
                warn!(
                    "Failed to clear ticket reference for player '{}': {}",
                    ticket.player_id, e
                );
            }
        }

        if !dropped.is_empty() {
            info!("Cleared {} tickets from all queues", dropped.len());
        }
        Ok(dropped.len())
    }

    /// Number of outstanding tickets in one queue
    pub fn queue_len(&self, match_type: MatchType) -> Result<usize> {
        Ok(self.lock()?.tickets(match_type).len())
    }

    /// Total number of outstanding tickets across all queues
    pub fn total_len(&self) -> Result<usize> {
        Ok(self.lock()?.queues.values().map(|t| t.len()).sum())
    }

    /// Current tuning constants
    pub fn tuning(&self) -> Result<MatchmakingTuning> {
        Ok(self.lock()?.tuning)
    }

    /// Replace the tuning constants; takes effect on the next matcher pass
    pub fn set_tuning(&self, tuning: MatchmakingTuning) -> Result<()> {
        tuning.validate()?;
        let mut inner = self.lock()?;
        debug!(
            "Matchmaking tuning updated: base={}, grace={}s, step={}",
            tuning.base_threshold, tuning.threshold_raise_seconds, tuning.threshold_raise_step
        );
        inner.tuning = tuning;
        Ok(())
    }

    /// Backdate a ticket's registration so wait-dependent paths can be tested
    /// without sleeping
    #[cfg(test)]
    pub(crate) fn backdate_ticket(&self, player_id: &PlayerId, seconds: i64) -> Result<()> {
        let mut inner = self.lock()?;
        for tickets in inner.queues.values_mut() {
            if let Some(ticket) = tickets.iter_mut().find(|t| &t.player_id == player_id) {
                ticket.registered_at -= chrono::Duration::seconds(seconds);
                return Ok(());
            }
        }
        Err(MatchmakingError::NotQueued {
            player_id: player_id.clone(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryPlayerDirectory;
    use crate::utils::generate_match_id;

    fn create_test_store() -> (QueueStore, Arc<InMemoryPlayerDirectory>) {
        let directory = Arc::new(InMemoryPlayerDirectory::new());
        let store = QueueStore::new(directory.clone(), MatchmakingTuning::default());
        (store, directory)
    }

    #[test]
    fn test_join_creates_ticket_with_rating_snapshot() {
        let (store, directory) = create_test_store();
        directory.register_player("p1", 1234).unwrap();

        let ticket = store.join(&"p1".to_string(), MatchType::OneVsOne).unwrap();
        assert_eq!(ticket.player_id, "p1");
        assert_eq!(ticket.mmr, 1234);
        assert_eq!(store.queue_len(MatchType::OneVsOne).unwrap(), 1);

        // Directory now carries the ticket reference
        assert_eq!(
            directory.current_ticket(&"p1".to_string()).unwrap(),
            Some(ticket.id)
        );
    }

    #[test]
    fn test_join_unknown_player_fails() {
        let (store, _directory) = create_test_store();
        let err = store
            .join(&"ghost".to_string(), MatchType::OneVsOne)
            .unwrap_err();
        let err = err.downcast::<MatchmakingError>().unwrap();
        assert!(matches!(err, MatchmakingError::PlayerNotFound { .. }));
    }

    #[test]
    fn test_join_while_in_match_fails() {
        let (store, directory) = create_test_store();
        directory.register_player("p1", 1000).unwrap();
        directory
            .set_current_match(&"p1".to_string(), Some(generate_match_id()))
            .unwrap();

        let err = store
            .join(&"p1".to_string(), MatchType::OneVsOne)
            .unwrap_err();
        let err = err.downcast::<MatchmakingError>().unwrap();
        assert!(matches!(err, MatchmakingError::AlreadyInMatch { .. }));
        assert_eq!(store.total_len().unwrap(), 0);
    }

    #[test]
    fn test_join_twice_fails_across_queue_types() {
        let (store, directory) = create_test_store();
        directory.register_player("p1", 1000).unwrap();

        store.join(&"p1".to_string(), MatchType::OneVsOne).unwrap();
        let err = store
            .join(&"p1".to_string(), MatchType::TwoVsTwo)
            .unwrap_err();
        let err = err.downcast::<MatchmakingError>().unwrap();
        assert!(matches!(err, MatchmakingError::AlreadyQueued { .. }));

        // Failed join must not leave a second ticket anywhere
        assert_eq!(store.total_len().unwrap(), 1);
    }

    #[test]
    fn test_leave_removes_ticket_and_reference() {
        let (store, directory) = create_test_store();
        directory.register_player("p1", 1000).unwrap();

        store.join(&"p1".to_string(), MatchType::ThreeVsThree).unwrap();
        let ticket = store.leave(&"p1".to_string()).unwrap();
        assert_eq!(ticket.match_type, MatchType::ThreeVsThree);
        assert_eq!(store.total_len().unwrap(), 0);
        assert_eq!(directory.current_ticket(&"p1".to_string()).unwrap(), None);
    }

    #[test]
    fn test_leave_without_ticket_fails() {
        let (store, directory) = create_test_store();
        directory.register_player("p1", 1000).unwrap();

        let err = store.leave(&"p1".to_string()).unwrap_err();
        let err = err.downcast::<MatchmakingError>().unwrap();
        assert!(matches!(err, MatchmakingError::NotQueued { .. }));
    }

    #[test]
    fn test_status_reports_wait_and_threshold() {
        let (store, directory) = create_test_store();
        directory.register_player("p1", 1500).unwrap();
        store.join(&"p1".to_string(), MatchType::OneVsOne).unwrap();

        let status = store.status_of(&"p1".to_string()).unwrap();
        assert!(status.in_queue);
        assert_eq!(status.queue_type, Some(MatchType::OneVsOne));
        assert_eq!(status.player_mmr, 1500);
        assert_eq!(status.current_mmr_threshold, 25);

        let none = store.status_of(&"p2".to_string()).unwrap();
        assert!(!none.in_queue);
    }

    #[test]
    fn test_threshold_grows_past_grace_period() {
        let (store, directory) = create_test_store();
        directory.register_player("p1", 1500).unwrap();
        store.join(&"p1".to_string(), MatchType::OneVsOne).unwrap();

        store.backdate_ticket(&"p1".to_string(), 35).unwrap();
        let status = store.status_of(&"p1".to_string()).unwrap();
        // floor(35/10)=3 -> 25 * 1.3 = 32.5 -> 32
        assert_eq!(status.current_mmr_threshold, 32);
        assert!(status.current_mmr_threshold > 25);
    }

    #[test]
    fn test_snapshot_covers_all_match_types() {
        let (store, directory) = create_test_store();
        directory.register_player("p1", 1000).unwrap();
        store.join(&"p1".to_string(), MatchType::SixVsSix).unwrap();

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.len(), 6);

        let six = snapshot
            .iter()
            .find(|view| view.match_type == MatchType::SixVsSix)
            .unwrap();
        assert_eq!(six.current_players, 1);
        assert_eq!(six.players_required, 12);
        assert_eq!(six.tickets[0].player_id, "p1");
    }

    #[test]
    fn test_clear_drops_everything() {
        let (store, directory) = create_test_store();
        for i in 0..4 {
            let id = format!("p{}", i);
            directory.register_player(id.clone(), 1000).unwrap();
            store.join(&id, MatchType::TwoVsTwo).unwrap();
        }

        assert_eq!(store.clear().unwrap(), 4);
        assert_eq!(store.total_len().unwrap(), 0);
        assert_eq!(directory.current_ticket(&"p0".to_string()).unwrap(), None);
    }

    #[test]
    fn test_select_group_prefers_longest_waiting() {
        let (store, directory) = create_test_store();
        for (id, mmr) in [("a", 1000), ("b", 1010), ("c", 1005)] {
            directory.register_player(id, mmr).unwrap();
            store.join(&id.to_string(), MatchType::OneVsOne).unwrap();
        }
        // "a" has waited longest
        store.backdate_ticket(&"a".to_string(), 30).unwrap();
        store.backdate_ticket(&"b".to_string(), 20).unwrap();

        let inner = store.lock().unwrap();
        let group = inner.select_group(MatchType::OneVsOne).unwrap();
        assert_eq!(group.len(), 2);
        assert_eq!(group[0].player_id, "a");
        assert_eq!(group[1].player_id, "b");
    }

    #[test]
    fn test_select_group_rejects_wide_rating_gap() {
        let (store, directory) = create_test_store();
        directory.register_player("low", 1000).unwrap();
        directory.register_player("high", 1500).unwrap();
        store.join(&"low".to_string(), MatchType::OneVsOne).unwrap();
        store.join(&"high".to_string(), MatchType::OneVsOne).unwrap();

        let inner = store.lock().unwrap();
        assert!(inner.select_group(MatchType::OneVsOne).is_none());
    }

    #[test]
    fn test_select_group_requires_full_count() {
        let (store, directory) = create_test_store();
        directory.register_player("p1", 1000).unwrap();
        store.join(&"p1".to_string(), MatchType::OneVsOne).unwrap();

        let inner = store.lock().unwrap();
        assert!(inner.select_group(MatchType::OneVsOne).is_none());
    }

    #[test]
    fn test_tuning_update_changes_selection() {
        let (store, directory) = create_test_store();
        directory.register_player("low", 1000).unwrap();
        directory.register_player("high", 1100).unwrap();
        store.join(&"low".to_string(), MatchType::OneVsOne).unwrap();
        store.join(&"high".to_string(), MatchType::OneVsOne).unwrap();

        {
            let inner = store.lock().unwrap();
            assert!(inner.select_group(MatchType::OneVsOne).is_none());
        }

        let tuning = MatchmakingTuning {
            base_threshold: 200,
            ..MatchmakingTuning::default()
        };
        store.set_tuning(tuning).unwrap();

        let inner = store.lock().unwrap();
        assert!(inner.select_group(MatchType::OneVsOne).is_some());
    }
}
