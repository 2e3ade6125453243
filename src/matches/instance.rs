//! Single match state and transitions
//!
//! A `MatchInstance` tracks one match from formation to conclusion: its
//! participants, lifecycle status, ordered action log, and final result sets.
//! All transition methods validate the current status and return errors for
//! illegal moves; the registry serializes calls so the instance itself holds
//! no locks.

use crate::error::{MatchmakingError, Result};
use crate::types::{
    ActionId, GameAction, MatchId, MatchOutcome, MatchStatus, MatchType, PlayerId,
};
use crate::utils::{generate_action_id, generate_match_id};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One match from formation to conclusion
#[derive(Debug, Clone, Serialize)]
pub struct MatchInstance {
    id: MatchId,
    match_type: MatchType,
    players: Vec<PlayerId>,
    status: MatchStatus,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    actions: Vec<GameAction>,
    winners: Vec<PlayerId>,
    losers: Vec<PlayerId>,
    surrendered: Vec<PlayerId>,
    draw: Vec<PlayerId>,
    cancelled: Vec<PlayerId>,
    cancel_reason: Option<String>,
}

impl MatchInstance {
    /// Create a new match in the `Starting` state
    pub fn new(match_type: MatchType, players: Vec<PlayerId>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: generate_match_id(),
            match_type,
            players,
            status: MatchStatus::Starting,
            started_at,
            ended_at: None,
            actions: Vec::new(),
            winners: Vec::new(),
            losers: Vec::new(),
            surrendered: Vec::new(),
            draw: Vec::new(),
            cancelled: Vec::new(),
            cancel_reason: None,
        }
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn actions(&self) -> &[GameAction] {
        &self.actions
    }

    pub fn winners(&self) -> &[PlayerId] {
        &self.winners
    }

    pub fn losers(&self) -> &[PlayerId] {
        &self.losers
    }

    pub fn surrendered(&self) -> &[PlayerId] {
        &self.surrendered
    }

    pub fn draw(&self) -> &[PlayerId] {
        &self.draw
    }

    pub fn cancelled(&self) -> &[PlayerId] {
        &self.cancelled
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    pub fn is_participant(&self, player_id: &PlayerId) -> bool {
        self.players.contains(player_id)
    }

    /// Whether the match has outlived its type's wall-clock budget at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        let budget = self.match_type.time_budget().as_secs() as i64;
        (now - self.started_at).num_seconds() > budget
    }

    /// Transition from `Starting` to `Active` when gameplay begins
    pub fn activate(&mut self) -> Result<()> {
        if self.status != MatchStatus::Starting {
            return Err(MatchmakingError::InvalidInput {
                reason: format!(
                    "Match {} cannot start from status {}",
                    self.id, self.status
                ),
            }
            .into());
        }
        self.status = MatchStatus::Active;
        Ok(())
    }

    /// Append one action to the ordered log
    pub fn record_action(
        &mut self,
        player_id: &PlayerId,
        action_type: String,
        payload: serde_json::Value,
        timestamp: DateTime<Utc>,
    ) -> Result<ActionId> {
        if !self.is_participant(player_id) {
            return Err(MatchmakingError::PlayerNotInMatch {
                player_id: player_id.clone(),
                match_id: self.id.to_string(),
            }
            .into());
        }

        let action = GameAction {
            id: generate_action_id(),
            player_id: player_id.clone(),
            action_type,
            payload,
            timestamp,
        };
        let action_id = action.id;
        self.actions.push(action);
        Ok(action_id)
    }

    /// Mark a participant as surrendered; repeat surrenders are no-ops
    pub fn record_surrender(
        &mut self,
        player_id: &PlayerId,
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        if !self.is_participant(player_id) {
            return Err(MatchmakingError::PlayerNotInMatch {
                player_id: player_id.clone(),
                match_id: self.id.to_string(),
            }
            .into());
        }
        if self.surrendered.contains(player_id) {
            return Ok(());
        }

        self.surrendered.push(player_id.clone());
        let payload = match reason {
            Some(reason) => serde_json::json!({ "reason": reason }),
            None => serde_json::json!({}),
        };
        let action = GameAction {
            id: generate_action_id(),
            player_id: player_id.clone(),
            action_type: "surrender".to_string(),
            payload,
            timestamp,
        };
        self.actions.push(action);
        Ok(())
    }

    /// Conclude with an explicit result; surrender history is merged into the
    /// outcome's surrendered set.
    ///
    /// The outcome is validated before anything is committed: every listed
    /// player must be a participant, and no player may appear in more than
    /// one result set.
    pub fn finish(&mut self, outcome: &MatchOutcome, ended_at: DateTime<Utc>) -> Result<()> {
        self.validate_outcome(outcome)?;
        self.status = MatchStatus::Finished;
        self.ended_at = Some(ended_at);
        self.winners = dedup(&outcome.winners);
        self.losers = dedup(&outcome.losers);
        self.draw = dedup(&outcome.draw);
        for player_id in &outcome.surrendered {
            if !self.surrendered.contains(player_id) {
                self.surrendered.push(player_id.clone());
            }
        }
        Ok(())
    }

    /// Conclude without a result; every participant lands in the cancelled set
    pub fn cancel(&mut self, reason: String, ended_at: DateTime<Utc>) {
        self.status = MatchStatus::Cancelled;
        self.ended_at = Some(ended_at);
        self.cancelled = self.players.clone();
        self.cancel_reason = Some(reason);
    }

    fn validate_outcome(&self, outcome: &MatchOutcome) -> Result<()> {
        let sets: [(&str, &[PlayerId]); 4] = [
            ("winners", &outcome.winners),
            ("losers", &outcome.losers),
            ("surrendered", &outcome.surrendered),
            ("draw", &outcome.draw),
        ];

        let mut seen: Vec<&PlayerId> = Vec::new();
        for (name, set) in sets {
            for player_id in set {
                if !self.is_participant(player_id) {
                    return Err(MatchmakingError::InvalidInput {
                        reason: format!(
                            "Result set '{}' names non-participant '{}'",
                            name, player_id
                        ),
                    }
                    .into());
                }
                if seen.contains(&player_id) {
                    return Err(MatchmakingError::InvalidInput {
                        reason: format!(
                            "Player '{}' appears in more than one result set",
                            player_id
                        ),
                    }
                    .into());
                }
            }
            seen.extend(set.iter());
        }
        Ok(())
    }
}

fn dedup(players: &[PlayerId]) -> Vec<PlayerId> {
    let mut out: Vec<PlayerId> = Vec::with_capacity(players.len());
    for player_id in players {
        if !out.contains(player_id) {
            out.push(player_id.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::current_timestamp;

    fn new_match() -> MatchInstance {
        MatchInstance::new(
            MatchType::OneVsOne,
            vec!["p1".to_string(), "p2".to_string()],
            current_timestamp(),
        )
    }

    #[test]
    fn test_new_match_is_starting() {
        let instance = new_match();
        assert_eq!(instance.status(), MatchStatus::Starting);
        assert_eq!(instance.players().len(), 2);
        assert!(instance.ended_at().is_none());
    }

    #[test]
    fn test_activate_from_starting_only() {
        let mut instance = new_match();
        assert!(instance.activate().is_ok());
        assert_eq!(instance.status(), MatchStatus::Active);
        assert!(instance.activate().is_err());
    }

    #[test]
    fn test_record_action_rejects_outsiders() {
        let mut instance = new_match();
        let result = instance.record_action(
            &"intruder".to_string(),
            "move".to_string(),
            serde_json::json!({}),
            current_timestamp(),
        );
        assert!(result.is_err());
        assert!(instance.actions().is_empty());
    }

    #[test]
    fn test_actions_preserve_order() {
        let mut instance = new_match();
        let p1 = "p1".to_string();
        for i in 0..3 {
            instance
                .record_action(
                    &p1,
                    "move".to_string(),
                    serde_json::json!({ "seq": i }),
                    current_timestamp(),
                )
                .unwrap();
        }
        let seqs: Vec<i64> = instance
            .actions()
            .iter()
            .map(|a| a.payload["seq"].as_i64().unwrap())
            .collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn test_surrender_is_idempotent() {
        let mut instance = new_match();
        let p1 = "p1".to_string();
        instance
            .record_surrender(&p1, Some("rage quit".to_string()), current_timestamp())
            .unwrap();
        instance
            .record_surrender(&p1, None, current_timestamp())
            .unwrap();

        assert_eq!(instance.surrendered(), &[p1]);
        assert_eq!(instance.actions().len(), 1);
        assert_eq!(instance.actions()[0].action_type, "surrender");
    }

    #[test]
    fn test_finish_merges_surrender_history() {
        let mut instance = new_match();
        let p2 = "p2".to_string();
        instance
            .record_surrender(&p2, None, current_timestamp())
            .unwrap();

        let outcome = MatchOutcome {
            winners: vec!["p1".to_string()],
            losers: vec![p2.clone()],
            surrendered: vec![],
            draw: vec![],
        };
        instance.finish(&outcome, current_timestamp()).unwrap();

        assert_eq!(instance.status(), MatchStatus::Finished);
        assert_eq!(instance.winners(), &["p1".to_string()]);
        assert_eq!(instance.surrendered(), &[p2]);
        assert!(instance.ended_at().is_some());
    }

    #[test]
    fn test_cancel_records_reason_and_fills_cancelled_set() {
        let mut instance = new_match();
        instance.cancel("timeout".to_string(), current_timestamp());
        assert_eq!(instance.status(), MatchStatus::Cancelled);
        assert_eq!(instance.cancel_reason(), Some("timeout"));
        assert_eq!(
            instance.cancelled(),
            &["p1".to_string(), "p2".to_string()]
        );
        assert!(instance.winners().is_empty());
    }

    #[test]
    fn test_finish_leaves_cancelled_set_empty() {
        let mut instance = new_match();
        let outcome = MatchOutcome {
            winners: vec!["p1".to_string()],
            losers: vec!["p2".to_string()],
            ..Default::default()
        };
        instance.finish(&outcome, current_timestamp()).unwrap();
        assert!(instance.cancelled().is_empty());
    }

    #[test]
    fn test_finish_rejects_player_in_two_result_sets() {
        let mut instance = new_match();
        let outcome = MatchOutcome {
            winners: vec!["p1".to_string()],
            losers: vec!["p1".to_string(), "p2".to_string()],
            ..Default::default()
        };
        let err = instance
            .finish(&outcome, current_timestamp())
            .unwrap_err();
        let err = err.downcast::<MatchmakingError>().unwrap();
        assert!(matches!(err, MatchmakingError::InvalidInput { .. }));

        // Nothing was committed
        assert_eq!(instance.status(), MatchStatus::Starting);
        assert!(instance.winners().is_empty());
        assert!(instance.ended_at().is_none());
    }

    #[test]
    fn test_finish_rejects_non_participant_result() {
        let mut instance = new_match();
        let outcome = MatchOutcome {
            winners: vec!["intruder".to_string()],
            losers: vec!["p2".to_string()],
            ..Default::default()
        };
        let err = instance
            .finish(&outcome, current_timestamp())
            .unwrap_err();
        let err = err.downcast::<MatchmakingError>().unwrap();
        assert!(matches!(err, MatchmakingError::InvalidInput { .. }));
        assert_eq!(instance.status(), MatchStatus::Starting);
    }

    #[test]
    fn test_expiry_uses_type_budget() {
        let started = current_timestamp() - chrono::Duration::seconds(301);
        let instance = MatchInstance::new(
            MatchType::OneVsOne,
            vec!["p1".to_string(), "p2".to_string()],
            started,
        );
        assert!(instance.is_expired(current_timestamp()));

        let fresh = new_match();
        assert!(!fresh.is_expired(current_timestamp()));
    }

    #[test]
    fn test_terminal_matches_never_expire() {
        let started = current_timestamp() - chrono::Duration::seconds(9999);
        let mut instance = MatchInstance::new(
            MatchType::OneVsOne,
            vec!["p1".to_string(), "p2".to_string()],
            started,
        );
        instance.cancel("timeout".to_string(), current_timestamp());
        assert!(!instance.is_expired(current_timestamp()));
    }
}
