//! Common types used throughout the matchmaking engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for players
pub type PlayerId = String;

/// Unique identifier for queue tickets
pub type TicketId = Uuid;

/// Unique identifier for matches
pub type MatchId = Uuid;

/// Unique identifier for game actions
pub type ActionId = Uuid;

/// Skill rating snapshot used for compatibility matching
pub type Mmr = i64;

/// Rating assigned to players the directory has no record for
pub const DEFAULT_MMR: Mmr = 1000;

/// Match type selecting required player count and time budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchType {
    OneVsOne,
    TwoVsTwo,
    ThreeVsThree,
    FourVsFour,
    FiveVsFive,
    SixVsSix,
}

impl MatchType {
    /// All match types in fixed enumeration order (matcher processing order)
    pub fn all() -> [MatchType; 6] {
        [
            MatchType::OneVsOne,
            MatchType::TwoVsTwo,
            MatchType::ThreeVsThree,
            MatchType::FourVsFour,
            MatchType::FiveVsFive,
            MatchType::SixVsSix,
        ]
    }

    /// Small-integer wire code for this match type
    pub fn code(&self) -> u8 {
        match self {
            MatchType::OneVsOne => 0,
            MatchType::TwoVsTwo => 1,
            MatchType::ThreeVsThree => 2,
            MatchType::FourVsFour => 3,
            MatchType::FiveVsFive => 4,
            MatchType::SixVsSix => 5,
        }
    }

    /// Parse a wire code into a match type
    pub fn from_code(code: u8) -> Option<MatchType> {
        MatchType::all().into_iter().find(|t| t.code() == code)
    }

    /// Number of players required to form a match of this type
    pub fn required_players(&self) -> usize {
        match self {
            MatchType::OneVsOne => 2,
            MatchType::TwoVsTwo => 4,
            MatchType::ThreeVsThree => 6,
            MatchType::FourVsFour => 8,
            MatchType::FiveVsFive => 10,
            MatchType::SixVsSix => 12,
        }
    }

    /// Wall-clock budget before the sweeper cancels a match of this type
    pub fn time_budget(&self) -> Duration {
        let secs = match self {
            MatchType::OneVsOne => 300,
            MatchType::TwoVsTwo => 600,
            MatchType::ThreeVsThree => 900,
            MatchType::FourVsFour => 1200,
            MatchType::FiveVsFive => 1500,
            MatchType::SixVsSix => 1800,
        };
        Duration::from_secs(secs)
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MatchType::OneVsOne => "1v1",
            MatchType::TwoVsTwo => "2v2",
            MatchType::ThreeVsThree => "3v3",
            MatchType::FourVsFour => "4v4",
            MatchType::FiveVsFive => "5v5",
            MatchType::SixVsSix => "6v6",
        };
        write!(f, "{}", name)
    }
}

/// One player's pending request to play one match type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueTicket {
    pub id: TicketId,
    pub match_type: MatchType,
    pub player_id: PlayerId,
    /// Registration time; wait-time priority and threshold growth key off this
    pub registered_at: DateTime<Utc>,
    /// Rating snapshot taken at registration, not live
    pub mmr: Mmr,
}

/// Status of a match through its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Match was just formed; participants are being handed off
    Starting,
    /// Gameplay in progress
    Active,
    /// Concluded with an explicit result (terminal)
    Finished,
    /// Concluded without a result (terminal)
    Cancelled,
}

impl MatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Finished | MatchStatus::Cancelled)
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MatchStatus::Starting => "starting",
            MatchStatus::Active => "active",
            MatchStatus::Finished => "finished",
            MatchStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

/// Immutable record of one event inside a match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameAction {
    pub id: ActionId,
    pub player_id: PlayerId,
    pub action_type: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Explicit result payload for finishing a match
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub winners: Vec<PlayerId>,
    pub losers: Vec<PlayerId>,
    #[serde(default)]
    pub surrendered: Vec<PlayerId>,
    #[serde(default)]
    pub draw: Vec<PlayerId>,
}

/// Read-only view of one ticket in a queue snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketView {
    pub ticket_id: TicketId,
    pub player_id: PlayerId,
    pub mmr: Mmr,
    pub wait_seconds: u64,
    pub mmr_threshold: Mmr,
}

/// Read-only view of one match-type queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueView {
    pub match_type: MatchType,
    pub players_required: usize,
    pub current_players: usize,
    pub tickets: Vec<TicketView>,
}

/// Read-only answer to a player queue-status query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerQueueStatus {
    pub in_queue: bool,
    pub queue_type: Option<MatchType>,
    pub queue_seconds: u64,
    pub current_mmr_threshold: Mmr,
    pub player_mmr: Mmr,
}

impl PlayerQueueStatus {
    /// Status returned for a player holding no ticket
    pub fn not_queued() -> Self {
        Self {
            in_queue: false,
            queue_type: None,
            queue_seconds: 0,
            current_mmr_threshold: 0,
            player_mmr: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_type_codes_round_trip() {
        for match_type in MatchType::all() {
            assert_eq!(MatchType::from_code(match_type.code()), Some(match_type));
        }
        assert_eq!(MatchType::from_code(6), None);
    }

    #[test]
    fn test_required_players_table() {
        assert_eq!(MatchType::OneVsOne.required_players(), 2);
        assert_eq!(MatchType::TwoVsTwo.required_players(), 4);
        assert_eq!(MatchType::SixVsSix.required_players(), 12);
    }

    #[test]
    fn test_time_budget_table() {
        assert_eq!(MatchType::OneVsOne.time_budget(), Duration::from_secs(300));
        assert_eq!(MatchType::SixVsSix.time_budget(), Duration::from_secs(1800));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!MatchStatus::Starting.is_terminal());
        assert!(!MatchStatus::Active.is_terminal());
        assert!(MatchStatus::Finished.is_terminal());
        assert!(MatchStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_match_type_display() {
        assert_eq!(MatchType::OneVsOne.to_string(), "1v1");
        assert_eq!(MatchType::ThreeVsThree.to_string(), "3v3");
    }
}
