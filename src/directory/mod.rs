//! Player directory interface and in-memory implementation
//!
//! The directory is the external system of record for player identity and
//! skill ratings. The core reads ratings and commitment state from it and
//! writes back the current-match / current-ticket references through dedicated
//! setters. Directory write failures after a committed core transition are
//! surfaced as warnings by callers, never rolled back.

use crate::error::{MatchmakingError, Result};
use crate::types::{MatchId, MatchType, Mmr, PlayerId, TicketId, DEFAULT_MMR};
use std::collections::HashMap;
use std::sync::RwLock;

/// Typed per-player reference fields the core keeps consistent
#[derive(Debug, Clone, Default)]
pub struct PlayerRef {
    pub current_match: Option<MatchId>,
    pub current_ticket: Option<TicketId>,
    pub ratings: HashMap<MatchType, Mmr>,
}

/// Read/write seam to the external player directory
pub trait PlayerDirectory: Send + Sync {
    /// Whether the directory knows this player
    fn player_exists(&self, player_id: &PlayerId) -> Result<bool>;

    /// Player's rating for one match type; defaults when unrated
    fn rating(&self, player_id: &PlayerId, match_type: MatchType) -> Result<Mmr>;

    /// Match the player is currently committed to, if any
    fn current_match(&self, player_id: &PlayerId) -> Result<Option<MatchId>>;

    /// Ticket the player currently holds, if any
    fn current_ticket(&self, player_id: &PlayerId) -> Result<Option<TicketId>>;

    /// Set or clear the player's current-match reference
    fn set_current_match(&self, player_id: &PlayerId, match_id: Option<MatchId>) -> Result<()>;

    /// Set or clear the player's current-ticket reference
    fn set_current_ticket(&self, player_id: &PlayerId, ticket_id: Option<TicketId>) -> Result<()>;
}

/// In-memory player directory used by the service and tests
#[derive(Debug, Default)]
pub struct InMemoryPlayerDirectory {
    players: RwLock<HashMap<PlayerId, PlayerRef>>,
}

impl InMemoryPlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a player with a flat rating across all match types
    pub fn register_player(&self, player_id: impl Into<PlayerId>, mmr: Mmr) -> Result<()> {
        let player_id = player_id.into();
        let mut players = self.write_lock()?;
        let entry = players.entry(player_id).or_default();
        for match_type in MatchType::all() {
            entry.ratings.insert(match_type, mmr);
        }
        Ok(())
    }

    /// Set a player's rating for one match type
    pub fn set_rating(
        &self,
        player_id: impl Into<PlayerId>,
        match_type: MatchType,
        mmr: Mmr,
    ) -> Result<()> {
        let mut players = self.write_lock()?;
        players
            .entry(player_id.into())
            .or_default()
            .ratings
            .insert(match_type, mmr);
        Ok(())
    }

    fn read_lock(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<PlayerId, PlayerRef>>> {
        self.players
            .read()
            .map_err(|_| {
                MatchmakingError::InternalError {
                    message: "Failed to acquire directory read lock".to_string(),
                }
                .into()
            })
    }

    fn write_lock(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<PlayerId, PlayerRef>>> {
        self.players
            .write()
            .map_err(|_| {
                MatchmakingError::InternalError {
                    message: "Failed to acquire directory write lock".to_string(),
                }
                .into()
            })
    }
}

impl PlayerDirectory for InMemoryPlayerDirectory {
    fn player_exists(&self, player_id: &PlayerId) -> Result<bool> {
        Ok(self.read_lock()?.contains_key(player_id))
    }

    fn rating(&self, player_id: &PlayerId, match_type: MatchType) -> Result<Mmr> {
        let players = self.read_lock()?;
        Ok(players
            .get(player_id)
            .and_then(|p| p.ratings.get(&match_type).copied())
            .unwrap_or(DEFAULT_MMR))
    }

    fn current_match(&self, player_id: &PlayerId) -> Result<Option<MatchId>> {
        Ok(self
            .read_lock()?
            .get(player_id)
            .and_then(|p| p.current_match))
    }

    fn current_ticket(&self, player_id: &PlayerId) -> Result<Option<TicketId>> {
        Ok(self
            .read_lock()?
            .get(player_id)
            .and_then(|p| p.current_ticket))
    }

    fn set_current_match(&self, player_id: &PlayerId, match_id: Option<MatchId>) -> Result<()> {
        let mut players = self.write_lock()?;
        players.entry(player_id.clone()).or_default().current_match = match_id;
        Ok(())
    }

    fn set_current_ticket(&self, player_id: &PlayerId, ticket_id: Option<TicketId>) -> Result<()> {
        let mut players = self.write_lock()?;
        players.entry(player_id.clone()).or_default().current_ticket = ticket_id;
        Ok(())
    }
}
