//! Error types for the matchmaking engine
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Player not found: {player_id}")]
    PlayerNotFound { player_id: String },

    #[error("Match not found: {match_id}")]
    MatchNotFound { match_id: String },

    #[error("Player is not in any queue: {player_id}")]
    NotQueued { player_id: String },

    #[error("Player is already in queue: {player_id}")]
    AlreadyQueued { player_id: String },

    #[error("Player is already in a match: {player_id}")]
    AlreadyInMatch { player_id: String },

    #[error("Match is not active: {match_id}")]
    MatchNotActive { match_id: String },

    #[error("Player {player_id} is not a participant of match {match_id}")]
    PlayerNotInMatch {
        player_id: String,
        match_id: String,
    },

    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl MatchmakingError {
    /// Stable machine-readable kind for API consumers
    pub fn kind(&self) -> &'static str {
        match self {
            MatchmakingError::InvalidInput { .. } => "invalid_input",
            MatchmakingError::PlayerNotFound { .. } => "player_not_found",
            MatchmakingError::MatchNotFound { .. } => "match_not_found",
            MatchmakingError::NotQueued { .. } => "not_queued",
            MatchmakingError::AlreadyQueued { .. } => "already_queued",
            MatchmakingError::AlreadyInMatch { .. } => "already_in_match",
            MatchmakingError::MatchNotActive { .. } => "match_not_active",
            MatchmakingError::PlayerNotInMatch { .. } => "player_not_in_match",
            MatchmakingError::Unauthorized { .. } => "unauthorized",
            MatchmakingError::ConfigurationError { .. } => "configuration_error",
            MatchmakingError::InternalError { .. } => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinct_for_conflicts() {
        let already_queued = MatchmakingError::AlreadyQueued {
            player_id: "p1".to_string(),
        };
        let already_in_match = MatchmakingError::AlreadyInMatch {
            player_id: "p1".to_string(),
        };
        assert_ne!(already_queued.kind(), already_in_match.kind());
    }

    #[test]
    fn test_error_messages_name_the_subject() {
        let err = MatchmakingError::MatchNotActive {
            match_id: "abc".to_string(),
        };
        assert!(err.to_string().contains("abc"));
    }
}
