//! Utility functions for the matchmaking engine

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique ticket ID
pub fn generate_ticket_id() -> Uuid {
    Uuid::new_v4()
}

/// Generate a new unique match ID
pub fn generate_match_id() -> Uuid {
    Uuid::new_v4()
}

/// Generate a new unique action ID
pub fn generate_action_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Whole seconds elapsed since `since`, clamped at zero
pub fn elapsed_seconds(since: DateTime<Utc>) -> u64 {
    (current_timestamp() - since).num_seconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_generate_unique_ids() {
        assert_ne!(generate_ticket_id(), generate_ticket_id());
        assert_ne!(generate_match_id(), generate_match_id());
    }

    #[test]
    fn test_elapsed_seconds_clamps_future_timestamps() {
        let future = current_timestamp() + Duration::seconds(60);
        assert_eq!(elapsed_seconds(future), 0);
    }

    #[test]
    fn test_elapsed_seconds_counts_past() {
        let past = current_timestamp() - Duration::seconds(90);
        let elapsed = elapsed_seconds(past);
        assert!((89..=91).contains(&elapsed));
    }
}
