//! Runtime-adjustable matchmaking tuning constants
//!
//! These knobs govern the time-decaying MMR threshold. They can be replaced at
//! runtime through the admin API and take effect on the next matcher tick.

use crate::error::MatchmakingError;
use crate::types::Mmr;
use serde::{Deserialize, Serialize};

/// Tuning constants for the threshold-growth policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchmakingTuning {
    /// Maximum tolerated rating gap while a ticket is within the grace period
    pub base_threshold: Mmr,
    /// Grace period in seconds; each full multiple beyond the first widens the threshold
    pub threshold_raise_seconds: u64,
    /// Fractional increment of the base threshold added per elapsed grace period
    pub threshold_raise_step: f64,
}

impl Default for MatchmakingTuning {
    fn default() -> Self {
        Self {
            base_threshold: 25,
            threshold_raise_seconds: 10,
            threshold_raise_step: 0.1,
        }
    }
}

impl MatchmakingTuning {
    /// Validate tuning values
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.base_threshold <= 0 {
            return Err(MatchmakingError::ConfigurationError {
                message: "base_threshold must be positive".to_string(),
            }
            .into());
        }
        if self.threshold_raise_seconds == 0 {
            return Err(MatchmakingError::ConfigurationError {
                message: "threshold_raise_seconds must be greater than 0".to_string(),
            }
            .into());
        }
        if self.threshold_raise_step < 0.0 {
            return Err(MatchmakingError::ConfigurationError {
                message: "threshold_raise_step must be non-negative".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Compute the current MMR threshold for a ticket that has waited `wait_seconds`.
    ///
    /// Within the grace period the threshold equals the base. Beyond it, each
    /// full multiple of the grace period adds `threshold_raise_step` of the
    /// base. The raw product is truncated to an integer once, at the end; the
    /// same rule is used on every read path (matcher, status, snapshot).
    pub fn threshold_for_wait(&self, wait_seconds: u64) -> Mmr {
        if wait_seconds <= self.threshold_raise_seconds {
            return self.base_threshold;
        }

        let multiplier = (wait_seconds / self.threshold_raise_seconds) as f64;
        let raw = self.base_threshold as f64 * (1.0 + self.threshold_raise_step * multiplier);
        raw.trunc() as Mmr
    }
}
