//! Periodic timeout sweep over live matches
//!
//! The sweeper runs on a fixed interval and cancels matches that have
//! outlived their match type's wall-clock budget. The actual state change
//! lives in `MatchRegistry::cancel_expired`; the sweeper supplies the clock
//! and the logging.

use crate::error::Result;
use crate::matches::registry::MatchRegistry;
use crate::utils::current_timestamp;
use std::sync::Arc;
use tracing::{debug, info};

/// Cancels over-budget matches on each pass
pub struct TimeoutSweeper {
    registry: Arc<MatchRegistry>,
}

impl TimeoutSweeper {
    pub fn new(registry: Arc<MatchRegistry>) -> Self {
        Self { registry }
    }

    /// Run one sweep; returns how many matches were cancelled
    pub fn run_pass(&self) -> Result<usize> {
        let cancelled = self.registry.cancel_expired(current_timestamp())?;
        if cancelled.is_empty() {
            debug!("Timeout sweep found no expired matches");
        } else {
            info!("Timeout sweep cancelled {} expired matches", cancelled.len());
        }
        Ok(cancelled.len())
    }
}
