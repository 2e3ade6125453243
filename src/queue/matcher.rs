//! Periodic match formation over the ticket queues
//!
//! Each pass holds the queue store lock for its whole duration so group
//! selection and removal are atomic with respect to joins and leaves. At most
//! one match per match type forms per pass; leftover tickets wait for the
//! next tick with their thresholds a little wider.

use crate::error::{MatchmakingError, Result};
use crate::matches::MatchRegistry;
use crate::metrics::MetricsCollector;
use crate::queue::store::QueueStore;
use crate::types::MatchType;
use crate::utils::elapsed_seconds;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Matcher statistics for monitoring
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatcherStats {
    pub passes: u64,
    pub matches_created: u64,
    pub tickets_consumed: u64,
}

/// Turns compatible ticket groups into matches, one pass at a time
pub struct Matcher {
    store: Arc<QueueStore>,
    registry: Arc<MatchRegistry>,
    stats: RwLock<MatcherStats>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Matcher {
    pub fn new(store: Arc<QueueStore>, registry: Arc<MatchRegistry>) -> Self {
        Self {
            store,
            registry,
            stats: RwLock::new(MatcherStats::default()),
            metrics: None,
        }
    }

    /// Create a matcher that records formation metrics
    pub fn with_metrics(
        store: Arc<QueueStore>,
        registry: Arc<MatchRegistry>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            store,
            registry,
            stats: RwLock::new(MatcherStats::default()),
            metrics: Some(metrics),
        }
    }

    /// Run one formation pass across all match types.
    ///
    /// Registry failures for one match type are logged and skipped; the
    /// tickets stay queued and the remaining types still get their turn.
    pub fn run_pass(&self) -> Result<usize> {
        let mut created = 0;
        let mut consumed = 0;

        {
            // Lock ordering is queue store, then registry.
            let mut inner = self.store.lock()?;
            for match_type in MatchType::all() {
                let Some(group) = inner.select_group(match_type) else {
                    continue;
                };

                match self.registry.create_from_tickets(match_type, &group) {
                    Ok(match_id) => {
                        inner.remove_group(match_type, &group);
                        created += 1;
                        consumed += group.len();
                        if let Some(metrics) = &self.metrics {
                            let waits: Vec<Duration> = group
                                .iter()
                                .map(|t| Duration::from_secs(elapsed_seconds(t.registered_at)))
                                .collect();
                            metrics.record_match_created(match_type, &waits);
                        }
                        info!(
                            "Formed {} match {} from {} tickets",
                            match_type,
                            match_id,
                            group.len()
                        );
                    }
                    Err(e) => {
                        warn!(
                            "Failed to create {} match, tickets stay queued: {}",
                            match_type, e
                        );
                    }
                }
            }
        }

        let mut stats = self.stats.write().map_err(|_| {
            MatchmakingError::InternalError {
                message: "Failed to acquire matcher stats lock".to_string(),
            }
        })?;
        stats.passes += 1;
        stats.matches_created += created as u64;
        stats.tickets_consumed += consumed as u64;
        drop(stats);

        if created > 0 {
            debug!("Matcher pass formed {} matches", created);
        }
        Ok(created)
    }

    pub fn stats(&self) -> Result<MatcherStats> {
        self.stats
            .read()
            .map(|s| s.clone())
            .map_err(|_| {
                MatchmakingError::InternalError {
                    message: "Failed to acquire matcher stats lock".to_string(),
                }
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tuning::MatchmakingTuning;
    use crate::directory::{InMemoryPlayerDirectory, PlayerDirectory};
    use crate::types::MatchStatus;

    fn setup() -> (Arc<InMemoryPlayerDirectory>, Arc<QueueStore>, Arc<MatchRegistry>, Matcher) {
        let directory = Arc::new(InMemoryPlayerDirectory::new());
        let store = Arc::new(QueueStore::new(
            directory.clone(),
            MatchmakingTuning::default(),
        ));
        let registry = Arc::new(MatchRegistry::new(directory.clone()));
        let matcher = Matcher::new(store.clone(), registry.clone());
        (directory, store, registry, matcher)
    }

    #[test]
    fn test_pass_forms_close_pair() {
        let (directory, store, registry, matcher) = setup();
        directory.register_player("p1", 1000).unwrap();
        directory.register_player("p2", 1015).unwrap();
        store.join(&"p1".to_string(), MatchType::OneVsOne).unwrap();
        store.join(&"p2".to_string(), MatchType::OneVsOne).unwrap();

        assert_eq!(matcher.run_pass().unwrap(), 1);
        assert_eq!(store.total_len().unwrap(), 0);

        let matches = registry.list_active().unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].status(), MatchStatus::Starting);
        assert_eq!(matches[0].players().len(), 2);
        assert_eq!(
            directory.current_match(&"p1".to_string()).unwrap(),
            Some(matches[0].id())
        );
    }

    #[test]
    fn test_pass_leaves_incompatible_tickets_queued() {
        let (directory, store, registry, matcher) = setup();
        directory.register_player("low", 1000).unwrap();
        directory.register_player("high", 1500).unwrap();
        store.join(&"low".to_string(), MatchType::OneVsOne).unwrap();
        store.join(&"high".to_string(), MatchType::OneVsOne).unwrap();

        assert_eq!(matcher.run_pass().unwrap(), 0);
        assert_eq!(store.total_len().unwrap(), 2);
        assert!(registry.list_active().unwrap().is_empty());
    }

    #[test]
    fn test_pass_covers_multiple_match_types() {
        let (directory, store, registry, matcher) = setup();
        for id in ["a", "b"] {
            directory.register_player(id, 1000).unwrap();
            store.join(&id.to_string(), MatchType::OneVsOne).unwrap();
        }
        for i in 0..4 {
            let id = format!("t{}", i);
            directory.register_player(id.clone(), 1000).unwrap();
            store.join(&id, MatchType::TwoVsTwo).unwrap();
        }

        assert_eq!(matcher.run_pass().unwrap(), 2);
        assert_eq!(registry.list_active().unwrap().len(), 2);

        let stats = matcher.stats().unwrap();
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.matches_created, 2);
        assert_eq!(stats.tickets_consumed, 6);
    }

    #[test]
    fn test_pass_forms_at_most_one_match_per_type() {
        let (directory, store, _registry, matcher) = setup();
        for i in 0..4 {
            let id = format!("p{}", i);
            directory.register_player(id.clone(), 1000).unwrap();
            store.join(&id, MatchType::OneVsOne).unwrap();
        }

        assert_eq!(matcher.run_pass().unwrap(), 1);
        assert_eq!(store.queue_len(MatchType::OneVsOne).unwrap(), 2);

        // Second pass picks up the remaining pair
        assert_eq!(matcher.run_pass().unwrap(), 1);
        assert_eq!(store.queue_len(MatchType::OneVsOne).unwrap(), 0);
    }

    #[test]
    fn test_widened_thresholds_eventually_admit() {
        let (directory, store, _registry, matcher) = setup();
        directory.register_player("low", 1000).unwrap();
        directory.register_player("high", 1035).unwrap();
        store.join(&"low".to_string(), MatchType::OneVsOne).unwrap();
        store.join(&"high".to_string(), MatchType::OneVsOne).unwrap();

        assert_eq!(matcher.run_pass().unwrap(), 0);

        // After 50 seconds both thresholds reach 25 * 1.5 = 37 >= 35
        store.backdate_ticket(&"low".to_string(), 50).unwrap();
        store.backdate_ticket(&"high".to_string(), 50).unwrap();
        assert_eq!(matcher.run_pass().unwrap(), 1);
    }
}
