//! Ticket queues and the periodic matcher
//!
//! This module holds the per-match-type ticket queues with their admission
//! rules, and the matcher that converts compatible ticket groups into matches.

pub mod matcher;
pub mod store;

pub use matcher::{Matcher, MatcherStats};
pub use store::QueueStore;
