//! Arena Matchmaker - Matchmaking engine for team arena games
//!
//! This crate provides skill-based queue matchmaking with time-decaying
//! rating thresholds, a full match lifecycle with action logging and
//! timeout enforcement, and health/metrics endpoints for operating the
//! service.

pub mod api;
pub mod config;
pub mod directory;
pub mod error;
pub mod matches;
pub mod metrics;
pub mod queue;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use api::MatchmakingApi;
pub use directory::{InMemoryPlayerDirectory, PlayerDirectory};
pub use matches::{MatchInstance, MatchRegistry, TimeoutSweeper};
pub use queue::{Matcher, QueueStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
