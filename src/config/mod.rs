//! Configuration management for the arena-matchmaker service
//!
//! This module handles all configuration loading from environment variables,
//! config files, validation, and default values for the matchmaking engine.

pub mod app;
pub mod tuning;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, MatchmakingSettings, ServiceSettings};
pub use tuning::MatchmakingTuning;
