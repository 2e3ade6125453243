//! Match registry and lifecycle management
//!
//! This module owns active matches and the append-only history of concluded
//! ones: the match state machine, the registry that serializes all lifecycle
//! transitions, and the sweeper that cancels over-budget matches.

pub mod instance;
pub mod registry;
pub mod sweeper;

pub use instance::MatchInstance;
pub use registry::{MatchRegistry, RegistryStats};
pub use sweeper::TimeoutSweeper;
