//! Starpath - Athlete Progression Engine
//!
//! A self-contained progression engine for a sports training platform:
//! XP awards with a compounding level curve, rank transitions, daily streak
//! tracking with milestone bonuses, a parallel sport-specific "Star Path"
//! attribute track, and workout-verification XP crediting, persisted in
//! SQLite.

pub mod auth;
pub mod progression;
pub mod starpath;
pub mod storage;
pub mod workouts;

// Re-export commonly used types
pub use auth::capability::{Actor, Role};
pub use progression::engine::ProgressionEngine;
pub use progression::milestones::StreakMilestones;
pub use starpath::service::StarPathService;
pub use storage::Database;
pub use workouts::verification::WorkoutVerificationService;
