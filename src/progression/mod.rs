//! Player progression: XP awards, leveling, ranks, and streaks.

pub mod engine;
pub mod milestones;
pub mod types;
