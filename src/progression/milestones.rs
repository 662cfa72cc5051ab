//! Streak milestone bonus table.

/// Read-only streak milestone table, injected into the engine at
/// construction. A bonus pays out exactly when the updated streak count
/// lands on an entry; there is no modular recurrence, so streaks past the
/// last entry earn nothing extra.
#[derive(Debug, Clone)]
pub struct StreakMilestones {
    entries: Vec<(u32, i64)>,
}

impl StreakMilestones {
    /// Build a table from (streak_days, bonus_xp) pairs.
    pub fn new(mut entries: Vec<(u32, i64)>) -> Self {
        entries.sort_by_key(|(days, _)| *days);
        entries.dedup_by_key(|(days, _)| *days);
        Self { entries }
    }

    /// Bonus XP for landing exactly on `streak_days`, if any.
    pub fn bonus_for(&self, streak_days: u32) -> Option<i64> {
        self.entries
            .iter()
            .find(|(days, _)| *days == streak_days)
            .map(|(_, bonus)| *bonus)
    }

    /// The configured milestone days, ascending.
    pub fn days(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|(days, _)| *days)
    }
}

impl Default for StreakMilestones {
    fn default() -> Self {
        Self::new(vec![(3, 50), (7, 100), (14, 200), (30, 500)])
    }
}
