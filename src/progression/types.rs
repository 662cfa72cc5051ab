//! Player progression type definitions: levels, ranks, XP awards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// XP required to advance from the given level to the next.
///
/// The requirement compounds by 20% per level: level 1 needs 100 XP,
/// level 2 needs 120, level 10 needs 515, and so on (floored).
pub fn xp_required_for_level(level: u32) -> i64 {
    (100.0 * 1.2f64.powi(level as i32 - 1)).floor() as i64
}

/// Coarse rank label derived deterministically from level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rank {
    Rookie,
    Prospect,
    RisingStar,
    AllStar,
    Mvp,
    Legend,
}

impl Rank {
    /// Map a level to its rank. Thresholds: 5, 10, 20, 30, 50.
    pub fn from_level(level: u32) -> Self {
        match level {
            0..=4 => Rank::Rookie,
            5..=9 => Rank::Prospect,
            10..=19 => Rank::RisingStar,
            20..=29 => Rank::AllStar,
            30..=49 => Rank::Mvp,
            _ => Rank::Legend,
        }
    }

    /// Get display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Rank::Rookie => "Rookie",
            Rank::Prospect => "Prospect",
            Rank::RisingStar => "Rising Star",
            Rank::AllStar => "All-Star",
            Rank::Mvp => "MVP",
            Rank::Legend => "Legend",
        }
    }

    /// Stable identifier used in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Rookie => "rookie",
            Rank::Prospect => "prospect",
            Rank::RisingStar => "rising_star",
            Rank::AllStar => "all_star",
            Rank::Mvp => "mvp",
            Rank::Legend => "legend",
        }
    }

    /// Parse the database identifier.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "rookie" => Some(Rank::Rookie),
            "prospect" => Some(Rank::Prospect),
            "rising_star" => Some(Rank::RisingStar),
            "all_star" => Some(Rank::AllStar),
            "mvp" => Some(Rank::Mvp),
            "legend" => Some(Rank::Legend),
            _ => None,
        }
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A validated XP award amount.
///
/// Construction fails outside 0..=1,000,000, so out-of-range input is
/// rejected at the boundary instead of corrupting stored totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct XpAmount(i64);

impl XpAmount {
    /// Largest single award accepted.
    pub const MAX: i64 = 1_000_000;

    /// Validate and wrap an award amount.
    pub fn new(amount: i64) -> Result<Self, InvalidXpAmount> {
        if (0..=Self::MAX).contains(&amount) {
            Ok(Self(amount))
        } else {
            Err(InvalidXpAmount(amount))
        }
    }

    /// Get the inner value.
    pub fn get(self) -> i64 {
        self.0
    }
}

/// Rejected XP award amount.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("XP amount {0} is outside the accepted 0..=1000000 range")]
pub struct InvalidXpAmount(pub i64);

/// Origin of an XP award, recorded in the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum XpSource {
    /// Streak milestone bonus
    StreakMilestone,
    /// Workout submitted for verification
    WorkoutSubmission,
    /// Star Path level-up reward
    StarLevelUp,
    /// Challenge completion
    Challenge,
    /// Daily login
    DailyLogin,
    /// Anything else (free-form)
    Other(String),
}

impl XpSource {
    /// Stable identifier used in the database.
    pub fn as_str(&self) -> &str {
        match self {
            XpSource::StreakMilestone => "streak_milestone",
            XpSource::WorkoutSubmission => "workout_submission",
            XpSource::StarLevelUp => "star_level_up",
            XpSource::Challenge => "challenge",
            XpSource::DailyLogin => "daily_login",
            XpSource::Other(s) => s,
        }
    }

    /// Parse the database identifier; unknown values round-trip as `Other`.
    pub fn from_str(s: &str) -> Self {
        match s {
            "streak_milestone" => XpSource::StreakMilestone,
            "workout_submission" => XpSource::WorkoutSubmission,
            "star_level_up" => XpSource::StarLevelUp,
            "challenge" => XpSource::Challenge,
            "daily_login" => XpSource::DailyLogin,
            other => XpSource::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for XpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One athlete's progression state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProgress {
    /// Athlete this record belongs to
    pub user_id: Uuid,
    /// Current level (unbounded upward)
    pub current_level: u32,
    /// XP accumulated toward the next level
    pub level_xp: i64,
    /// Threshold for the next level-up
    pub xp_to_next_level: i64,
    /// Lifetime XP
    pub total_xp: i64,
    /// Consecutive daily check-in count
    pub streak_days: u32,
    /// Last check-in timestamp
    pub last_active: Option<DateTime<Utc>>,
    /// Rank derived from level
    pub rank: Rank,
    /// Optimistic-concurrency token, bumped on every write
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlayerProgress {
    /// Fresh level-1 record for an athlete's first award.
    pub fn new(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            current_level: 1,
            level_xp: 0,
            xp_to_next_level: xp_required_for_level(1),
            total_xp: 0,
            streak_days: 0,
            last_active: None,
            rank: Rank::Rookie,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an XP award, carrying overflow into level-ups.
    ///
    /// Returns the number of levels gained. Maintains
    /// `0 <= level_xp < xp_to_next_level` on exit; a single large award can
    /// advance multiple levels.
    pub fn apply_award(&mut self, amount: i64, now: DateTime<Utc>) -> u32 {
        self.level_xp += amount;
        self.total_xp = self.total_xp.saturating_add(amount);

        let mut levels_gained = 0;
        while self.level_xp >= self.xp_to_next_level {
            self.level_xp -= self.xp_to_next_level;
            self.current_level = self.current_level.saturating_add(1);
            self.xp_to_next_level = xp_required_for_level(self.current_level);
            levels_gained += 1;
        }

        self.rank = Rank::from_level(self.current_level);
        self.updated_at = now;
        levels_gained
    }
}

/// Outcome of an XP award.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpAward {
    pub xp_earned: i64,
    pub leveled_up: bool,
    pub levels_gained: u32,
    pub new_level: u32,
    pub total_xp: i64,
    pub rank: Rank,
}

/// Outcome of a streak check-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakResult {
    pub streak_days: u32,
    pub updated: bool,
    pub milestone_reached: bool,
    pub bonus_xp: i64,
    pub xp_award: Option<XpAward>,
}

/// One row of the XP audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpTransaction {
    /// Row id (0 until persisted)
    pub id: i64,
    pub user_id: Uuid,
    pub amount: i64,
    pub source: XpSource,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl XpTransaction {
    /// New unpersisted log entry.
    pub fn new(
        user_id: Uuid,
        amount: i64,
        source: XpSource,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            user_id,
            amount,
            source,
            description: description.into(),
            created_at: now,
        }
    }
}

/// One row of the level table exposed to UI consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelInfo {
    pub level: u32,
    pub xp_required: i64,
    pub rank: Rank,
    pub is_rank_up: bool,
}

/// Per-level requirement and rank listing for levels 1..=max_level.
pub fn level_table(max_level: u32) -> Vec<LevelInfo> {
    (1..=max_level)
        .map(|level| {
            let rank = Rank::from_level(level);
            LevelInfo {
                level,
                xp_required: xp_required_for_level(level),
                rank,
                is_rank_up: level == 1 || rank != Rank::from_level(level - 1),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_curve_compounds() {
        assert_eq!(xp_required_for_level(1), 100);
        assert_eq!(xp_required_for_level(2), 120);
        assert_eq!(xp_required_for_level(3), 144);
        // floor(100 * 1.2^4) = floor(207.36)
        assert_eq!(xp_required_for_level(5), 207);
    }

    #[test]
    fn test_rank_boundaries() {
        let cases = [
            (4, Rank::Rookie),
            (5, Rank::Prospect),
            (9, Rank::Prospect),
            (10, Rank::RisingStar),
            (19, Rank::RisingStar),
            (20, Rank::AllStar),
            (29, Rank::AllStar),
            (30, Rank::Mvp),
            (49, Rank::Mvp),
            (50, Rank::Legend),
            (51, Rank::Legend),
        ];
        for (level, expected) in cases {
            assert_eq!(Rank::from_level(level), expected, "level {}", level);
        }
    }

    #[test]
    fn test_rank_round_trip() {
        for rank in [
            Rank::Rookie,
            Rank::Prospect,
            Rank::RisingStar,
            Rank::AllStar,
            Rank::Mvp,
            Rank::Legend,
        ] {
            assert_eq!(Rank::from_str(rank.as_str()), Some(rank));
        }
        assert_eq!(Rank::from_str("benchwarmer"), None);
    }

    #[test]
    fn test_xp_amount_bounds() {
        assert!(XpAmount::new(0).is_ok());
        assert!(XpAmount::new(1_000_000).is_ok());
        assert!(XpAmount::new(-1).is_err());
        assert!(XpAmount::new(1_000_001).is_err());
    }

    #[test]
    fn test_apply_award_single_level() {
        let now = Utc::now();
        let mut progress = PlayerProgress::new(Uuid::new_v4(), now);

        let gained = progress.apply_award(150, now);
        assert_eq!(gained, 1);
        assert_eq!(progress.current_level, 2);
        assert_eq!(progress.level_xp, 50);
        assert_eq!(progress.xp_to_next_level, 120);
        assert_eq!(progress.total_xp, 150);
    }

    #[test]
    fn test_apply_award_multi_level_jump() {
        let now = Utc::now();
        let mut progress = PlayerProgress::new(Uuid::new_v4(), now);

        // 350 >= 100 + 120 but < 100 + 120 + 144
        let gained = progress.apply_award(350, now);
        assert_eq!(gained, 2);
        assert_eq!(progress.current_level, 3);
        assert_eq!(progress.level_xp, 130);
        assert_eq!(progress.xp_to_next_level, 144);
    }

    #[test]
    fn test_apply_award_invariant_holds() {
        let now = Utc::now();
        let mut progress = PlayerProgress::new(Uuid::new_v4(), now);

        for amount in [7, 93, 100, 350, 515, 0, 9999] {
            progress.apply_award(amount, now);
            assert!(progress.level_xp >= 0);
            assert!(
                progress.level_xp < progress.xp_to_next_level,
                "invariant broken after awarding {}",
                amount
            );
        }
    }

    #[test]
    fn test_total_xp_monotonic() {
        let now = Utc::now();
        let mut progress = PlayerProgress::new(Uuid::new_v4(), now);

        let mut prev_total = 0;
        for amount in [10, 0, 250, 5] {
            progress.apply_award(amount, now);
            assert!(progress.total_xp >= prev_total);
            prev_total = progress.total_xp;
        }
    }

    #[test]
    fn test_level_table_rank_ups() {
        let table = level_table(50);
        assert_eq!(table.len(), 50);
        assert!(table[0].is_rank_up); // level 1, Rookie
        assert!(!table[3].is_rank_up); // level 4
        assert!(table[4].is_rank_up); // level 5, Prospect
        assert!(table[9].is_rank_up); // level 10, Rising Star
        assert!(table[49].is_rank_up); // level 50, Legend
        assert_eq!(table[49].rank, Rank::Legend);
    }
}
