//! The progression engine: XP awards, leveling, and streak check-ins.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::milestones::StreakMilestones;
use super::types::{
    InvalidXpAmount, PlayerProgress, StreakResult, XpAmount, XpAward, XpSource, XpTransaction,
};
use crate::storage::database::DatabaseError;
use crate::storage::player_store::PlayerStore;
use crate::storage::Database;

/// Daily check-in window: a gap of 18 to 36 hours counts as the next
/// consecutive day; longer breaks the streak; shorter means the athlete
/// already checked in today.
const STREAK_WINDOW_MIN_HOURS: f64 = 18.0;
const STREAK_WINDOW_MAX_HOURS: f64 = 36.0;

/// Progression engine service.
#[derive(Clone)]
pub struct ProgressionEngine {
    db: Arc<Database>,
    milestones: StreakMilestones,
}

impl ProgressionEngine {
    /// Create an engine with the default streak milestone table.
    pub fn new(db: Arc<Database>) -> Self {
        Self::with_milestones(db, StreakMilestones::default())
    }

    /// Create an engine with a custom streak milestone table.
    pub fn with_milestones(db: Arc<Database>, milestones: StreakMilestones) -> Self {
        Self { db, milestones }
    }

    /// Award XP to an athlete, creating their progress record on first use.
    /// The athlete must already exist in `users`.
    pub fn add_xp(
        &self,
        user_id: Uuid,
        amount: XpAmount,
        source: XpSource,
        description: &str,
    ) -> Result<XpAward, ProgressionError> {
        self.add_xp_at(user_id, amount, source, description, Utc::now())
    }

    /// Award XP with an explicit clock (exposed for deterministic tests).
    pub fn add_xp_at(
        &self,
        user_id: Uuid,
        amount: XpAmount,
        source: XpSource,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<XpAward, ProgressionError> {
        let store = PlayerStore::new(self.db.connection());
        let entry = XpTransaction::new(user_id, amount.get(), source, description, now);

        let (progress, levels_gained) = match store.get_progress(user_id)? {
            None => {
                store
                    .get_user(user_id)?
                    .ok_or(ProgressionError::UserNotFound(user_id))?;

                // First award: same carry loop as the update path, so a
                // large first award still lands below the threshold.
                let mut progress = PlayerProgress::new(user_id, now);
                let gained = progress.apply_award(amount.get(), now);
                store.create_progress_with_award(&progress, &entry)?;
                (progress, gained)
            }
            Some(mut progress) => {
                let expected_revision = progress.revision;
                let gained = progress.apply_award(amount.get(), now);
                store.update_progress_with_award(&progress, expected_revision, &entry)?;
                (progress, gained)
            }
        };

        if levels_gained > 0 {
            tracing::info!(
                user_id = %user_id,
                new_level = progress.current_level,
                rank = %progress.rank,
                "player leveled up"
            );
        }

        Ok(XpAward {
            xp_earned: amount.get(),
            leveled_up: levels_gained > 0,
            levels_gained,
            new_level: progress.current_level,
            total_xp: progress.total_xp,
            rank: progress.rank,
        })
    }

    /// Record a daily check-in, updating the streak and paying any
    /// milestone bonus.
    pub fn check_streak(&self, user_id: Uuid) -> Result<StreakResult, ProgressionError> {
        self.check_streak_at(user_id, Utc::now())
    }

    /// Check in with an explicit clock (exposed for deterministic tests).
    pub fn check_streak_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<StreakResult, ProgressionError> {
        let store = PlayerStore::new(self.db.connection());
        let mut progress = store
            .get_progress(user_id)?
            .ok_or(ProgressionError::PlayerNotFound(user_id))?;
        let expected_revision = progress.revision;

        let (updated, streak_days) = match progress.last_active {
            None => (true, 1),
            Some(last_active) => {
                let hours = (now - last_active).num_minutes() as f64 / 60.0;
                if (STREAK_WINDOW_MIN_HOURS..=STREAK_WINDOW_MAX_HOURS).contains(&hours) {
                    (true, progress.streak_days + 1)
                } else if hours > STREAK_WINDOW_MAX_HOURS {
                    (true, 1)
                } else {
                    // Already checked in today
                    (false, progress.streak_days)
                }
            }
        };

        progress.streak_days = streak_days;
        progress.last_active = Some(now);
        progress.updated_at = now;
        store.update_streak(&progress, expected_revision)?;

        // Milestones pay exactly when the updated streak lands on an entry
        let bonus = if updated {
            self.milestones.bonus_for(streak_days)
        } else {
            None
        };

        let xp_award = match bonus {
            Some(bonus_xp) => {
                tracing::info!(user_id = %user_id, streak_days, bonus_xp, "streak milestone reached");
                let amount = XpAmount::new(bonus_xp)?;
                Some(self.add_xp_at(
                    user_id,
                    amount,
                    XpSource::StreakMilestone,
                    &format!("{} day streak bonus", streak_days),
                    now,
                )?)
            }
            None => None,
        };

        Ok(StreakResult {
            streak_days,
            updated,
            milestone_reached: bonus.is_some(),
            bonus_xp: bonus.unwrap_or(0),
            xp_award,
        })
    }

    /// Read an athlete's current progress, if any.
    pub fn progress(&self, user_id: Uuid) -> Result<Option<PlayerProgress>, ProgressionError> {
        let store = PlayerStore::new(self.db.connection());
        Ok(store.get_progress(user_id)?)
    }

    /// Most recent XP transactions for an athlete, newest first.
    pub fn recent_transactions(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<XpTransaction>, ProgressionError> {
        let store = PlayerStore::new(self.db.connection());
        Ok(store.recent_transactions(user_id, limit)?)
    }

    /// The configured streak milestone table.
    pub fn milestones(&self) -> &StreakMilestones {
        &self.milestones
    }

    /// Shared database handle.
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }
}

/// Progression engine errors.
#[derive(Debug, thiserror::Error)]
pub enum ProgressionError {
    #[error("Player progress not found for user {0}")]
    PlayerNotFound(Uuid),

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error(transparent)]
    InvalidAmount(#[from] InvalidXpAmount),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
