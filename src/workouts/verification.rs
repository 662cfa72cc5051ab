//! Workout verification: submission records and XP crediting.
//!
//! Submitting a video for verification immediately earns regular XP (by a
//! duration-capped formula) and credits double that amount to the athlete's
//! Star Path. The review of the video itself happens in an external
//! process; records are created in `pending` status.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::progression::engine::{ProgressionEngine, ProgressionError};
use crate::progression::types::{XpAmount, XpAward, XpSource};
use crate::storage::database::DatabaseError;
use crate::storage::player_store::PlayerStore;
use crate::storage::starpath_store::StarPathStore;
use crate::storage::Database;

/// Base XP for any submission.
const BASE_XP: i64 = 50;
/// XP per minute of workout, capped at this many minutes.
const XP_PER_MINUTE: i64 = 10;
const MAX_CREDITED_MINUTES: u32 = 10;
/// Star XP credited per regular XP earned.
const STAR_XP_MULTIPLIER: i64 = 2;

/// Sport assigned when a submission creates the Star Path lazily.
const DEFAULT_SPORT: &str = "basketball";

/// A validated workout intensity (1..=10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Intensity(u8);

impl Intensity {
    /// Validate and wrap an intensity rating.
    pub fn new(value: u8) -> Result<Self, InvalidIntensity> {
        if (1..=10).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidIntensity(value))
        }
    }

    /// Get the inner value.
    pub fn get(self) -> u8 {
        self.0
    }
}

/// Rejected intensity rating.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("intensity {0} is outside the 1..=10 range")]
pub struct InvalidIntensity(pub u8);

/// Review status of a verification record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    Pending,
    Completed,
    Rejected,
}

impl VerificationStatus {
    /// Stable identifier used in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Completed => "completed",
            VerificationStatus::Rejected => "rejected",
        }
    }

    /// Parse the database identifier; unknown values read as pending.
    pub fn from_str(s: &str) -> Self {
        match s {
            "completed" => VerificationStatus::Completed,
            "rejected" => VerificationStatus::Rejected,
            _ => VerificationStatus::Pending,
        }
    }
}

/// A workout submitted for verification.
#[derive(Debug, Clone)]
pub struct WorkoutVerification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub video_id: Uuid,
    pub workout_type: String,
    pub duration_minutes: Option<u32>,
    pub intensity: Option<Intensity>,
    pub notes: Option<String>,
    pub status: VerificationStatus,
    pub xp_earned: i64,
    pub created_at: DateTime<Utc>,
}

/// Submission details supplied by the athlete.
#[derive(Debug, Clone)]
pub struct WorkoutSubmission {
    pub workout_type: String,
    pub duration_minutes: Option<u32>,
    pub intensity: Option<Intensity>,
    pub notes: Option<String>,
}

/// Outcome of a workout submission.
#[derive(Debug, Clone)]
pub struct WorkoutVerificationOutcome {
    pub verification: WorkoutVerification,
    pub xp_earned: i64,
    pub xp_award: XpAward,
    pub star_xp_earned: i64,
}

/// Regular XP for a submission: 50 base plus 10 per minute, duration
/// capped at 10 minutes.
pub fn submission_xp(duration_minutes: Option<u32>) -> i64 {
    let minutes = duration_minutes.unwrap_or(0).min(MAX_CREDITED_MINUTES);
    BASE_XP + minutes as i64 * XP_PER_MINUTE
}

/// Workout verification service.
pub struct WorkoutVerificationService {
    db: Arc<Database>,
    engine: ProgressionEngine,
}

impl WorkoutVerificationService {
    /// Create a new workout verification service.
    pub fn new(db: Arc<Database>, engine: ProgressionEngine) -> Self {
        Self { db, engine }
    }

    /// Submit a workout video for verification, crediting regular and
    /// star XP.
    ///
    /// The video must belong to the submitting athlete. No star level-up
    /// happens here; the athlete levels up explicitly once the threshold
    /// is met.
    pub fn verify_workout(
        &self,
        user_id: Uuid,
        video_id: Uuid,
        submission: WorkoutSubmission,
    ) -> Result<WorkoutVerificationOutcome, VerificationError> {
        self.verify_workout_at(user_id, video_id, submission, Utc::now())
    }

    /// As `verify_workout`, with an explicit clock.
    pub fn verify_workout_at(
        &self,
        user_id: Uuid,
        video_id: Uuid,
        submission: WorkoutSubmission,
        now: DateTime<Utc>,
    ) -> Result<WorkoutVerificationOutcome, VerificationError> {
        let conn = self.db.connection();

        let video = PlayerStore::new(conn)
            .get_video(video_id)?
            .ok_or(VerificationError::VideoNotFound(video_id))?;
        if video.user_id != user_id {
            return Err(VerificationError::Forbidden);
        }

        let xp_earned = submission_xp(submission.duration_minutes);
        let star_xp_earned = xp_earned * STAR_XP_MULTIPLIER;

        let verification = WorkoutVerification {
            id: Uuid::new_v4(),
            user_id,
            video_id,
            workout_type: submission.workout_type,
            duration_minutes: submission.duration_minutes,
            intensity: submission.intensity,
            notes: submission.notes,
            status: VerificationStatus::Pending,
            xp_earned,
            created_at: now,
        };

        let star_store = StarPathStore::new(conn);
        star_store.create_verification(&verification)?;
        star_store.get_or_create(user_id, DEFAULT_SPORT, now)?;
        star_store.add_star_xp(user_id, star_xp_earned, now)?;

        let xp_award = self.engine.add_xp_at(
            user_id,
            XpAmount::new(xp_earned).map_err(ProgressionError::from)?,
            XpSource::WorkoutSubmission,
            &format!("Submitted {} workout for verification", verification.workout_type),
            now,
        )?;

        tracing::info!(
            user_id = %user_id,
            video_id = %video_id,
            xp_earned,
            star_xp_earned,
            "workout submitted for verification"
        );

        Ok(WorkoutVerificationOutcome {
            verification,
            xp_earned,
            xp_award,
            star_xp_earned,
        })
    }

    /// Pending verification records for an athlete, newest first.
    pub fn pending(&self, user_id: Uuid) -> Result<Vec<WorkoutVerification>, VerificationError> {
        let store = StarPathStore::new(self.db.connection());
        Ok(store.pending_verifications(user_id)?)
    }
}

/// Workout verification errors.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Video not found: {0}")]
    VideoNotFound(Uuid),

    #[error("Video belongs to a different athlete")]
    Forbidden,

    #[error(transparent)]
    InvalidIntensity(#[from] InvalidIntensity),

    #[error(transparent)]
    Progression(#[from] ProgressionError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
