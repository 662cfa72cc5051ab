//! Star Path and workout verification storage operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::starpath::types::{AttributeSet, StarPath, StarPathAttributes};
use crate::storage::database::DatabaseError;
use crate::workouts::verification::{VerificationStatus, WorkoutVerification};

/// Store for Star Path and workout verification data.
pub struct StarPathStore<'a> {
    conn: &'a Connection,
}

impl<'a> StarPathStore<'a> {
    /// Create a new star path store with the given connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // ========== Star Path Operations ==========

    /// Get an athlete's Star Path.
    pub fn get_star_path(&self, user_id: Uuid) -> Result<Option<StarPath>, DatabaseError> {
        self.conn
            .query_row(
                "SELECT user_id, current_star_level, star_xp, sport_type, position,
                        physical_json, technical_json, mental_json, revision,
                        created_at, updated_at
                 FROM star_paths WHERE user_id = ?1",
                params![user_id.to_string()],
                parse_star_path_row,
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))
    }

    /// Insert a new Star Path.
    pub fn create_star_path(&self, path: &StarPath) -> Result<(), DatabaseError> {
        let (physical, technical, mental) = attribute_json(&path.attributes)?;

        self.conn
            .execute(
                "INSERT INTO star_paths
                 (user_id, current_star_level, star_xp, sport_type, position,
                  physical_json, technical_json, mental_json, revision, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?10)",
                params![
                    path.user_id.to_string(),
                    path.current_star_level,
                    path.star_xp,
                    path.sport_type,
                    path.position,
                    physical,
                    technical,
                    mental,
                    path.created_at.to_rfc3339(),
                    path.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    /// Persist an updated Star Path, guarded by the revision read beforehand.
    pub fn update_star_path(
        &self,
        path: &StarPath,
        expected_revision: i64,
    ) -> Result<(), DatabaseError> {
        let (physical, technical, mental) = attribute_json(&path.attributes)?;

        let updated = self
            .conn
            .execute(
                "UPDATE star_paths SET
                 current_star_level = ?1, star_xp = ?2, sport_type = ?3, position = ?4,
                 physical_json = ?5, technical_json = ?6, mental_json = ?7,
                 updated_at = ?8, revision = revision + 1
                 WHERE user_id = ?9 AND revision = ?10",
                params![
                    path.current_star_level,
                    path.star_xp,
                    path.sport_type,
                    path.position,
                    physical,
                    technical,
                    mental,
                    path.updated_at.to_rfc3339(),
                    path.user_id.to_string(),
                    expected_revision,
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if updated == 0 {
            tracing::warn!(user_id = %path.user_id, "stale revision on star path update");
            return Err(DatabaseError::StaleRevision(path.user_id));
        }
        Ok(())
    }

    /// Atomically credit star XP without a read-modify-write cycle.
    pub fn add_star_xp(&self, user_id: Uuid, amount: i64, now: DateTime<Utc>) -> Result<(), DatabaseError> {
        let updated = self
            .conn
            .execute(
                "UPDATE star_paths SET
                 star_xp = star_xp + ?1, updated_at = ?2, revision = revision + 1
                 WHERE user_id = ?3",
                params![amount, now.to_rfc3339(), user_id.to_string()],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if updated == 0 {
            return Err(DatabaseError::QueryFailed(format!(
                "no star path for user {}",
                user_id
            )));
        }
        Ok(())
    }

    /// Get the Star Path, creating a default one on first use.
    pub fn get_or_create(
        &self,
        user_id: Uuid,
        default_sport: &str,
        now: DateTime<Utc>,
    ) -> Result<StarPath, DatabaseError> {
        if let Some(path) = self.get_star_path(user_id)? {
            return Ok(path);
        }

        let path = StarPath::new(user_id, default_sport, now);
        self.create_star_path(&path)?;
        Ok(path)
    }

    // ========== Workout Verification Operations ==========

    /// Insert a workout verification record.
    pub fn create_verification(&self, v: &WorkoutVerification) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO workout_verifications
                 (id, user_id, video_id, workout_type, duration_minutes, intensity,
                  notes, status, xp_earned, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    v.id.to_string(),
                    v.user_id.to_string(),
                    v.video_id.to_string(),
                    v.workout_type,
                    v.duration_minutes,
                    v.intensity.map(|i| i.get()),
                    v.notes,
                    v.status.as_str(),
                    v.xp_earned,
                    v.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    /// Get a verification record by id.
    pub fn get_verification(
        &self,
        id: Uuid,
    ) -> Result<Option<WorkoutVerification>, DatabaseError> {
        self.conn
            .query_row(
                "SELECT id, user_id, video_id, workout_type, duration_minutes, intensity,
                        notes, status, xp_earned, created_at
                 FROM workout_verifications WHERE id = ?1",
                params![id.to_string()],
                parse_verification_row,
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))
    }

    /// Pending verification records for an athlete, newest first.
    pub fn pending_verifications(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<WorkoutVerification>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, user_id, video_id, workout_type, duration_minutes, intensity,
                        notes, status, xp_earned, created_at
                 FROM workout_verifications
                 WHERE user_id = ?1 AND status = 'pending'
                 ORDER BY created_at DESC",
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params![user_id.to_string()], parse_verification_row)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))
    }
}

fn attribute_json(
    attributes: &StarPathAttributes,
) -> Result<(String, String, String), DatabaseError> {
    let physical = serde_json::to_string(&attributes.physical)
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
    let technical = serde_json::to_string(&attributes.technical)
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
    let mental = serde_json::to_string(&attributes.mental)
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
    Ok((physical, technical, mental))
}

/// Parse a database row into a StarPath.
fn parse_star_path_row(row: &rusqlite::Row) -> rusqlite::Result<StarPath> {
    let user_id_str: String = row.get(0)?;
    let physical_json: String = row.get(5)?;
    let technical_json: String = row.get(6)?;
    let mental_json: String = row.get(7)?;
    let created_at_str: String = row.get(9)?;
    let updated_at_str: String = row.get(10)?;

    let attributes = StarPathAttributes {
        physical: parse_set(&physical_json),
        technical: parse_set(&technical_json),
        mental: parse_set(&mental_json),
    };

    Ok(StarPath {
        user_id: Uuid::parse_str(&user_id_str).unwrap_or_default(),
        current_star_level: row.get(1)?,
        star_xp: row.get(2)?,
        sport_type: row.get(3)?,
        position: row.get(4)?,
        attributes,
        revision: row.get(8)?,
        created_at: parse_timestamp(9, &created_at_str)?,
        updated_at: parse_timestamp(10, &updated_at_str)?,
    })
}

fn parse_set(json: &str) -> AttributeSet {
    serde_json::from_str(json).unwrap_or_default()
}

fn parse_verification_row(row: &rusqlite::Row) -> rusqlite::Result<WorkoutVerification> {
    use crate::workouts::verification::Intensity;

    let id_str: String = row.get(0)?;
    let user_id_str: String = row.get(1)?;
    let video_id_str: String = row.get(2)?;
    let intensity: Option<u8> = row.get(5)?;
    let status_str: String = row.get(7)?;
    let created_at_str: String = row.get(9)?;

    Ok(WorkoutVerification {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        user_id: Uuid::parse_str(&user_id_str).unwrap_or_default(),
        video_id: Uuid::parse_str(&video_id_str).unwrap_or_default(),
        workout_type: row.get(3)?,
        duration_minutes: row.get(4)?,
        intensity: intensity.and_then(|i| Intensity::new(i).ok()),
        notes: row.get(6)?,
        status: VerificationStatus::from_str(&status_str),
        xp_earned: row.get(8)?,
        created_at: parse_timestamp(9, &created_at_str)?,
    })
}

/// Parse a stored RFC 3339 timestamp, surfacing corrupt data as a row
/// conversion error instead of substituting a fabricated time.
fn parse_timestamp(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
