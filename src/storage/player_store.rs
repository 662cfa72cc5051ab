//! Player progression storage operations.
//!
//! Provides persistence for:
//! - Player progress records
//! - The append-only XP audit log
//! - User and video lookups (ownership and role checks)
//!
//! Progress writes are guarded by a `revision` column: every write asserts
//! the revision it read and bumps it, so a concurrent writer gets
//! `DatabaseError::StaleRevision` instead of silently overwriting XP.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::auth::capability::Role;
use crate::progression::types::{PlayerProgress, Rank, XpSource, XpTransaction};
use crate::storage::database::DatabaseError;

/// Platform user (lookup only; account management lives upstream).
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Uploaded training video (ownership lookup only).
#[derive(Debug, Clone)]
pub struct Video {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Store for player progression data.
pub struct PlayerStore<'a> {
    conn: &'a Connection,
}

impl<'a> PlayerStore<'a> {
    /// Create a new player store with the given connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // ========== Progress Operations ==========

    /// Get an athlete's progress record.
    pub fn get_progress(&self, user_id: Uuid) -> Result<Option<PlayerProgress>, DatabaseError> {
        self.conn
            .query_row(
                "SELECT user_id, current_level, level_xp, xp_to_next_level, total_xp,
                        streak_days, last_active, rank, revision, created_at, updated_at
                 FROM player_progress WHERE user_id = ?1",
                params![user_id.to_string()],
                parse_progress_row,
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))
    }

    /// Insert a fresh progress record together with its first audit row,
    /// in one SQLite transaction.
    pub fn create_progress_with_award(
        &self,
        progress: &PlayerProgress,
        entry: &XpTransaction,
    ) -> Result<(), DatabaseError> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        tx.execute(
            "INSERT INTO player_progress
             (user_id, current_level, level_xp, xp_to_next_level, total_xp,
              streak_days, last_active, rank, revision, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?10)",
            params![
                progress.user_id.to_string(),
                progress.current_level,
                progress.level_xp,
                progress.xp_to_next_level,
                progress.total_xp,
                progress.streak_days,
                progress.last_active.map(|t| t.to_rfc3339()),
                progress.rank.as_str(),
                progress.created_at.to_rfc3339(),
                progress.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        insert_transaction(&tx, entry)?;

        tx.commit()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))
    }

    /// Persist an updated progress record together with its audit row, in
    /// one SQLite transaction guarded by the revision read beforehand.
    pub fn update_progress_with_award(
        &self,
        progress: &PlayerProgress,
        expected_revision: i64,
        entry: &XpTransaction,
    ) -> Result<(), DatabaseError> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        let updated = update_progress_row(&tx, progress, expected_revision)?;
        if updated == 0 {
            tracing::warn!(user_id = %progress.user_id, "stale revision on XP award");
            return Err(DatabaseError::StaleRevision(progress.user_id));
        }

        insert_transaction(&tx, entry)?;

        tx.commit()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))
    }

    /// Persist streak fields without an audit row, revision-guarded.
    pub fn update_streak(
        &self,
        progress: &PlayerProgress,
        expected_revision: i64,
    ) -> Result<(), DatabaseError> {
        let updated = update_progress_row(self.conn, progress, expected_revision)?;
        if updated == 0 {
            tracing::warn!(user_id = %progress.user_id, "stale revision on streak update");
            return Err(DatabaseError::StaleRevision(progress.user_id));
        }
        Ok(())
    }

    // ========== XP Audit Log ==========

    /// Most recent XP transactions for an athlete, newest first.
    pub fn recent_transactions(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<XpTransaction>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, user_id, amount, source, description, created_at
                 FROM xp_transactions
                 WHERE user_id = ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params![user_id.to_string(), limit], parse_transaction_row)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))
    }

    // ========== User Operations ==========

    /// Insert a user record.
    pub fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO users (id, name, role, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    user.id.to_string(),
                    user.name,
                    user.role.as_str(),
                    user.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    /// Get a user by id.
    pub fn get_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        self.conn
            .query_row(
                "SELECT id, name, role, created_at FROM users WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    let id_str: String = row.get(0)?;
                    let role_str: String = row.get(2)?;
                    let created_at_str: String = row.get(3)?;
                    Ok(User {
                        id: Uuid::parse_str(&id_str).unwrap_or_default(),
                        name: row.get(1)?,
                        role: Role::from_str(&role_str),
                        created_at: parse_timestamp(3, &created_at_str)?,
                    })
                },
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))
    }

    // ========== Video Operations ==========

    /// Insert a video record.
    pub fn insert_video(&self, video: &Video) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO videos (id, user_id, title, uploaded_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    video.id.to_string(),
                    video.user_id.to_string(),
                    video.title,
                    video.uploaded_at.to_rfc3339(),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    /// Get a video by id.
    pub fn get_video(&self, id: Uuid) -> Result<Option<Video>, DatabaseError> {
        self.conn
            .query_row(
                "SELECT id, user_id, title, uploaded_at FROM videos WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    let id_str: String = row.get(0)?;
                    let user_id_str: String = row.get(1)?;
                    let uploaded_at_str: String = row.get(3)?;
                    Ok(Video {
                        id: Uuid::parse_str(&id_str).unwrap_or_default(),
                        user_id: Uuid::parse_str(&user_id_str).unwrap_or_default(),
                        title: row.get(2)?,
                        uploaded_at: parse_timestamp(3, &uploaded_at_str)?,
                    })
                },
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))
    }
}

/// Revision-guarded UPDATE of every progress field. Returns rows changed.
fn update_progress_row(
    conn: &Connection,
    progress: &PlayerProgress,
    expected_revision: i64,
) -> Result<usize, DatabaseError> {
    conn.execute(
        "UPDATE player_progress SET
         current_level = ?1, level_xp = ?2, xp_to_next_level = ?3, total_xp = ?4,
         streak_days = ?5, last_active = ?6, rank = ?7, updated_at = ?8,
         revision = revision + 1
         WHERE user_id = ?9 AND revision = ?10",
        params![
            progress.current_level,
            progress.level_xp,
            progress.xp_to_next_level,
            progress.total_xp,
            progress.streak_days,
            progress.last_active.map(|t| t.to_rfc3339()),
            progress.rank.as_str(),
            progress.updated_at.to_rfc3339(),
            progress.user_id.to_string(),
            expected_revision,
        ],
    )
    .map_err(|e| DatabaseError::QueryFailed(e.to_string()))
}

fn insert_transaction(conn: &Connection, entry: &XpTransaction) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO xp_transactions (user_id, amount, source, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.user_id.to_string(),
            entry.amount,
            entry.source.as_str(),
            entry.description,
            entry.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
    Ok(())
}

/// Parse a database row into a PlayerProgress.
fn parse_progress_row(row: &rusqlite::Row) -> rusqlite::Result<PlayerProgress> {
    let user_id_str: String = row.get(0)?;
    let last_active_str: Option<String> = row.get(6)?;
    let rank_str: String = row.get(7)?;
    let created_at_str: String = row.get(9)?;
    let updated_at_str: String = row.get(10)?;

    Ok(PlayerProgress {
        user_id: Uuid::parse_str(&user_id_str).unwrap_or_default(),
        current_level: row.get(1)?,
        level_xp: row.get(2)?,
        xp_to_next_level: row.get(3)?,
        total_xp: row.get(4)?,
        streak_days: row.get(5)?,
        last_active: last_active_str
            .as_deref()
            .map(|s| parse_timestamp(6, s))
            .transpose()?,
        rank: Rank::from_str(&rank_str).unwrap_or(Rank::Rookie),
        revision: row.get(8)?,
        created_at: parse_timestamp(9, &created_at_str)?,
        updated_at: parse_timestamp(10, &updated_at_str)?,
    })
}

fn parse_transaction_row(row: &rusqlite::Row) -> rusqlite::Result<XpTransaction> {
    let user_id_str: String = row.get(1)?;
    let source_str: String = row.get(3)?;
    let created_at_str: String = row.get(5)?;

    Ok(XpTransaction {
        id: row.get(0)?,
        user_id: Uuid::parse_str(&user_id_str).unwrap_or_default(),
        amount: row.get(2)?,
        source: XpSource::from_str(&source_str),
        description: row.get(4)?,
        created_at: parse_timestamp(5, &created_at_str)?,
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
