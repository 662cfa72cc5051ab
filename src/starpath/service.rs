//! Star Path service: configuration, attribute updates, and level-ups.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::types::{
    AttributeCategory, AttributeSet, StarPath, StarPathAttributes, STAR_LEVEL_UP_REWARD,
};
use crate::auth::capability::{can_manage_athlete, Actor};
use crate::progression::engine::{ProgressionEngine, ProgressionError};
use crate::progression::types::{XpAmount, XpAward, XpSource};
use crate::storage::database::DatabaseError;
use crate::storage::player_store::PlayerStore;
use crate::storage::starpath_store::StarPathStore;
use crate::storage::Database;

/// Outcome of a Star Path level-up.
#[derive(Debug, Clone)]
pub struct StarLevelUpOutcome {
    pub previous_level: u32,
    pub new_level: u32,
    pub remaining_xp: i64,
    pub xp_reward: i64,
    pub xp_award: XpAward,
    pub star_path: StarPath,
}

/// Star Path service.
pub struct StarPathService {
    db: Arc<Database>,
    engine: ProgressionEngine,
}

impl StarPathService {
    /// Create a new Star Path service.
    pub fn new(db: Arc<Database>, engine: ProgressionEngine) -> Self {
        Self { db, engine }
    }

    /// Create an athlete's Star Path, or update sport, position, and
    /// attributes on an existing one.
    pub fn create_or_update(
        &self,
        actor: &Actor,
        user_id: Uuid,
        sport_type: &str,
        position: Option<&str>,
        attributes: Option<StarPathAttributes>,
    ) -> Result<StarPath, StarPathError> {
        self.create_or_update_at(actor, user_id, sport_type, position, attributes, Utc::now())
    }

    /// As `create_or_update`, with an explicit clock.
    pub fn create_or_update_at(
        &self,
        actor: &Actor,
        user_id: Uuid,
        sport_type: &str,
        position: Option<&str>,
        attributes: Option<StarPathAttributes>,
        now: DateTime<Utc>,
    ) -> Result<StarPath, StarPathError> {
        if !can_manage_athlete(actor, user_id) {
            return Err(StarPathError::Forbidden);
        }

        let conn = self.db.connection();
        PlayerStore::new(conn)
            .get_user(user_id)?
            .ok_or(StarPathError::UserNotFound(user_id))?;

        let store = StarPathStore::new(conn);
        match store.get_star_path(user_id)? {
            Some(mut path) => {
                let expected_revision = path.revision;
                path.sport_type = sport_type.to_string();
                path.position = position.map(str::to_string);
                if let Some(attributes) = attributes {
                    path.attributes = attributes;
                }
                path.updated_at = now;
                store.update_star_path(&path, expected_revision)?;
                path.revision += 1;
                Ok(path)
            }
            None => {
                let mut path = StarPath::new(user_id, sport_type, now);
                path.position = position.map(str::to_string);
                if let Some(attributes) = attributes {
                    path.attributes = attributes;
                }
                store.create_star_path(&path)?;
                Ok(path)
            }
        }
    }

    /// Merge attribute values into one category of an athlete's Star Path.
    ///
    /// Named stats overwrite, unnamed stats keep their prior values. The
    /// actor must be the athlete or hold the coach/admin role.
    pub fn update_attributes(
        &self,
        actor: &Actor,
        user_id: Uuid,
        category: AttributeCategory,
        values: AttributeSet,
    ) -> Result<StarPath, StarPathError> {
        self.update_attributes_at(actor, user_id, category, values, Utc::now())
    }

    /// As `update_attributes`, with an explicit clock.
    pub fn update_attributes_at(
        &self,
        actor: &Actor,
        user_id: Uuid,
        category: AttributeCategory,
        values: AttributeSet,
        now: DateTime<Utc>,
    ) -> Result<StarPath, StarPathError> {
        if !can_manage_athlete(actor, user_id) {
            return Err(StarPathError::Forbidden);
        }

        let store = StarPathStore::new(self.db.connection());
        let mut path = store
            .get_star_path(user_id)?
            .ok_or(StarPathError::NotFound(user_id))?;

        let expected_revision = path.revision;
        path.attributes.merge(category, values);
        path.updated_at = now;
        store.update_star_path(&path, expected_revision)?;
        path.revision += 1;

        Ok(path)
    }

    /// Spend banked star XP on a level-up and pay the regular-XP reward.
    ///
    /// Requires `star_xp >= current_star_level * 1000`; the spent amount is
    /// subtracted and any excess carries forward. The reward is
    /// `previous_level * 200` regular XP.
    pub fn level_up(&self, user_id: Uuid) -> Result<StarLevelUpOutcome, StarPathError> {
        self.level_up_at(user_id, Utc::now())
    }

    /// As `level_up`, with an explicit clock.
    pub fn level_up_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<StarLevelUpOutcome, StarPathError> {
        let store = StarPathStore::new(self.db.connection());
        let mut path = store
            .get_star_path(user_id)?
            .ok_or(StarPathError::NotFound(user_id))?;

        let required_xp = path.xp_required_for_next();
        if path.star_xp < required_xp {
            return Err(StarPathError::InsufficientXp {
                current_xp: path.star_xp,
                required_xp,
                xp_needed: required_xp - path.star_xp,
            });
        }

        let previous_level = path.current_star_level;
        let expected_revision = path.revision;
        path.current_star_level += 1;
        path.star_xp -= required_xp;
        path.updated_at = now;
        store.update_star_path(&path, expected_revision)?;
        path.revision += 1;

        tracing::info!(
            user_id = %user_id,
            new_star_level = path.current_star_level,
            "star path leveled up"
        );

        // The reward lands in its own transaction; if it fails, the star
        // level-up above stays committed and the caller sees the error.
        let xp_reward = previous_level as i64 * STAR_LEVEL_UP_REWARD;
        let xp_award = self.engine.add_xp_at(
            user_id,
            XpAmount::new(xp_reward).map_err(ProgressionError::from)?,
            XpSource::StarLevelUp,
            &format!("Reached star level {}", path.current_star_level),
            now,
        )?;

        Ok(StarLevelUpOutcome {
            previous_level,
            new_level: path.current_star_level,
            remaining_xp: path.star_xp,
            xp_reward,
            xp_award,
            star_path: path,
        })
    }

    /// Read an athlete's Star Path, if any.
    pub fn star_path(&self, user_id: Uuid) -> Result<Option<StarPath>, StarPathError> {
        let store = StarPathStore::new(self.db.connection());
        Ok(store.get_star_path(user_id)?)
    }
}

/// Star Path service errors.
#[derive(Debug, thiserror::Error)]
pub enum StarPathError {
    #[error("Star path not found for user {0}")]
    NotFound(Uuid),

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("Not permitted to modify this athlete's star path")]
    Forbidden,

    #[error("Not enough star XP: have {current_xp}, need {required_xp} ({xp_needed} short)")]
    InsufficientXp {
        current_xp: i64,
        required_xp: i64,
        xp_needed: i64,
    },

    #[error(transparent)]
    Progression(#[from] ProgressionError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
