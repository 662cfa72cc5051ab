//! Star Path type definitions: sport-specific attribute progression.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// XP the Star Path leveling curve charges per level: level N to N+1
/// costs N * 1000.
pub const STAR_XP_PER_LEVEL: i64 = 1000;

/// Regular XP rewarded per star level held before a level-up.
pub const STAR_LEVEL_UP_REWARD: i64 = 200;

/// A validated attribute stat value (0..=100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StatValue(u8);

impl StatValue {
    /// Validate and wrap a stat value.
    pub fn new(value: u8) -> Result<Self, InvalidStatValue> {
        if value <= 100 {
            Ok(Self(value))
        } else {
            Err(InvalidStatValue(value))
        }
    }

    /// Get the inner value.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for StatValue {
    type Error = InvalidStatValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StatValue> for u8 {
    fn from(value: StatValue) -> u8 {
        value.0
    }
}

/// Rejected stat value.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("stat value {0} is outside the 0..=100 range")]
pub struct InvalidStatValue(pub u8);

/// Named stats within one attribute category.
pub type AttributeSet = BTreeMap<String, StatValue>;

/// Attribute category on a Star Path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeCategory {
    Physical,
    Technical,
    Mental,
}

impl AttributeCategory {
    /// Stable identifier used in APIs and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeCategory::Physical => "physical",
            AttributeCategory::Technical => "technical",
            AttributeCategory::Mental => "mental",
        }
    }

    /// Parse an identifier; anything else is rejected.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "physical" => Some(AttributeCategory::Physical),
            "technical" => Some(AttributeCategory::Technical),
            "mental" => Some(AttributeCategory::Mental),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttributeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The three attribute categories of a Star Path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarPathAttributes {
    pub physical: AttributeSet,
    pub technical: AttributeSet,
    pub mental: AttributeSet,
}

impl StarPathAttributes {
    /// Borrow one category's stat set.
    pub fn category(&self, category: AttributeCategory) -> &AttributeSet {
        match category {
            AttributeCategory::Physical => &self.physical,
            AttributeCategory::Technical => &self.technical,
            AttributeCategory::Mental => &self.mental,
        }
    }

    /// Mutably borrow one category's stat set.
    pub fn category_mut(&mut self, category: AttributeCategory) -> &mut AttributeSet {
        match category {
            AttributeCategory::Physical => &mut self.physical,
            AttributeCategory::Technical => &mut self.technical,
            AttributeCategory::Mental => &mut self.mental,
        }
    }

    /// Shallow-merge `values` into one category: named stats overwrite,
    /// unnamed stats keep their prior values.
    pub fn merge(&mut self, category: AttributeCategory, values: AttributeSet) {
        self.category_mut(category).extend(values);
    }
}

fn default_set(names: &[&str]) -> AttributeSet {
    names
        .iter()
        .map(|name| (name.to_string(), StatValue(50)))
        .collect()
}

impl Default for StarPathAttributes {
    fn default() -> Self {
        Self {
            physical: default_set(&[
                "speed",
                "strength",
                "agility",
                "endurance",
                "vertical_jump",
            ]),
            technical: default_set(&["technique", "ball_control", "accuracy", "game_iq"]),
            mental: default_set(&["focus", "confidence", "determination", "teamwork"]),
        }
    }
}

/// An athlete's Star Path: a secondary, sport-specific progression track
/// parallel to the general XP system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StarPath {
    pub user_id: Uuid,
    /// Current star level (unbounded upward)
    pub current_star_level: u32,
    /// Banked star XP; level-ups spend from this, excess carries forward
    pub star_xp: i64,
    pub sport_type: String,
    pub position: Option<String>,
    pub attributes: StarPathAttributes,
    /// Optimistic-concurrency token, bumped on every write
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StarPath {
    /// Fresh level-1 Star Path with default attribute sets.
    pub fn new(user_id: Uuid, sport_type: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            current_star_level: 1,
            star_xp: 0,
            sport_type: sport_type.into(),
            position: None,
            attributes: StarPathAttributes::default(),
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Star XP required for the next level-up.
    pub fn xp_required_for_next(&self) -> i64 {
        self.current_star_level as i64 * STAR_XP_PER_LEVEL
    }

    /// Whether a level-up is currently affordable.
    pub fn can_level_up(&self) -> bool {
        self.star_xp >= self.xp_required_for_next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_value_bounds() {
        assert!(StatValue::new(0).is_ok());
        assert!(StatValue::new(100).is_ok());
        assert!(StatValue::new(101).is_err());
    }

    #[test]
    fn test_default_attributes() {
        let attrs = StarPathAttributes::default();
        assert_eq!(attrs.physical.len(), 5);
        assert_eq!(attrs.technical.len(), 4);
        assert_eq!(attrs.mental.len(), 4);
        assert_eq!(attrs.physical.get("speed").map(|v| v.get()), Some(50));
        assert_eq!(attrs.mental.get("teamwork").map(|v| v.get()), Some(50));
    }

    #[test]
    fn test_merge_preserves_unnamed_stats() {
        let mut attrs = StarPathAttributes::default();
        let mut update = AttributeSet::new();
        update.insert("speed".to_string(), StatValue::new(80).unwrap());

        attrs.merge(AttributeCategory::Physical, update);

        assert_eq!(attrs.physical.get("speed").map(|v| v.get()), Some(80));
        assert_eq!(attrs.physical.get("strength").map(|v| v.get()), Some(50));
    }

    #[test]
    fn test_merge_adds_new_stats() {
        let mut attrs = StarPathAttributes::default();
        let mut update = AttributeSet::new();
        update.insert("reaction_time".to_string(), StatValue::new(65).unwrap());

        attrs.merge(AttributeCategory::Mental, update);

        assert_eq!(
            attrs.mental.get("reaction_time").map(|v| v.get()),
            Some(65)
        );
        assert_eq!(attrs.mental.len(), 5);
    }

    #[test]
    fn test_level_up_threshold() {
        let mut path = StarPath::new(Uuid::new_v4(), "basketball", Utc::now());
        assert_eq!(path.xp_required_for_next(), 1000);
        assert!(!path.can_level_up());

        path.current_star_level = 2;
        path.star_xp = 2500;
        assert_eq!(path.xp_required_for_next(), 2000);
        assert!(path.can_level_up());
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(
            AttributeCategory::from_str("physical"),
            Some(AttributeCategory::Physical)
        );
        assert_eq!(AttributeCategory::from_str("spiritual"), None);
    }

    #[test]
    fn test_stat_value_serde_rejects_out_of_range() {
        let ok: Result<StatValue, _> = serde_json::from_str("99");
        assert!(ok.is_ok());
        let bad: Result<StatValue, _> = serde_json::from_str("150");
        assert!(bad.is_err());
    }
}
