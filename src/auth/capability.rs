//! Capability checks for acting on athlete-owned records.
//!
//! The upstream authentication layer supplies the acting user; this module
//! answers whether that actor may touch a given athlete's data.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform role, as stored on the user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Athlete,
    Coach,
    Admin,
}

impl Role {
    /// Stable identifier used in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Athlete => "athlete",
            Role::Coach => "coach",
            Role::Admin => "admin",
        }
    }

    /// Parse the database identifier; unknown roles default to athlete.
    pub fn from_str(s: &str) -> Self {
        match s {
            "coach" => Role::Coach,
            "admin" => Role::Admin,
            _ => Role::Athlete,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The authenticated user performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// Whether `actor` may modify records owned by `athlete_id`.
///
/// Athletes manage their own records; coaches and admins manage anyone's.
pub fn can_manage_athlete(actor: &Actor, athlete_id: Uuid) -> bool {
    actor.user_id == athlete_id || matches!(actor.role, Role::Coach | Role::Admin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_athlete_manages_self() {
        let id = Uuid::new_v4();
        let actor = Actor::new(id, Role::Athlete);
        assert!(can_manage_athlete(&actor, id));
    }

    #[test]
    fn test_athlete_cannot_manage_others() {
        let actor = Actor::new(Uuid::new_v4(), Role::Athlete);
        assert!(!can_manage_athlete(&actor, Uuid::new_v4()));
    }

    #[test]
    fn test_coach_and_admin_manage_anyone() {
        let other = Uuid::new_v4();
        assert!(can_manage_athlete(
            &Actor::new(Uuid::new_v4(), Role::Coach),
            other
        ));
        assert!(can_manage_athlete(
            &Actor::new(Uuid::new_v4(), Role::Admin),
            other
        ));
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Athlete, Role::Coach, Role::Admin] {
            assert_eq!(Role::from_str(role.as_str()), role);
        }
        assert_eq!(Role::from_str("scout"), Role::Athlete);
    }
}
