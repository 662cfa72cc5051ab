//! Integration tests for Star Path configuration and level-ups.

use std::sync::Arc;

use chrono::Utc;
use starpath::auth::capability::{Actor, Role};
use starpath::starpath::service::{StarPathError, StarPathService};
use starpath::starpath::types::{AttributeCategory, AttributeSet, StatValue};
use starpath::storage::player_store::{PlayerStore, User};
use starpath::storage::starpath_store::StarPathStore;
use starpath::{Database, ProgressionEngine};
use uuid::Uuid;

struct Fixture {
    db: Arc<Database>,
    service: StarPathService,
    engine: ProgressionEngine,
}

fn setup() -> Fixture {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let engine = ProgressionEngine::new(db.clone());
    let service = StarPathService::new(db.clone(), engine.clone());
    Fixture {
        db,
        service,
        engine,
    }
}

fn seed_user(db: &Database, role: Role) -> Uuid {
    let user = User {
        id: Uuid::new_v4(),
        name: "Alex".to_string(),
        role,
        created_at: Utc::now(),
    };
    PlayerStore::new(db.connection()).insert_user(&user).unwrap();
    user.id
}

#[test]
fn test_create_star_path_with_defaults() {
    let fx = setup();
    let user_id = seed_user(&fx.db, Role::Athlete);
    let actor = Actor::new(user_id, Role::Athlete);

    let path = fx
        .service
        .create_or_update(&actor, user_id, "soccer", Some("midfielder"), None)
        .unwrap();

    assert_eq!(path.current_star_level, 1);
    assert_eq!(path.star_xp, 0);
    assert_eq!(path.sport_type, "soccer");
    assert_eq!(path.position.as_deref(), Some("midfielder"));
    assert_eq!(
        path.attributes.physical.get("endurance").map(|v| v.get()),
        Some(50)
    );
}

#[test]
fn test_create_requires_existing_user() {
    let fx = setup();
    let ghost = Uuid::new_v4();
    let actor = Actor::new(ghost, Role::Athlete);

    let result = fx.service.create_or_update(&actor, ghost, "basketball", None, None);
    assert!(matches!(result, Err(StarPathError::UserNotFound(_))));
}

#[test]
fn test_update_changes_sport_in_place() {
    let fx = setup();
    let user_id = seed_user(&fx.db, Role::Athlete);
    let actor = Actor::new(user_id, Role::Athlete);

    fx.service
        .create_or_update(&actor, user_id, "basketball", None, None)
        .unwrap();
    let updated = fx
        .service
        .create_or_update(&actor, user_id, "football", Some("quarterback"), None)
        .unwrap();

    assert_eq!(updated.sport_type, "football");
    assert_eq!(updated.position.as_deref(), Some("quarterback"));
    // Still the same record
    assert_eq!(updated.current_star_level, 1);
}

#[test]
fn test_update_attributes_merges_shallowly() {
    let fx = setup();
    let user_id = seed_user(&fx.db, Role::Athlete);
    let actor = Actor::new(user_id, Role::Athlete);

    fx.service
        .create_or_update(&actor, user_id, "basketball", None, None)
        .unwrap();

    let mut values = AttributeSet::new();
    values.insert("speed".to_string(), StatValue::new(85).unwrap());
    let path = fx
        .service
        .update_attributes(&actor, user_id, AttributeCategory::Physical, values)
        .unwrap();

    assert_eq!(path.attributes.physical.get("speed").map(|v| v.get()), Some(85));
    // Unspecified stats keep their prior values
    assert_eq!(
        path.attributes.physical.get("strength").map(|v| v.get()),
        Some(50)
    );
    assert_eq!(path.attributes.technical.get("accuracy").map(|v| v.get()), Some(50));
}

#[test]
fn test_update_attributes_by_coach_allowed() {
    let fx = setup();
    let athlete_id = seed_user(&fx.db, Role::Athlete);
    let athlete = Actor::new(athlete_id, Role::Athlete);
    fx.service
        .create_or_update(&athlete, athlete_id, "basketball", None, None)
        .unwrap();

    let coach = Actor::new(seed_user(&fx.db, Role::Coach), Role::Coach);
    let mut values = AttributeSet::new();
    values.insert("game_iq".to_string(), StatValue::new(70).unwrap());

    let path = fx
        .service
        .update_attributes(&coach, athlete_id, AttributeCategory::Technical, values)
        .unwrap();
    assert_eq!(path.attributes.technical.get("game_iq").map(|v| v.get()), Some(70));
}

#[test]
fn test_update_attributes_by_stranger_rejected_without_mutation() {
    let fx = setup();
    let athlete_id = seed_user(&fx.db, Role::Athlete);
    let athlete = Actor::new(athlete_id, Role::Athlete);
    fx.service
        .create_or_update(&athlete, athlete_id, "basketball", None, None)
        .unwrap();

    let stranger = Actor::new(Uuid::new_v4(), Role::Athlete);
    let mut values = AttributeSet::new();
    values.insert("speed".to_string(), StatValue::new(99).unwrap());

    let result =
        fx.service
            .update_attributes(&stranger, athlete_id, AttributeCategory::Physical, values);
    assert!(matches!(result, Err(StarPathError::Forbidden)));

    // No state change
    let path = fx.service.star_path(athlete_id).unwrap().unwrap();
    assert_eq!(path.attributes.physical.get("speed").map(|v| v.get()), Some(50));
}

#[test]
fn test_level_up_arithmetic() {
    let fx = setup();
    let user_id = seed_user(&fx.db, Role::Athlete);
    let actor = Actor::new(user_id, Role::Athlete);
    let now = Utc::now();

    fx.service
        .create_or_update(&actor, user_id, "basketball", None, None)
        .unwrap();

    // Put the path at star level 2 with 2500 banked XP
    let store = StarPathStore::new(fx.db.connection());
    let mut path = store.get_star_path(user_id).unwrap().unwrap();
    let expected = path.revision;
    path.current_star_level = 2;
    path.star_xp = 2500;
    store.update_star_path(&path, expected).unwrap();

    let outcome = fx.service.level_up_at(user_id, now).unwrap();

    assert_eq!(outcome.previous_level, 2);
    assert_eq!(outcome.new_level, 3);
    // 2000 consumed, remainder kept
    assert_eq!(outcome.remaining_xp, 500);
    // Reward is previous level * 200 regular XP
    assert_eq!(outcome.xp_reward, 400);
    assert_eq!(outcome.xp_award.xp_earned, 400);

    let progress = fx.engine.progress(user_id).unwrap().unwrap();
    assert_eq!(progress.total_xp, 400);
}

#[test]
fn test_level_up_reports_shortfall() {
    let fx = setup();
    let user_id = seed_user(&fx.db, Role::Athlete);
    let actor = Actor::new(user_id, Role::Athlete);

    fx.service
        .create_or_update(&actor, user_id, "basketball", None, None)
        .unwrap();

    let store = StarPathStore::new(fx.db.connection());
    store.add_star_xp(user_id, 600, Utc::now()).unwrap();

    let result = fx.service.level_up(user_id);
    match result {
        Err(StarPathError::InsufficientXp {
            current_xp,
            required_xp,
            xp_needed,
        }) => {
            assert_eq!(current_xp, 600);
            assert_eq!(required_xp, 1000);
            assert_eq!(xp_needed, 400);
        }
        other => panic!("expected InsufficientXp, got {:?}", other.map(|o| o.new_level)),
    }

    // Nothing applied
    let path = fx.service.star_path(user_id).unwrap().unwrap();
    assert_eq!(path.current_star_level, 1);
    assert_eq!(path.star_xp, 600);
    assert!(fx.engine.progress(user_id).unwrap().is_none());
}

#[test]
fn test_level_up_unknown_user() {
    let fx = setup();
    let result = fx.service.level_up(Uuid::new_v4());
    assert!(matches!(result, Err(StarPathError::NotFound(_))));
}
