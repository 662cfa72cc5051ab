//! Database schema definitions for the progression engine.

/// SQL schema for creating all database tables.
pub const SCHEMA: &str = r#"
-- Users table
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'athlete',
    created_at TEXT NOT NULL
);

-- Uploaded training videos (ownership lookups only)
CREATE TABLE IF NOT EXISTS videos (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    title TEXT NOT NULL,
    uploaded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_videos_user_id ON videos(user_id);

-- Player progression table (one row per athlete)
CREATE TABLE IF NOT EXISTS player_progress (
    user_id TEXT PRIMARY KEY REFERENCES users(id),
    current_level INTEGER NOT NULL DEFAULT 1,
    level_xp INTEGER NOT NULL DEFAULT 0,
    xp_to_next_level INTEGER NOT NULL DEFAULT 100,
    total_xp INTEGER NOT NULL DEFAULT 0,
    streak_days INTEGER NOT NULL DEFAULT 0,
    last_active TEXT,
    rank TEXT NOT NULL DEFAULT 'rookie',
    revision INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- XP audit log (append-only)
CREATE TABLE IF NOT EXISTS xp_transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES users(id),
    amount INTEGER NOT NULL,
    source TEXT NOT NULL,
    description TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_xp_transactions_user_id ON xp_transactions(user_id);

-- Star Path table (one row per athlete)
CREATE TABLE IF NOT EXISTS star_paths (
    user_id TEXT PRIMARY KEY REFERENCES users(id),
    current_star_level INTEGER NOT NULL DEFAULT 1,
    star_xp INTEGER NOT NULL DEFAULT 0,
    sport_type TEXT NOT NULL DEFAULT 'basketball',
    position TEXT,
    physical_json TEXT NOT NULL,
    technical_json TEXT NOT NULL,
    mental_json TEXT NOT NULL,
    revision INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Workout verification records (review itself happens externally)
CREATE TABLE IF NOT EXISTS workout_verifications (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    video_id TEXT NOT NULL REFERENCES videos(id),
    workout_type TEXT NOT NULL,
    duration_minutes INTEGER,
    intensity INTEGER,
    notes TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    xp_earned INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_workout_verifications_user_id ON workout_verifications(user_id);
CREATE INDEX IF NOT EXISTS idx_workout_verifications_status ON workout_verifications(user_id, status);
"#;

/// SQL for schema version tracking (migrations)
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version
pub const CURRENT_VERSION: i32 = 1;
