//! Storage layer: SQLite database, schema, and store types.

pub mod database;
pub mod player_store;
pub mod schema;
pub mod starpath_store;

pub use database::{Database, DatabaseError};
