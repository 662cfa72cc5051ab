//! Star Path: sport-specific attribute and level progression.

pub mod service;
pub mod types;
