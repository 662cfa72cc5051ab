//! Workout verification and XP crediting.

pub mod verification;
