//! Actor and capability checks.

pub mod capability;
