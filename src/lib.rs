//! Crossguard - turn-based melee combat for text worlds

pub mod combat;
pub mod core;
pub mod encounter;
