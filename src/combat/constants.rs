//! Combat rule constants - the fixed shape of the system
//!
//! Operator-tunable values live in `CombatConfig`; these define the game.

// Positioning bounds
pub const POSITIONING_MIN: i32 = 0;
pub const POSITIONING_MAX: i32 = 8;

// Base positioning gain for winning an exchange
pub const OFFENSIVE_POSITIONING_GAIN: i32 = 1;
pub const DEFENSIVE_POSITIONING_GAIN: i32 = 2;
pub const NO_MASTERY_PENALTY: i32 = 1;

// Equipment quality
pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 4;
pub const QUALITY_BONUS_CAP: i32 = 3;
pub const SHIELD_BONUS_CAP: i32 = 3;
pub const ARMOR_CLASS_HEADROOM: i32 = 3;
pub const BROKEN_DAMAGE: (i32, i32) = (1, 3);

// Strikes
pub const BASE_CRIT_CHANCE: f64 = 0.20;
pub const HEAVY_CRIT_CHANCE: f64 = 0.25;
pub const CRIT_MULTIPLIER: f64 = 1.5;

// Break contests
pub const ATTACKER_BREAK_DICE: u32 = 2;
pub const DEFENDER_BREAK_DICE: u32 = 3;
pub const BREAK_TRAIT_BONUS: i32 = 3;
pub const BREAK_HANDS_CAP: i32 = 2;
pub const SHIELD_BREAK_SIZE: i32 = 2;

// Health
pub const DEFAULT_MAX_HEALTH: i32 = 80;
/// Health below `-max * DEATH_FRACTION` is fatal
pub const DEATH_FRACTION: f64 = 0.1;
