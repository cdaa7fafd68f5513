//! Body locations for hit resolution (6 locations)
//!
//! Each location lists the moves able to reach it, scales the damage of hits
//! that land there, and carries a critical-hit profile.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::combat::effects::effect_keys;
use crate::combat::moves::Move;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyLocation {
    Head,
    Torso,
    Arms,
    Hands,
    Legs,
    Feet,
}

/// Extra consequences of a critical hit at a location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CriticalProfile {
    pub bonus_damage: i32,
    pub bonus_bleed: i32,
    /// Positioning change inflicted on the victim
    pub victim_positioning: i32,
    pub effect: &'static str,
    pub repeats: u32,
}

impl BodyLocation {
    pub fn all() -> [BodyLocation; 6] {
        [
            BodyLocation::Head,
            BodyLocation::Torso,
            BodyLocation::Arms,
            BodyLocation::Hands,
            BodyLocation::Legs,
            BodyLocation::Feet,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BodyLocation::Head => "head",
            BodyLocation::Torso => "torso",
            BodyLocation::Arms => "arm",
            BodyLocation::Hands => "hand",
            BodyLocation::Legs => "leg",
            BodyLocation::Feet => "foot",
        }
    }

    /// Moves that can land a hit here
    pub fn hit_moves(&self) -> &'static [Move] {
        match self {
            BodyLocation::Head => &[Move::HighCut, Move::Thrust, Move::Slash],
            BodyLocation::Torso => &[
                Move::Thrust,
                Move::HighCut,
                Move::LowCut,
                Move::Slash,
                Move::Riposte,
                Move::Dodge,
                Move::Duck,
            ],
            BodyLocation::Arms => &[Move::HighCut, Move::Slash, Move::Riposte],
            BodyLocation::Hands => &[Move::Riposte, Move::Thrust],
            BodyLocation::Legs => &[Move::LowCut, Move::Slash, Move::Thrust, Move::Duck],
            BodyLocation::Feet => &[Move::LowCut],
        }
    }

    pub fn damage_multiplier(&self) -> f64 {
        match self {
            BodyLocation::Head => 1.25,
            BodyLocation::Torso => 1.0,
            BodyLocation::Arms | BodyLocation::Legs => 0.75,
            BodyLocation::Hands | BodyLocation::Feet => 0.5,
        }
    }

    pub fn critical(&self) -> CriticalProfile {
        match self {
            BodyLocation::Head => CriticalProfile {
                bonus_damage: 4,
                bonus_bleed: 2,
                victim_positioning: -1,
                effect: effect_keys::DAZED,
                repeats: 1,
            },
            BodyLocation::Torso => CriticalProfile {
                bonus_damage: 2,
                bonus_bleed: 4,
                victim_positioning: 0,
                effect: effect_keys::OFF_BALANCE,
                repeats: 1,
            },
            BodyLocation::Arms => CriticalProfile {
                bonus_damage: 1,
                bonus_bleed: 2,
                victim_positioning: -1,
                effect: effect_keys::DISARMED,
                repeats: 1,
            },
            BodyLocation::Hands => CriticalProfile {
                bonus_damage: 0,
                bonus_bleed: 2,
                victim_positioning: -1,
                effect: effect_keys::DISARMED,
                repeats: 1,
            },
            BodyLocation::Legs => CriticalProfile {
                bonus_damage: 2,
                bonus_bleed: 2,
                victim_positioning: -2,
                effect: effect_keys::STUMBLED,
                repeats: 1,
            },
            BodyLocation::Feet => CriticalProfile {
                bonus_damage: 0,
                bonus_bleed: 1,
                victim_positioning: -2,
                effect: effect_keys::KNOCKED_DOWN,
                repeats: 1,
            },
        }
    }
}

impl fmt::Display for BodyLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Locations a move can reach
pub fn locations_for(mv: Move) -> Vec<BodyLocation> {
    BodyLocation::all()
        .into_iter()
        .filter(|loc| loc.hit_moves().contains(&mv))
        .collect()
}
