//! Armor types and mitigation
//!
//! Armor subtracts a flat amount from a hit at the location it covers.
//! Each type has a base armor class and a per-damage-type modifier; a
//! positive modifier means the type is weak against that damage.

use serde::{Deserialize, Serialize};

use crate::combat::constants::{ARMOR_CLASS_HEADROOM, MAX_QUALITY, MIN_QUALITY};
use crate::combat::weapons::DamageType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmorType {
    /// Scavenged padding and scraps
    Makeshift,
    /// Cured hide
    Leather,
    /// Interlocking rings
    Maille,
    /// Solid metal
    Plate,
}

impl ArmorType {
    pub fn base_class(&self) -> i32 {
        match self {
            ArmorType::Makeshift | ArmorType::Leather => 1,
            ArmorType::Maille => 2,
            ArmorType::Plate => 3,
        }
    }

    /// Modifier subtracted from the armor class against `damage_type`
    pub fn versus(&self, damage_type: DamageType) -> i32 {
        match (self, damage_type) {
            (ArmorType::Makeshift, DamageType::Pierce) => -1,
            (ArmorType::Makeshift, _) => 0,
            (ArmorType::Leather, DamageType::Blunt) => 1,
            (ArmorType::Leather, _) => 0,
            (ArmorType::Maille, DamageType::Pierce) => 0,
            (ArmorType::Maille, _) => 1,
            (ArmorType::Plate, DamageType::Edge) => 1,
            (ArmorType::Plate, DamageType::Blunt) => 0,
            (ArmorType::Plate, DamageType::Pierce) => 1,
        }
    }
}

/// A worn armor piece covering one body location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmorPiece {
    pub name: String,
    pub armor_type: ArmorType,
    pub quality: u8,
}

impl ArmorPiece {
    pub fn new(name: &str, armor_type: ArmorType, quality: u8) -> Self {
        Self {
            name: name.to_string(),
            armor_type,
            quality: quality.clamp(MIN_QUALITY, MAX_QUALITY),
        }
    }

    /// Armor class after quality, never more than base + headroom
    pub fn effective_class(&self, quality_mod: i32) -> i32 {
        let base = self.armor_type.base_class();
        (base + i32::from(self.quality) - 1 + quality_mod).min(base + ARMOR_CLASS_HEADROOM)
    }

    /// Flat damage removed from a hit of `damage_type`
    pub fn mitigation(&self, damage_type: DamageType, quality_mod: i32) -> i32 {
        self.effective_class(quality_mod) - self.armor_type.versus(damage_type)
    }
}
