//! Weapon profiles
//!
//! A weapon is plain data: a category (which decides its combos, its mastery
//! trait and whether it can break equipment), a damage range and type, and a
//! table of positioning modifiers keyed by move.

use serde::{Deserialize, Serialize};

use crate::combat::combo::ComboId;
use crate::combat::constants::{
    BASE_CRIT_CHANCE, BROKEN_DAMAGE, HEAVY_CRIT_CHANCE, MAX_QUALITY, MIN_QUALITY, QUALITY_BONUS_CAP,
};
use crate::combat::moves::Move;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Edge,
    Blunt,
    Pierce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponCategory {
    Longsword,
    Greatsword,
    Axe,
    Mace,
    Stave,
    Dagger,
    Spear,
    Shield,
    Unarmed,
}

impl WeaponCategory {
    /// Combos this category grants
    pub fn combos(self) -> &'static [ComboId] {
        match self {
            WeaponCategory::Longsword => &[ComboId::Feint, ComboId::Beat, ComboId::Impale],
            WeaponCategory::Axe => &[ComboId::Rampage, ComboId::Cleave, ComboId::Rage],
            WeaponCategory::Mace => &[ComboId::Daze, ComboId::Stun, ComboId::Break],
            WeaponCategory::Greatsword => &[ComboId::Clash, ComboId::Smash, ComboId::Stagger],
            WeaponCategory::Stave => &[ComboId::Disarm, ComboId::Sweep, ComboId::Flurry],
            WeaponCategory::Dagger => &[ComboId::Circle, ComboId::Twist, ComboId::Backstab],
            WeaponCategory::Spear => &[ComboId::Counter, ComboId::Sweep, ComboId::Skewer],
            WeaponCategory::Shield => &[ComboId::ShieldBash],
            WeaponCategory::Unarmed => &[],
        }
    }

    /// Trait key that marks a combatant as trained with this category
    pub fn mastery_trait(self) -> Option<&'static str> {
        match self {
            WeaponCategory::Longsword => Some("longsword mastery"),
            WeaponCategory::Greatsword => Some("greatsword mastery"),
            WeaponCategory::Axe => Some("axe mastery"),
            WeaponCategory::Mace => Some("mace mastery"),
            WeaponCategory::Stave => Some("stave mastery"),
            WeaponCategory::Dagger => Some("dagger mastery"),
            WeaponCategory::Spear => Some("spear mastery"),
            WeaponCategory::Shield => Some(crate::combat::effects::trait_keys::SHIELD_MASTERY),
            WeaponCategory::Unarmed => None,
        }
    }

    /// Heavy weapons that can attempt to break an opponent's equipment
    pub fn can_break_equipment(self) -> bool {
        matches!(
            self,
            WeaponCategory::Axe | WeaponCategory::Mace | WeaponCategory::Greatsword
        )
    }
}

/// Which moves a positional modifier covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveSet {
    All,
    Only(Vec<Move>),
}

impl MoveSet {
    pub fn contains(&self, mv: Move) -> bool {
        match self {
            MoveSet::All => true,
            MoveSet::Only(moves) => moves.contains(&mv),
        }
    }
}

/// Positioning adjustment applied when the wielder wins with a covered move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionalModifier {
    pub delta: i32,
    pub moves: MoveSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponProfile {
    pub name: String,
    pub category: WeaponCategory,
    pub damage: (i32, i32),
    pub damage_type: DamageType,
    /// 1 (poor) to 4 (masterwork)
    pub quality: u8,
    pub hands: u8,
    pub crit_chance: f64,
    pub broken: bool,
    /// Range restored on repair
    pub intact_damage: Option<(i32, i32)>,
    pub positional_modifiers: Vec<PositionalModifier>,
    pub breakable: bool,
}

impl WeaponProfile {
    fn base(name: &str, category: WeaponCategory, damage: (i32, i32), damage_type: DamageType) -> Self {
        Self {
            name: name.to_string(),
            category,
            damage,
            damage_type,
            quality: MIN_QUALITY,
            hands: 1,
            crit_chance: BASE_CRIT_CHANCE,
            broken: false,
            intact_damage: None,
            positional_modifiers: vec![PositionalModifier {
                delta: 0,
                moves: MoveSet::All,
            }],
            breakable: true,
        }
    }

    fn two_handed(mut self) -> Self {
        self.hands = 2;
        self.crit_chance = HEAVY_CRIT_CHANCE;
        self
    }

    fn positioning(mut self, delta: i32, moves: &[Move]) -> Self {
        self.positional_modifiers = vec![PositionalModifier {
            delta,
            moves: MoveSet::Only(moves.to_vec()),
        }];
        self
    }

    pub fn longsword() -> Self {
        Self::base("longsword", WeaponCategory::Longsword, (4, 7), DamageType::Edge)
    }

    pub fn greatsword() -> Self {
        Self::base("greatsword", WeaponCategory::Greatsword, (4, 11), DamageType::Edge)
            .two_handed()
            .positioning(-1, &Move::PARRIES)
    }

    pub fn axe() -> Self {
        Self::base("axe", WeaponCategory::Axe, (4, 7), DamageType::Edge)
    }

    pub fn battleaxe() -> Self {
        Self::base("battleaxe", WeaponCategory::Axe, (4, 11), DamageType::Edge)
            .two_handed()
            .positioning(-8, &[Move::HighParry, Move::LowParry, Move::Disengage])
    }

    pub fn mace() -> Self {
        Self::base("mace", WeaponCategory::Mace, (4, 7), DamageType::Blunt)
    }

    pub fn warhammer() -> Self {
        Self::base("warhammer", WeaponCategory::Mace, (4, 11), DamageType::Blunt)
            .two_handed()
            .positioning(-1, &Move::PARRIES)
    }

    pub fn stave() -> Self {
        Self::base("stave", WeaponCategory::Stave, (4, 9), DamageType::Blunt)
            .two_handed()
            .positioning(1, &Move::PARRIES)
    }

    pub fn dagger() -> Self {
        Self::base("dagger", WeaponCategory::Dagger, (3, 6), DamageType::Pierce)
            .positioning(1, &[Move::Dodge, Move::Duck])
    }

    pub fn spear() -> Self {
        Self::base("spear", WeaponCategory::Spear, (4, 7), DamageType::Pierce)
            .positioning(-1, &Move::PARRIES)
    }

    pub fn longspear() -> Self {
        Self::base("longspear", WeaponCategory::Spear, (4, 11), DamageType::Pierce).two_handed()
    }

    pub fn shield() -> Self {
        let mut shield = Self::base("shield", WeaponCategory::Shield, (0, 0), DamageType::Blunt);
        shield.crit_chance = 0.0;
        shield
    }

    /// Bare hands, used when nothing else can strike
    pub fn fists() -> Self {
        let mut fists = Self::base("fists", WeaponCategory::Unarmed, (1, 3), DamageType::Blunt);
        fists.crit_chance = 0.0;
        fists.breakable = false;
        fists
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(MIN_QUALITY, MAX_QUALITY);
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn is_shield(&self) -> bool {
        self.category == WeaponCategory::Shield
    }

    pub fn is_unarmed(&self) -> bool {
        self.category == WeaponCategory::Unarmed
    }

    /// Damage bonus from quality, capped
    pub fn quality_bonus(&self, quality_mod: i32) -> i32 {
        if self.is_unarmed() {
            return 0;
        }
        (i32::from(self.quality) - 1 + quality_mod).min(QUALITY_BONUS_CAP)
    }

    /// Best positional modifier covering `mv`, if any entry covers it
    pub fn positional_modifier_for(&self, mv: Move) -> Option<i32> {
        self.positional_modifiers
            .iter()
            .filter(|m| m.moves.contains(mv))
            .map(|m| m.delta)
            .max()
    }

    /// Break the item; its damage drops until repaired
    pub fn break_item(&mut self) {
        if self.broken {
            return;
        }
        self.broken = true;
        self.intact_damage = Some(self.damage);
        self.damage = BROKEN_DAMAGE;
    }

    pub fn repair(&mut self) {
        if let Some(damage) = self.intact_damage.take() {
            self.damage = damage;
        }
        self.broken = false;
    }
}
