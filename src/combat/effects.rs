//! Data-driven status effects and traits
//!
//! These are the stock implementations of [`CombatModifierSource`]. Combos and
//! critical hits refer to effects by key; an [`EffectFactory`] turns a key and
//! a duration into a live source when queued effects are applied.

use std::fmt;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::combat::combo::ComboId;
use crate::combat::modifiers::{CombatModifierSource, MultiplierScope, StatKey, WinCondition};
use crate::combat::moves::Move;
use crate::core::error::Result;

/// Trait keys the resolver checks for by name
pub mod trait_keys {
    pub const INDOMITABLE_WILLPOWER: &str = "indomitable willpower";
    pub const BRUTE_STRENGTH: &str = "brute strength";
    pub const SHIELD_MASTERY: &str = "shield mastery";
    pub const EXPERT_FOOTWORK: &str = "expert footwork";
    pub const COWARDICE: &str = "cowardice";
    pub const RELENTLESS_CUNNING: &str = "relentless cunning";
}

/// Effect keys referenced by the combo catalog and critical hits
pub mod effect_keys {
    pub const STUNNED: &str = "stunned";
    pub const DISARMED: &str = "disarmed";
    pub const DOUBLE_DAMAGE: &str = "double damage";
    pub const OFF_BALANCE: &str = "off-balance";
    pub const KNOCKED_DOWN: &str = "knocked down";
    pub const STUMBLED: &str = "stumbled";
    pub const DAZED: &str = "dazed";
    pub const BUTCHERS_EDGE: &str = "butcher's edge";
    pub const WEAKENED: &str = "weakened";
    pub const PREPARED: &str = "prepared";
    pub const FLEEING: &str = "fleeing";
}

/// One stat contribution, optionally limited to an exchange result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatModifier {
    pub stat: StatKey,
    /// `None` applies regardless of the exchange result
    #[serde(default)]
    pub condition: Option<WinCondition>,
    pub value: f64,
}

impl StatModifier {
    fn contributes(&self, stat: StatKey, condition: WinCondition) -> bool {
        self.stat == stat && self.condition.map_or(true, |c| c == condition)
    }
}

fn sum_stats(modifiers: &[StatModifier], stat: StatKey, condition: WinCondition) -> f64 {
    modifiers
        .iter()
        .filter(|m| m.contributes(stat, condition))
        .map(|m| m.value)
        .sum()
}

/// Which moves an effect vetoes. Pass is never vetoed by an allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveRestriction {
    #[default]
    Free,
    All,
    Banned(Vec<Move>),
    OnlyAllowed(Vec<Move>),
}

impl MoveRestriction {
    pub fn blocks(&self, mv: Move) -> bool {
        match self {
            MoveRestriction::Free => false,
            MoveRestriction::All => true,
            MoveRestriction::Banned(moves) => moves.contains(&mv),
            MoveRestriction::OnlyAllowed(moves) => mv != Move::Pass && !moves.contains(&mv),
        }
    }
}

/// A timed condition on a combatant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub key: String,
    #[serde(default)]
    pub description: String,
    /// Rounds left, `None` for indefinite
    #[serde(default)]
    pub remaining: Option<u32>,
    #[serde(default)]
    pub modifiers: Vec<StatModifier>,
    #[serde(default)]
    pub restriction: MoveRestriction,
    #[serde(default)]
    pub no_positioning: bool,
    #[serde(default)]
    pub disarms: bool,
}

impl StatusEffect {
    pub fn new(key: &str, description: &str) -> Self {
        Self {
            key: key.to_string(),
            description: description.to_string(),
            remaining: None,
            modifiers: Vec::new(),
            restriction: MoveRestriction::Free,
            no_positioning: false,
            disarms: false,
        }
    }

    pub fn with_stat(mut self, stat: StatKey, condition: Option<WinCondition>, value: f64) -> Self {
        self.modifiers.push(StatModifier {
            stat,
            condition,
            value,
        });
        self
    }

    pub fn with_restriction(mut self, restriction: MoveRestriction) -> Self {
        self.restriction = restriction;
        self
    }

    pub fn without_positioning(mut self) -> Self {
        self.no_positioning = true;
        self
    }

    pub fn disarming(mut self) -> Self {
        self.disarms = true;
        self
    }

    pub fn lasting(mut self, rounds: u32) -> Self {
        self.remaining = Some(rounds);
        self
    }

    /// Applied while a combatant tries to leave the fight
    pub fn fleeing() -> Self {
        let mut allowed = Move::DEFENSIVE.to_vec();
        allowed.push(Move::Pass);
        StatusEffect::new(effect_keys::FLEEING, "trying to escape")
            .with_restriction(MoveRestriction::OnlyAllowed(allowed))
            .without_positioning()
    }
}

impl CombatModifierSource for StatusEffect {
    fn key(&self) -> &str {
        &self.key
    }

    fn get_stat(&self, stat: StatKey, condition: WinCondition, _mv: Move, _combo: ComboId) -> f64 {
        sum_stats(&self.modifiers, stat, condition)
    }

    fn blocks_move(&self, mv: Move) -> bool {
        self.restriction.blocks(mv)
    }

    fn blocks_all_moves(&self) -> bool {
        self.restriction == MoveRestriction::All
    }

    fn forbids_positioning(&self) -> bool {
        self.no_positioning
    }

    fn disarms(&self) -> bool {
        self.disarms
    }

    fn remaining_rounds(&self) -> Option<u32> {
        self.remaining
    }

    fn extend(&mut self, rounds: u32) {
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining += rounds;
        }
    }

    fn tick_round(&mut self) -> bool {
        match self.remaining {
            None => true,
            Some(rounds) => {
                let left = rounds.saturating_sub(1);
                self.remaining = Some(left);
                left > 0
            }
        }
    }
}

/// Scales the duration of one effect when it lands on the holder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationMultiplier {
    pub effect: String,
    pub scope: MultiplierScope,
    pub multiplier: f64,
}

/// A permanent property of a combatant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trait {
    pub key: String,
    #[serde(default)]
    pub modifiers: Vec<StatModifier>,
    #[serde(default)]
    pub multipliers: Vec<DurationMultiplier>,
}

impl Trait {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            modifiers: Vec::new(),
            multipliers: Vec::new(),
        }
    }

    pub fn with_stat(mut self, stat: StatKey, condition: Option<WinCondition>, value: f64) -> Self {
        self.modifiers.push(StatModifier {
            stat,
            condition,
            value,
        });
        self
    }

    pub fn with_multiplier(mut self, effect: &str, scope: MultiplierScope, multiplier: f64) -> Self {
        self.multipliers.push(DurationMultiplier {
            effect: effect.to_string(),
            scope,
            multiplier,
        });
        self
    }
}

impl CombatModifierSource for Trait {
    fn key(&self) -> &str {
        &self.key
    }

    fn is_trait(&self) -> bool {
        true
    }

    fn get_stat(&self, stat: StatKey, condition: WinCondition, _mv: Move, _combo: ComboId) -> f64 {
        sum_stats(&self.modifiers, stat, condition)
    }

    fn duration_multiplier(&self, effect: &str, scope: MultiplierScope) -> Option<f64> {
        self.multipliers
            .iter()
            .find(|m| m.effect == effect && m.scope.covers(scope))
            .map(|m| m.multiplier)
    }
}

/// Turns a queued effect key into a live modifier source
pub trait EffectFactory: fmt::Debug + Send + Sync {
    fn create(&self, key: &str, rounds: u32) -> Option<Box<dyn CombatModifierSource>>;
}

#[derive(Debug, Default, Deserialize)]
struct EffectFile {
    #[serde(default)]
    effect: Vec<StatusEffect>,
}

/// Named status-effect templates
#[derive(Debug, Clone, Default)]
pub struct EffectLibrary {
    templates: AHashMap<String, StatusEffect>,
}

impl EffectLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The effects the stock combo catalog and body locations refer to
    pub fn standard() -> Self {
        use effect_keys::*;

        let mut library = Self::new();
        library.insert(
            StatusEffect::new(STUNNED, "reeling and unable to act")
                .with_restriction(MoveRestriction::All),
        );
        library.insert(
            StatusEffect::new(DISARMED, "without a weapon")
                .with_restriction(MoveRestriction::OnlyAllowed(vec![
                    Move::Thrust,
                    Move::Dodge,
                    Move::Duck,
                ]))
                .disarming(),
        );
        library.insert(
            StatusEffect::new(DOUBLE_DAMAGE, "poised for a crushing blow")
                .with_stat(StatKey::DamMultiplier, None, 2.0),
        );
        library.insert(StatusEffect::new(OFF_BALANCE, "off-balance").without_positioning());
        library.insert(
            StatusEffect::new(KNOCKED_DOWN, "sprawled on the ground")
                .with_restriction(MoveRestriction::OnlyAllowed(vec![
                    Move::Duck,
                    Move::Riposte,
                    Move::LowCut,
                ]))
                .with_stat(StatKey::DamVuln, None, 2.0),
        );
        library.insert(
            StatusEffect::new(STUMBLED, "stumbling").with_stat(StatKey::PosVuln, None, -1.0),
        );
        library.insert(
            StatusEffect::new(DAZED, "dazed")
                .with_stat(StatKey::PosGain, None, -1.0)
                .with_stat(StatKey::DamGain, Some(WinCondition::Win), -1.0),
        );
        library.insert(
            StatusEffect::new(BUTCHERS_EDGE, "cutting deep").with_stat(
                StatKey::BleedMultiplier,
                Some(WinCondition::Win),
                0.5,
            ),
        );
        library.insert(
            StatusEffect::new(WEAKENED, "too weakened to attack")
                .with_restriction(MoveRestriction::Banned(Move::OFFENSIVE.to_vec())),
        );
        library.insert(
            StatusEffect::new(PREPARED, "ready to strike").with_stat(
                StatKey::DamGain,
                Some(WinCondition::Win),
                2.0,
            ),
        );
        library.insert(StatusEffect::fleeing());
        library
    }

    /// Standard library extended (or overridden) by `[[effect]]` tables
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: EffectFile = toml::from_str(content)?;
        let mut library = Self::standard();
        for effect in file.effect {
            library.insert(effect);
        }
        Ok(library)
    }

    pub fn insert(&mut self, template: StatusEffect) {
        self.templates.insert(template.key.clone(), template);
    }

    pub fn get(&self, key: &str) -> Option<&StatusEffect> {
        self.templates.get(key)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl EffectFactory for EffectLibrary {
    fn create(&self, key: &str, rounds: u32) -> Option<Box<dyn CombatModifierSource>> {
        let template = self.get(key)?;
        Some(Box::new(template.clone().lasting(rounds.max(1))))
    }
}
