//! Status-effect and trait query protocol
//!
//! The resolver never looks inside an effect. It asks every attached
//! [`CombatModifierSource`] for a numeric contribution to a [`StatKey`] and
//! sums the answers, and asks whether a move is vetoed. Anything that
//! implements the trait can influence combat: the data-driven effects in
//! [`crate::combat::effects`], or a game's own scripted objects.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::combat::combo::ComboId;
use crate::combat::moves::Move;

/// Numeric hooks consulted during resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKey {
    /// Flat damage added to hits the holder deals
    DamGain,
    /// Flat damage added to hits the holder receives
    DamVuln,
    /// Multiplier on damage dealt (ignored unless positive)
    DamMultiplier,
    /// Multiplier on damage received (ignored unless positive)
    DamVulnMultiplier,
    /// Internal bleeding inflicted on the holder each round
    Bleed,
    /// Flat bleed added to hits the holder receives
    BleedVuln,
    /// Extra bleed per point of damage dealt
    BleedMultiplier,
    /// Extra bleed per point of damage received
    BleedVulnMultiplier,
    PosGain,
    PosVuln,
    /// Adjusts the holder's effective weapon quality
    WeapQMod,
    /// Adjusts the holder's effective armor quality
    ArmorQMod,
    /// Adjusts the shield bonus of whoever parries the holder
    ShieldQMod,
    /// Added to the positioning cost of the holder's combos
    TechPosMod,
    /// Heal ticks granted to the holder each round
    HealthRegen,
}

/// Exchange result a stat contribution can be conditioned on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinCondition {
    Win,
    Lose,
    Null,
}

/// Which side of an effect application a duration multiplier covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiplierScope {
    /// Effects the holder inflicts on themself
    OnSelf,
    /// Effects inflicted on the holder by an opponent
    OnVictim,
    All,
}

impl MultiplierScope {
    pub fn covers(self, wanted: MultiplierScope) -> bool {
        self == MultiplierScope::All || self == wanted
    }
}

/// Summary of which moves are currently vetoed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BanState {
    Free,
    Partial(Vec<Move>),
    All,
}

/// Anything attached to a combatant that can shape combat
pub trait CombatModifierSource: fmt::Debug + Send + Sync {
    /// Stable key, used for presence checks such as `has_trait`
    fn key(&self) -> &str;

    /// Permanent traits persist; status effects expire
    fn is_trait(&self) -> bool {
        false
    }

    /// Contribution to `stat` for the given exchange context
    fn get_stat(&self, stat: StatKey, condition: WinCondition, mv: Move, combo: ComboId) -> f64;

    fn blocks_move(&self, _mv: Move) -> bool {
        false
    }

    fn blocks_all_moves(&self) -> bool {
        false
    }

    /// Holder gains no positioning while this is attached
    fn forbids_positioning(&self) -> bool {
        false
    }

    /// Holder cannot strike with a weapon while this is attached
    fn disarms(&self) -> bool {
        false
    }

    /// Scaling applied to the duration of `effect` in the given scope
    fn duration_multiplier(&self, _effect: &str, _scope: MultiplierScope) -> Option<f64> {
        None
    }

    /// Rounds left, `None` for indefinite
    fn remaining_rounds(&self) -> Option<u32> {
        None
    }

    /// Add rounds to a running effect
    fn extend(&mut self, _rounds: u32) {}

    /// Advance one round; returns false once the source has expired
    fn tick_round(&mut self) -> bool {
        true
    }
}

/// All modifier sources attached to one combatant
#[derive(Debug, Default)]
pub struct ModifierRegistry {
    sources: Vec<Box<dyn CombatModifierSource>>,
}

impl ModifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, source: Box<dyn CombatModifierSource>) {
        self.sources.push(source);
    }

    /// Detach the first source with `key`
    pub fn remove(&mut self, key: &str) -> Option<Box<dyn CombatModifierSource>> {
        let index = self.sources.iter().position(|s| s.key() == key)?;
        Some(self.sources.remove(index))
    }

    pub fn get(&self, key: &str) -> Option<&dyn CombatModifierSource> {
        self.sources
            .iter()
            .find(|s| s.key() == key)
            .map(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Box<dyn CombatModifierSource>> {
        self.sources.iter_mut().find(|s| s.key() == key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn has_trait(&self, key: &str) -> bool {
        self.sources.iter().any(|s| s.is_trait() && s.key() == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.key())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Summed contribution of every source
    pub fn stat(&self, stat: StatKey, condition: WinCondition, mv: Move, combo: ComboId) -> f64 {
        self.sources
            .iter()
            .map(|s| s.get_stat(stat, condition, mv, combo))
            .sum()
    }

    pub fn all_moves_banned(&self) -> bool {
        self.sources.iter().any(|s| s.blocks_all_moves())
    }

    pub fn is_move_banned(&self, mv: Move) -> bool {
        self.ban_reason(mv).is_some()
    }

    /// Key of the first source vetoing `mv`
    pub fn ban_reason(&self, mv: Move) -> Option<String> {
        self.sources
            .iter()
            .find(|s| s.blocks_all_moves() || s.blocks_move(mv))
            .map(|s| format!("you are {}", s.key()))
    }

    pub fn ban_state(&self) -> BanState {
        if self.all_moves_banned() {
            return BanState::All;
        }
        let banned: Vec<Move> = Move::ALL
            .into_iter()
            .filter(|mv| self.is_move_banned(*mv))
            .collect();
        if banned.is_empty() {
            BanState::Free
        } else {
            BanState::Partial(banned)
        }
    }

    pub fn forbids_positioning(&self) -> bool {
        self.sources.iter().any(|s| s.forbids_positioning())
    }

    pub fn is_disarmed(&self) -> bool {
        self.sources.iter().any(|s| s.disarms())
    }

    /// Combined duration multiplier for `effect`, 1.0 when nothing applies
    pub fn duration_multiplier(&self, effect: &str, scope: MultiplierScope) -> f64 {
        let found: Vec<f64> = self
            .sources
            .iter()
            .filter_map(|s| s.duration_multiplier(effect, scope))
            .collect();
        if found.is_empty() {
            1.0
        } else {
            found.into_iter().product()
        }
    }

    /// Advance every source one round and drop the expired ones
    pub fn tick_round(&mut self) -> Vec<String> {
        let mut expired = Vec::new();
        self.sources.retain_mut(|s| {
            let alive = s.tick_round();
            if !alive {
                expired.push(s.key().to_string());
            }
            alive
        });
        expired
    }
}
