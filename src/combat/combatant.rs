//! A participant in melee encounters
//!
//! Holds everything the resolver reads: health, positioning, wounds,
//! equipment, attached modifiers, and the stance used when no move is
//! submitted.

use serde::Serialize;

use crate::combat::combo::ComboId;
use crate::combat::constants::{DEATH_FRACTION, DEFAULT_MAX_HEALTH, POSITIONING_MAX, POSITIONING_MIN};
use crate::combat::effects::{trait_keys, Trait};
use crate::combat::equipment::{Hand, Loadout};
use crate::combat::modifiers::{CombatModifierSource, ModifierRegistry};
use crate::combat::stance::Stance;
use crate::combat::weapons::WeaponProfile;
use crate::combat::wounds::Wound;
use crate::core::types::{CombatantId, Pronouns};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Vitality {
    Conscious,
    Unconscious,
    Dead,
}

#[derive(Debug)]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    pub pronouns: Pronouns,
    pub health: i32,
    pub max_health: i32,
    positioning: i32,
    pub wounds: Vec<Wound>,
    pub loadout: Loadout,
    pub modifiers: ModifierRegistry,
    pub stance: Stance,
}

impl Combatant {
    pub fn new(name: &str) -> Self {
        Self::with_max_health(name, DEFAULT_MAX_HEALTH)
    }

    pub fn with_max_health(name: &str, max_health: i32) -> Self {
        Self {
            id: CombatantId::new(),
            name: name.to_string(),
            pronouns: Pronouns::default(),
            health: max_health,
            max_health,
            positioning: POSITIONING_MIN,
            wounds: Vec::new(),
            loadout: Loadout::new(),
            modifiers: ModifierRegistry::new(),
            stance: Stance::default(),
        }
    }

    pub fn pronouns(mut self, pronouns: Pronouns) -> Self {
        self.pronouns = pronouns;
        self
    }

    pub fn stance(mut self, stance: Stance) -> Self {
        self.stance = stance;
        self
    }

    /// Wield a weapon in the main hand and learn its mastery trait
    pub fn armed_with(mut self, weapon: WeaponProfile, trained: bool) -> Self {
        self.equip(Hand::Main, weapon, trained);
        self
    }

    pub fn equip(&mut self, hand: Hand, weapon: WeaponProfile, trained: bool) {
        if trained {
            if let Some(key) = weapon.category.mastery_trait() {
                self.learn(Trait::new(key));
            }
        }
        self.loadout.wield(hand, weapon);
    }

    /// Attach a trait unless one with the same key is present
    pub fn learn(&mut self, learned: Trait) {
        if !self.modifiers.has_trait(&learned.key) {
            self.modifiers.add(Box::new(learned));
        }
    }

    pub fn attach(&mut self, source: Box<dyn CombatModifierSource>) {
        self.modifiers.add(source);
    }

    pub fn has_trait(&self, key: &str) -> bool {
        self.modifiers.has_trait(key)
    }

    pub fn positioning(&self) -> i32 {
        self.positioning
    }

    pub fn set_positioning(&mut self, value: i32) {
        self.positioning = value.clamp(POSITIONING_MIN, POSITIONING_MAX);
    }

    pub fn adjust_positioning(&mut self, delta: i32) {
        self.set_positioning(self.positioning + delta);
    }

    pub fn health_fraction(&self) -> f64 {
        if self.max_health <= 0 {
            return 0.0;
        }
        f64::from(self.health) / f64::from(self.max_health)
    }

    /// Record a wound and take its damage immediately
    pub fn add_wound(&mut self, wound: Wound) {
        self.health -= wound.damage;
        self.wounds.push(wound);
    }

    /// Close wounds a little; health is what the open wounds leave
    pub fn heal_tick(&mut self, decrement: i32) {
        for wound in &mut self.wounds {
            wound.heal_tick(decrement);
        }
        self.wounds.retain(|w| w.is_open());
        let open_damage: i32 = self.wounds.iter().map(|w| w.damage).sum();
        self.health = self.max_health - open_damage;
    }

    /// Lose blood from every wound, then let the bleeding slow
    ///
    /// Internal wounds are spent once they have bled. Returns the total lost.
    pub fn bleed_tick(&mut self, divisor: i32, floor: i32) -> i32 {
        let lost: i32 = self.wounds.iter().map(|w| w.bleed).sum();
        self.health -= lost;
        for wound in &mut self.wounds {
            wound.bleed_tick(divisor, floor);
        }
        self.wounds.retain(|w| !w.is_internal() && w.is_open());
        lost
    }

    pub fn is_bleeding(&self) -> bool {
        self.wounds.iter().any(|w| w.bleed > 0)
    }

    pub fn vitality(&self) -> Vitality {
        let death_line = -(f64::from(self.max_health) * DEATH_FRACTION).round() as i32;
        if self.health < death_line {
            Vitality::Dead
        } else if self.health < 0 {
            Vitality::Unconscious
        } else {
            Vitality::Conscious
        }
    }

    /// Combos this combatant can currently call on
    ///
    /// Shield techniques need shield training on top of holding a shield.
    pub fn available_combos(&self) -> Vec<ComboId> {
        let shield_trained = self.has_trait(trait_keys::SHIELD_MASTERY);
        self.loadout
            .granted_combos()
            .into_iter()
            .filter(|c| *c != ComboId::ShieldBash || shield_trained)
            .collect()
    }

    /// One-line prompt, e.g. "Aldric: 64/80 health, 3 positioning, bleeding"
    pub fn status_line(&self) -> String {
        let mut line = format!(
            "{}: {}/{} health, {} positioning",
            self.name, self.health, self.max_health, self.positioning
        );
        if self.is_bleeding() {
            line.push_str(", bleeding");
        }
        let effects: Vec<&str> = self
            .modifiers
            .keys()
            .filter(|k| self.modifiers.get(k).is_some_and(|s| !s.is_trait()))
            .collect();
        if !effects.is_empty() {
            line.push_str(&format!(" [{}]", effects.join(", ")));
        }
        line
    }
}
