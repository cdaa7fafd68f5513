//! Melee combat: catalogs, wound model, modifier protocol and the round resolver

pub mod armor;
pub mod body_zone;
pub mod breaking;
pub mod combatant;
pub mod combo;
pub mod constants;
pub mod damage;
pub mod effects;
pub mod equipment;
pub mod modifiers;
pub mod moves;
pub mod narrative;
pub mod outcome;
pub mod positioning;
pub mod resolution;
pub mod stance;
pub mod weapons;
pub mod wounds;

pub use armor::{ArmorPiece, ArmorType};
pub use body_zone::BodyLocation;
pub use breaking::BreakOutcome;
pub use combatant::{Combatant, Vitality};
pub use combo::{Combo, ComboId};
pub use damage::QueuedEffect;
pub use effects::{effect_keys, trait_keys, EffectFactory, EffectLibrary, StatusEffect, Trait};
pub use equipment::{Hand, Loadout};
pub use modifiers::{CombatModifierSource, ModifierRegistry, StatKey, WinCondition};
pub use moves::{Move, MoveCategory};
pub use outcome::Outcome;
pub use resolution::{pairify, resolve_round, RoundInput, RoundReport};
pub use stance::Stance;
pub use weapons::{DamageType, WeaponCategory, WeaponProfile};
pub use wounds::Wound;
