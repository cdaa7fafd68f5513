//! Equipment break contests
//!
//! A heavy weapon driving into a parry can shatter the parrying item. The
//! attacker rolls two dice, the defender three; ties are re-rolled a bounded
//! number of times and then count as a failure.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::combat::combatant::Combatant;
use crate::combat::constants::{
    ATTACKER_BREAK_DICE, BREAK_HANDS_CAP, BREAK_TRAIT_BONUS, DEFENDER_BREAK_DICE,
    SHIELD_BREAK_SIZE,
};
use crate::combat::effects::trait_keys;
use crate::combat::equipment::Hand;
use crate::combat::weapons::WeaponProfile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakOutcome {
    Shattered { hand: Hand, item: String },
    Failed,
}

fn quality_bonus(item: &WeaponProfile) -> i32 {
    i32::from(item.quality) - 1
}

fn roll_dice<R: Rng + ?Sized>(rng: &mut R, dice: u32, faces: i32) -> i32 {
    let faces = faces.max(1);
    (0..dice).map(|_| rng.gen_range(1..=faces)).sum()
}

/// Contest between a breaking attacker and a parrying defender
///
/// Positioning values are the frozen round-start figures.
pub fn contest_break<R: Rng + ?Sized>(
    attacker: &Combatant,
    attacker_positioning: i32,
    defender: &Combatant,
    defender_positioning: i32,
    retry_limit: u32,
    rng: &mut R,
) -> BreakOutcome {
    let Some(weapon) = attacker
        .loadout
        .striking_weapons()
        .into_iter()
        .map(|(_, w)| w)
        .find(|w| w.category.can_break_equipment() && !w.broken)
    else {
        return BreakOutcome::Failed;
    };

    let Some(hand) = defender.loadout.breakable_items().choose(rng).copied() else {
        return BreakOutcome::Failed;
    };
    let Some(target) = defender.loadout.item(hand) else {
        return BreakOutcome::Failed;
    };

    let attacker_faces = attacker_positioning
        + if attacker.has_trait(trait_keys::BRUTE_STRENGTH) {
            BREAK_TRAIT_BONUS
        } else {
            0
        }
        + i32::from(weapon.hands).min(BREAK_HANDS_CAP)
        + quality_bonus(weapon);

    let steady = (target.is_shield() && defender.has_trait(trait_keys::SHIELD_MASTERY))
        || defender.has_trait(trait_keys::EXPERT_FOOTWORK);
    let size = if target.is_shield() {
        SHIELD_BREAK_SIZE
    } else {
        i32::from(target.hands).min(BREAK_HANDS_CAP)
    };
    let defender_faces = defender_positioning
        + if steady { BREAK_TRAIT_BONUS } else { 0 }
        + size
        + quality_bonus(target);

    for attempt in 1..=retry_limit {
        let attack = roll_dice(rng, ATTACKER_BREAK_DICE, attacker_faces);
        let defence = roll_dice(rng, DEFENDER_BREAK_DICE, defender_faces);
        tracing::debug!(attempt, attack, defence, item = %target.name, "break contest roll");
        match attack.cmp(&defence) {
            std::cmp::Ordering::Greater => {
                return BreakOutcome::Shattered {
                    hand,
                    item: target.name.clone(),
                }
            }
            std::cmp::Ordering::Less => return BreakOutcome::Failed,
            std::cmp::Ordering::Equal => continue,
        }
    }

    BreakOutcome::Failed
}
