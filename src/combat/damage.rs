//! Damage for one side of an exchange
//!
//! Every side of every exchange runs through [`resolve_strike`], winner or
//! not: losers still roll (so the RNG stream doesn't depend on the outcome)
//! and still queue their unconditional combo effects, but their damage and
//! bleed are zeroed.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::combat::body_zone::{locations_for, BodyLocation};
use crate::combat::combatant::Combatant;
use crate::combat::combo::{Combo, EffectTarget, EffectTrigger};
use crate::combat::constants::CRIT_MULTIPLIER;
use crate::combat::effects::trait_keys;
use crate::combat::equipment::Hand;
use crate::combat::modifiers::{MultiplierScope, StatKey, WinCondition};
use crate::combat::moves::Move;
use crate::combat::weapons::{DamageType, WeaponCategory, WeaponProfile};
use crate::combat::wounds::Wound;
use crate::core::config::DampenerConfig;
use crate::core::types::CombatantId;

/// A status effect waiting for the end of the round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedEffect {
    pub target: CombatantId,
    pub effect: String,
    pub rounds: u32,
}

/// Everything the strike needs to know about its exchange
pub struct StrikeContext<'a> {
    pub attacker: &'a Combatant,
    pub defender: &'a Combatant,
    pub attacker_move: Move,
    pub defender_move: Move,
    pub attacker_combo: &'static Combo,
    pub defender_combo: &'static Combo,
    /// The attacker won (or shared) the exchange
    pub scored: bool,
    /// Defender health fraction frozen at round start
    pub defender_health: f64,
    pub dampener: &'a DampenerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrikeReport {
    /// Hand of the weapon used; `None` for the unarmed fallback
    pub hand: Option<Hand>,
    pub weapon_name: String,
    pub weapon_category: WeaponCategory,
    pub damage_type: DamageType,
    pub roll: i32,
    pub location: Option<BodyLocation>,
    pub critical: bool,
    pub damage: i32,
    pub bleed: i32,
    pub wound: Option<Wound>,
    pub effects: Vec<QueuedEffect>,
}

impl StrikeReport {
    /// Positioning change the strike inflicts through a critical hit
    pub fn critical_positioning(&self) -> i32 {
        match (self.critical, self.location) {
            (true, Some(location)) => location.critical().victim_positioning,
            _ => 0,
        }
    }
}

/// Weapon the attacker swings: a random intact striking weapon, else fists
fn pick_weapon<'a, R: Rng + ?Sized>(
    attacker: &'a Combatant,
    rng: &mut R,
) -> (Option<Hand>, &'a WeaponProfile) {
    if attacker.modifiers.is_disarmed() {
        return (None, &attacker.loadout.unarmed);
    }
    let weapons = attacker.loadout.striking_weapons();
    match weapons.choose(rng) {
        Some((hand, weapon)) => (Some(*hand), *weapon),
        None => (None, &attacker.loadout.unarmed),
    }
}

fn scaled_rounds(repeats: u32, multiplier: f64) -> u32 {
    (f64::from(repeats) * multiplier).round().max(0.0) as u32
}

pub fn resolve_strike<R: Rng + ?Sized>(ctx: &StrikeContext<'_>, rng: &mut R) -> StrikeReport {
    let attacker = ctx.attacker;
    let defender = ctx.defender;
    let combo = ctx.attacker_combo;
    let condition = if ctx.scored {
        WinCondition::Win
    } else {
        WinCondition::Lose
    };
    let a_stat = |stat| {
        attacker
            .modifiers
            .stat(stat, condition, ctx.attacker_move, combo.id)
    };
    let d_stat = |stat| {
        defender.modifiers.stat(
            stat,
            WinCondition::Lose,
            ctx.defender_move,
            ctx.defender_combo.id,
        )
    };

    let (hand, weapon) = pick_weapon(attacker, rng);
    let bonus = weapon.quality_bonus(a_stat(StatKey::WeapQMod).round() as i32);
    let (low, high) = match combo.hard_damage_range {
        Some(range) => range,
        None => (weapon.damage.0 + bonus, weapon.damage.1 + bonus),
    };
    let high = high.max(low);

    let locations = locations_for(ctx.attacker_move);
    let mut location = locations.choose(rng).copied();

    let crit_roll = f64::from(rng.gen_range(1..=100)) / 100.0;
    let mut critical =
        location.is_some() && crit_roll <= weapon.crit_chance + combo.critical_chance_bonus;

    let roll = rng.gen_range(low..=high);

    let mut damage = 0.0;
    let mut bleed = 0.0;
    if let (true, Some(loc)) = (critical, location) {
        let profile = loc.critical();
        damage += f64::from(profile.bonus_damage);
        bleed += f64::from(profile.bonus_bleed);
    }

    damage += a_stat(StatKey::DamGain) + d_stat(StatKey::DamVuln);
    bleed += d_stat(StatKey::BleedVuln);
    bleed += f64::from(combo.victim_bleed + ctx.defender_combo.performer_bleed);
    damage += f64::from(combo.victim_damage + ctx.defender_combo.performer_damage);
    damage += f64::from(roll);

    let move_def = ctx.attacker_move.def();
    damage += f64::from(move_def.bonus_damage);
    bleed += f64::from(move_def.bonus_bleed);

    if critical {
        damage *= CRIT_MULTIPLIER;
    }
    damage *= combo.damage_multiplier;
    let multiplier = a_stat(StatKey::DamMultiplier);
    if multiplier > 0.0 {
        damage *= multiplier;
    }
    let vuln_multiplier = d_stat(StatKey::DamVulnMultiplier);
    if vuln_multiplier > 0.0 {
        damage *= vuln_multiplier;
    }

    let mut damage = match location {
        Some(loc) => {
            let mitigation = defender
                .loadout
                .armor_at(loc)
                .map(|piece| {
                    piece.mitigation(
                        weapon.damage_type,
                        d_stat(StatKey::ArmorQMod).round() as i32,
                    )
                })
                .unwrap_or(0);
            (damage * loc.damage_multiplier() - f64::from(mitigation)).round() as i32
        }
        None => damage.round() as i32,
    };

    if damage > 0 {
        let dealt = f64::from(damage);
        bleed += (dealt * combo.bleed_multiplier).round();
        bleed += (dealt * a_stat(StatKey::BleedMultiplier)).round();
        bleed += (dealt * d_stat(StatKey::BleedVulnMultiplier)).round();
    }
    let mut bleed = bleed.round() as i32;

    let defensive_miss = !ctx.attacker_move.is_offensive() && combo.hard_damage_range.is_none();
    if !ctx.scored || defensive_miss {
        damage = 0;
        bleed = 0;
        critical = false;
        location = None;
    }

    if damage > 0 && !defender.has_trait(trait_keys::INDOMITABLE_WILLPOWER) {
        let d = ctx.dampener;
        let factor = if ctx.defender_health < d.severe_threshold {
            Some(d.severe_factor)
        } else if ctx.defender_health <= d.moderate_threshold {
            Some(d.moderate_factor)
        } else {
            None
        };
        if let Some(factor) = factor {
            damage = (f64::from(damage) * factor).round() as i32;
        }
    }

    let wound = match location {
        Some(loc) if damage > 0 => Some(Wound::new(loc, damage, bleed, weapon.damage_type)),
        _ if bleed > 0 => Some(Wound::internal(bleed)),
        _ => None,
    };

    let mut effects = Vec::new();
    if let (true, Some(loc)) = (critical, location) {
        let profile = loc.critical();
        let multiplier = defender
            .modifiers
            .duration_multiplier(profile.effect, MultiplierScope::OnVictim);
        effects.push(QueuedEffect {
            target: defender.id,
            effect: profile.effect.to_string(),
            rounds: scaled_rounds(profile.repeats, multiplier),
        });
    }

    for triggered in combo.triggered_effects {
        if triggered.trigger == EffectTrigger::OnWin && !ctx.scored {
            continue;
        }
        let on_victim = matches!(triggered.target, EffectTarget::Victim | EffectTarget::Both);
        let on_self = matches!(triggered.target, EffectTarget::Performer | EffectTarget::Both);
        if on_victim {
            let multiplier = defender
                .modifiers
                .duration_multiplier(triggered.effect, MultiplierScope::OnVictim);
            effects.push(QueuedEffect {
                target: defender.id,
                effect: triggered.effect.to_string(),
                rounds: scaled_rounds(triggered.repeats, multiplier),
            });
        }
        if on_self {
            let multiplier = attacker
                .modifiers
                .duration_multiplier(triggered.effect, MultiplierScope::OnSelf);
            effects.push(QueuedEffect {
                target: attacker.id,
                effect: triggered.effect.to_string(),
                rounds: scaled_rounds(triggered.repeats, multiplier),
            });
        }
    }
    effects.retain(|e| e.rounds > 0);

    tracing::debug!(
        attacker = %attacker.name,
        defender = %defender.name,
        mv = %ctx.attacker_move,
        roll,
        damage,
        bleed,
        critical,
        "strike resolved"
    );

    StrikeReport {
        hand,
        weapon_name: weapon.name.clone(),
        weapon_category: weapon.category,
        damage_type: weapon.damage_type,
        roll,
        location,
        critical,
        damage,
        bleed,
        wound,
        effects,
    }
}
