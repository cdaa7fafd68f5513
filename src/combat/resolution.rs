//! Round resolution
//!
//! Resolves every exchange of a round against state frozen at round start.
//! Wounds and positioning land on the live combatants as each exchange
//! finishes; round-start positioning and health fractions are what the
//! outcome, dampener and break contest read, so no exchange sees another's
//! results. Status effects and equipment breakage wait for the end of the
//! round.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use serde::Serialize;

use crate::combat::breaking::{contest_break, BreakOutcome};
use crate::combat::combatant::Combatant;
use crate::combat::combo::ComboId;
use crate::combat::damage::{resolve_strike, QueuedEffect, StrikeContext, StrikeReport};
use crate::combat::equipment::Hand;
use crate::combat::modifiers::WinCondition;
use crate::combat::moves::Move;
use crate::combat::narrative::{narrate_exchange, NarratedSide, Voice};
use crate::combat::outcome::{determine_outcome, Outcome, Side};
use crate::combat::positioning::{exchange_positioning, PositionSide};
use crate::combat::wounds::Wound;
use crate::core::{CombatConfig, CombatError, CombatantId, Result};

/// Everything submitted for one round
#[derive(Debug, Clone, Default)]
pub struct RoundInput {
    pub moves: BTreeMap<CombatantId, Move>,
    pub combos: BTreeMap<CombatantId, ComboId>,
    /// attacker -> target
    pub targets: BTreeMap<CombatantId, CombatantId>,
}

impl RoundInput {
    pub fn move_of(&self, id: CombatantId) -> Move {
        self.moves.get(&id).copied().unwrap_or(Move::Pass)
    }

    pub fn combo_of(&self, id: CombatantId) -> ComboId {
        self.combos.get(&id).copied().unwrap_or_default()
    }

    pub fn is_attacking(&self, attacker: CombatantId, target: CombatantId) -> bool {
        self.targets.get(&attacker) == Some(&target)
    }
}

/// Two combatants facing each other this round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pairing {
    pub one: CombatantId,
    pub two: CombatantId,
    pub one_attacks: bool,
    pub two_attacks: bool,
}

/// Build this round's exchanges from the target map
///
/// Every attacker-target edge yields one pairing; mutual targets share a
/// single pairing.
pub fn pairify(targets: &BTreeMap<CombatantId, CombatantId>) -> Vec<Pairing> {
    let mut seen = BTreeSet::new();
    let mut pairs = Vec::new();
    for (&attacker, &target) in targets {
        if attacker == target {
            continue;
        }
        let (one, two) = if attacker < target {
            (attacker, target)
        } else {
            (target, attacker)
        };
        if !seen.insert((one, two)) {
            continue;
        }
        pairs.push(Pairing {
            one,
            two,
            one_attacks: targets.get(&one) == Some(&two),
            two_attacks: targets.get(&two) == Some(&one),
        });
    }
    pairs
}

#[derive(Debug, Clone, Copy)]
struct Frozen {
    positioning: i32,
    health: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExchangeRecord {
    pub one: CombatantId,
    pub two: CombatantId,
    pub moves: (Move, Move),
    pub combos: (ComboId, ComboId),
    pub outcome: Outcome,
    pub strikes: (StrikeReport, StrikeReport),
    pub positioning: (i32, i32),
    pub break_outcome: Option<BreakOutcome>,
    pub narrative: Vec<String>,
}

impl ExchangeRecord {
    pub fn involves(&self, id: CombatantId) -> bool {
        self.one == id || self.two == id
    }

    fn scored_by(&self, id: CombatantId) -> bool {
        (self.one == id && self.outcome.one_scores()) || (self.two == id && self.outcome.two_scores())
    }

    fn scored_on(&self, id: CombatantId) -> bool {
        (self.one == id && self.outcome.two_scores()) || (self.two == id && self.outcome.one_scores())
    }
}

/// An exchange that couldn't be resolved
#[derive(Debug, Clone, Serialize)]
pub struct SkippedExchange {
    pub one: CombatantId,
    pub two: CombatantId,
    pub reason: String,
}

/// Equipment shattered this round, applied once the round is done
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenItem {
    pub owner: CombatantId,
    pub hand: Hand,
    pub item: String,
}

/// Combatant state after the round
#[derive(Debug, Clone, Serialize)]
pub struct CombatantUpdate {
    pub id: CombatantId,
    pub health: i32,
    pub positioning: i32,
    pub wounds: Vec<Wound>,
    pub queued_effects: Vec<QueuedEffect>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RoundReport {
    pub narrative: Vec<String>,
    pub exchanges: Vec<ExchangeRecord>,
    pub updates: Vec<CombatantUpdate>,
    pub broken_items: Vec<BrokenItem>,
    pub skipped: Vec<SkippedExchange>,
}

impl RoundReport {
    /// Someone landed on `id` this round
    pub fn scored_against(&self, id: CombatantId) -> bool {
        self.exchanges.iter().any(|e| e.scored_on(id))
    }

    pub fn won_any(&self, id: CombatantId) -> bool {
        self.exchanges.iter().any(|e| e.scored_by(id))
    }

    /// How the round went for `id`, as status effects see it
    pub fn round_condition(&self, id: CombatantId) -> WinCondition {
        if self.won_any(id) {
            WinCondition::Win
        } else if self.scored_against(id) {
            WinCondition::Lose
        } else {
            WinCondition::Null
        }
    }

    pub fn queued_effects(&self) -> impl Iterator<Item = &QueuedEffect> {
        self.updates.iter().flat_map(|u| u.queued_effects.iter())
    }

    pub fn update_for(&self, id: CombatantId) -> Option<&CombatantUpdate> {
        self.updates.iter().find(|u| u.id == id)
    }
}

fn missing(id: CombatantId) -> CombatError {
    CombatError::Exchange(format!("combatant {id} is no longer present"))
}

/// The side's combo, or the dummy when it isn't attacking
fn effective_combo(input: &RoundInput, id: CombatantId, attacking: bool) -> Result<ComboId> {
    if !attacking {
        return Ok(ComboId::Dummy);
    }
    let combo = input.combo_of(id);
    let mv = input.move_of(id);
    match combo.def().legality_error(mv) {
        Some(reason) => Err(CombatError::Exchange(format!(
            "{combo} submitted with {mv}, {reason}"
        ))),
        None => Ok(combo),
    }
}

fn voice<'a>(combatant: &'a Combatant, strike: &'a StrikeReport) -> Voice<'a> {
    Voice {
        name: &combatant.name,
        pronouns: combatant.pronouns,
        weapon: &strike.weapon_name,
        barehanded: strike.hand.is_none(),
    }
}

fn resolve_exchange<R: Rng + ?Sized>(
    combatants: &mut BTreeMap<CombatantId, Combatant>,
    frozen: &BTreeMap<CombatantId, Frozen>,
    input: &RoundInput,
    pairing: &Pairing,
    config: &CombatConfig,
    rng: &mut R,
) -> Result<ExchangeRecord> {
    let one = combatants.get(&pairing.one).ok_or_else(|| missing(pairing.one))?;
    let two = combatants.get(&pairing.two).ok_or_else(|| missing(pairing.two))?;
    let one_frozen = frozen.get(&pairing.one).copied().ok_or_else(|| missing(pairing.one))?;
    let two_frozen = frozen.get(&pairing.two).copied().ok_or_else(|| missing(pairing.two))?;

    let one_move = input.move_of(pairing.one);
    let two_move = input.move_of(pairing.two);
    let one_combo = effective_combo(input, pairing.one, pairing.one_attacks)?;
    let two_combo = effective_combo(input, pairing.two, pairing.two_attacks)?;

    let outcome = determine_outcome(
        &Side {
            mv: one_move,
            combo: one_combo,
            attacking: pairing.one_attacks,
            positioning: one_frozen.positioning,
        },
        &Side {
            mv: two_move,
            combo: two_combo,
            attacking: pairing.two_attacks,
            positioning: two_frozen.positioning,
        },
    );

    let one_strike = resolve_strike(
        &StrikeContext {
            attacker: one,
            defender: two,
            attacker_move: one_move,
            defender_move: two_move,
            attacker_combo: one_combo.def(),
            defender_combo: two_combo.def(),
            scored: outcome.one_scores(),
            defender_health: two_frozen.health,
            dampener: &config.dampener,
        },
        rng,
    );
    let two_strike = resolve_strike(
        &StrikeContext {
            attacker: two,
            defender: one,
            attacker_move: two_move,
            defender_move: one_move,
            attacker_combo: two_combo.def(),
            defender_combo: one_combo.def(),
            scored: outcome.two_scores(),
            defender_health: one_frozen.health,
            dampener: &config.dampener,
        },
        rng,
    );

    // a heavy blow turned by a parry may still break the parrying item
    let contest = match outcome {
        Outcome::PlayerOne => Some((two, two_move, two_combo, two_frozen, one, one_move, one_frozen)),
        Outcome::PlayerTwo => Some((one, one_move, one_combo, one_frozen, two, two_move, two_frozen)),
        _ => None,
    };
    let break_outcome = contest.and_then(
        |(loser, loser_move, loser_combo, loser_frozen, winner, winner_move, winner_frozen)| {
            (loser_combo.def().breaks_equipment && loser_move.is_offensive() && winner_move.is_parry())
                .then(|| {
                    contest_break(
                        loser,
                        loser_frozen.positioning,
                        winner,
                        winner_frozen.positioning,
                        config.break_retry_limit,
                        rng,
                    )
                })
        },
    );

    let (one_delta, two_delta) = exchange_positioning(
        &PositionSide {
            combatant: one,
            mv: one_move,
            combo: one_combo.def(),
            strike: &one_strike,
        },
        &PositionSide {
            combatant: two,
            mv: two_move,
            combo: two_combo.def(),
            strike: &two_strike,
        },
        outcome,
        break_outcome.as_ref(),
    );

    let narrative = narrate_exchange(
        &NarratedSide {
            id: one.id,
            voice: voice(one, &one_strike),
            mv: one_move,
            combo: one_combo.def(),
            strike: &one_strike,
            max_health: one.max_health,
        },
        &NarratedSide {
            id: two.id,
            voice: voice(two, &two_strike),
            mv: two_move,
            combo: two_combo.def(),
            strike: &two_strike,
            max_health: two.max_health,
        },
        outcome,
        break_outcome.as_ref(),
    );

    tracing::debug!(
        one = %one.name,
        two = %two.name,
        one_move = %one_move,
        two_move = %two_move,
        ?outcome,
        one_delta,
        two_delta,
        "exchange resolved"
    );

    if let Some(wound) = one_strike.wound.clone() {
        if let Some(target) = combatants.get_mut(&pairing.two) {
            target.add_wound(wound);
        }
    }
    if let Some(wound) = two_strike.wound.clone() {
        if let Some(target) = combatants.get_mut(&pairing.one) {
            target.add_wound(wound);
        }
    }
    if let Some(c) = combatants.get_mut(&pairing.one) {
        c.adjust_positioning(one_delta);
    }
    if let Some(c) = combatants.get_mut(&pairing.two) {
        c.adjust_positioning(two_delta);
    }

    Ok(ExchangeRecord {
        one: pairing.one,
        two: pairing.two,
        moves: (one_move, two_move),
        combos: (one_combo, two_combo),
        outcome,
        strikes: (one_strike, two_strike),
        positioning: (one_delta, two_delta),
        break_outcome,
        narrative,
    })
}

/// Resolve one round for every pairing in `input`
///
/// A failing exchange is logged and skipped; the rest of the round still
/// resolves.
pub fn resolve_round<R: Rng + ?Sized>(
    combatants: &mut BTreeMap<CombatantId, Combatant>,
    input: &RoundInput,
    config: &CombatConfig,
    rng: &mut R,
) -> RoundReport {
    let frozen: BTreeMap<CombatantId, Frozen> = combatants
        .iter()
        .map(|(id, c)| {
            (
                *id,
                Frozen {
                    positioning: c.positioning(),
                    health: c.health_fraction(),
                },
            )
        })
        .collect();

    let mut report = RoundReport::default();
    let mut involved = BTreeSet::new();

    for pairing in pairify(&input.targets) {
        match resolve_exchange(combatants, &frozen, input, &pairing, config, rng) {
            Ok(record) => {
                involved.insert(record.one);
                involved.insert(record.two);
                if let Some(BreakOutcome::Shattered { hand, item }) = &record.break_outcome {
                    let owner = match record.outcome {
                        Outcome::PlayerOne => record.one,
                        _ => record.two,
                    };
                    report.broken_items.push(BrokenItem {
                        owner,
                        hand: *hand,
                        item: item.clone(),
                    });
                }
                report.narrative.extend(record.narrative.iter().cloned());
                report.exchanges.push(record);
            }
            Err(err) => {
                tracing::warn!(one = %pairing.one, two = %pairing.two, error = %err, "exchange skipped");
                report.skipped.push(SkippedExchange {
                    one: pairing.one,
                    two: pairing.two,
                    reason: err.to_string(),
                });
            }
        }
    }

    for broken in &report.broken_items {
        if let Some(item) = combatants
            .get_mut(&broken.owner)
            .and_then(|c| c.loadout.item_mut(broken.hand))
        {
            item.break_item();
        }
    }

    for id in involved {
        let Some(combatant) = combatants.get(&id) else {
            continue;
        };
        let queued_effects = report
            .exchanges
            .iter()
            .flat_map(|e| e.strikes.0.effects.iter().chain(e.strikes.1.effects.iter()))
            .filter(|q| q.target == id)
            .cloned()
            .collect();
        report.updates.push(CombatantUpdate {
            id,
            health: combatant.health,
            positioning: combatant.positioning(),
            wounds: combatant.wounds.clone(),
            queued_effects,
        });
    }

    tracing::info!(
        exchanges = report.exchanges.len(),
        skipped = report.skipped.len(),
        broken = report.broken_items.len(),
        "round resolved"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::weapons::WeaponProfile;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn duel() -> (BTreeMap<CombatantId, Combatant>, CombatantId, CombatantId) {
        let a = Combatant::new("Aldric").armed_with(WeaponProfile::longsword(), true);
        let b = Combatant::new("Bryn").armed_with(WeaponProfile::mace(), true);
        let (a_id, b_id) = (a.id, b.id);
        let mut map = BTreeMap::new();
        map.insert(a_id, a);
        map.insert(b_id, b);
        (map, a_id, b_id)
    }

    fn input(a: CombatantId, a_move: Move, b: CombatantId, b_move: Move) -> RoundInput {
        let mut input = RoundInput::default();
        input.moves.insert(a, a_move);
        input.moves.insert(b, b_move);
        input.targets.insert(a, b);
        input.targets.insert(b, a);
        input
    }

    #[test]
    fn test_pairify_merges_mutual_targets() {
        let (a, b, c) = (CombatantId::new(), CombatantId::new(), CombatantId::new());
        let mut targets = BTreeMap::new();
        targets.insert(a, b);
        targets.insert(b, a);
        targets.insert(c, a);
        let pairs = pairify(&targets);
        assert_eq!(pairs.len(), 2);
        let ab = pairs
            .iter()
            .find(|p| (p.one == a && p.two == b) || (p.one == b && p.two == a))
            .unwrap();
        assert!(ab.one_attacks && ab.two_attacks);
        let ca = pairs
            .iter()
            .find(|p| p.one == c || p.two == c)
            .unwrap();
        assert!(ca.one_attacks != ca.two_attacks);
    }

    #[test]
    fn test_pairify_ignores_self_targets() {
        let a = CombatantId::new();
        let mut targets = BTreeMap::new();
        targets.insert(a, a);
        assert!(pairify(&targets).is_empty());
    }

    #[test]
    fn test_null_exchange_leaves_health_alone() {
        let (mut map, a, b) = duel();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let report = resolve_round(
            &mut map,
            &input(a, Move::Dodge, b, Move::Duck),
            &CombatConfig::default(),
            &mut rng,
        );
        assert_eq!(report.exchanges[0].outcome, Outcome::Null);
        assert_eq!(map[&a].health, map[&a].max_health);
        assert_eq!(map[&b].health, map[&b].max_health);
        assert!(map[&a].wounds.is_empty() && map[&b].wounds.is_empty());
        assert_eq!(report.round_condition(a), WinCondition::Null);
    }

    #[test]
    fn test_mutual_thrust_wounds_both() {
        let (mut map, a, b) = duel();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let report = resolve_round(
            &mut map,
            &input(a, Move::Thrust, b, Move::Thrust),
            &CombatConfig::default(),
            &mut rng,
        );
        assert_eq!(report.exchanges[0].outcome, Outcome::Both);
        assert!(report.won_any(a) && report.won_any(b));
        assert!(report.scored_against(a) && report.scored_against(b));
        assert!(map[&a].health < map[&a].max_health);
        assert!(map[&b].health < map[&b].max_health);
        assert_eq!(report.updates.len(), 2);
        assert!(!report.narrative.is_empty());
    }

    #[test]
    fn test_missing_combatant_is_skipped() {
        let (mut map, a, b) = duel();
        let ghost = CombatantId::new();
        let mut round = input(a, Move::Thrust, b, Move::Dodge);
        round.targets.insert(ghost, a);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let report = resolve_round(&mut map, &round, &CombatConfig::default(), &mut rng);
        assert_eq!(report.exchanges.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.contains("no longer present"));
    }

    #[test]
    fn test_illegal_combo_skips_exchange() {
        let (mut map, a, b) = duel();
        let mut round = input(a, Move::Dodge, b, Move::Thrust);
        round.combos.insert(a, ComboId::Impale);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let report = resolve_round(&mut map, &round, &CombatConfig::default(), &mut rng);
        assert!(report.exchanges.is_empty());
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn test_outcomes_use_round_start_positioning() {
        let a = Combatant::new("A").armed_with(WeaponProfile::axe(), true);
        let b = Combatant::new("B").armed_with(WeaponProfile::axe(), true);
        let c = Combatant::new("C").armed_with(WeaponProfile::axe(), true);
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        let mut map = BTreeMap::new();
        for mut combatant in [a, b, c] {
            combatant.set_positioning(4);
            map.insert(combatant.id, combatant);
        }
        map.get_mut(&a_id).unwrap().set_positioning(5);

        let mut round = RoundInput::default();
        for id in [a_id, b_id, c_id] {
            round.moves.insert(id, Move::Thrust);
            round.combos.insert(id, ComboId::Rampage);
        }
        round.targets.insert(a_id, b_id);
        round.targets.insert(b_id, a_id);
        round.targets.insert(c_id, a_id);

        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let report = resolve_round(&mut map, &round, &CombatConfig::default(), &mut rng);
        // a pays for rampage twice but both tiebreaks see a's frozen 5
        for exchange in &report.exchanges {
            let a_won = (exchange.one == a_id && exchange.outcome == Outcome::PlayerOne)
                || (exchange.two == a_id && exchange.outcome == Outcome::PlayerTwo);
            if exchange.involves(c_id) {
                // c attacks a, a isn't attacking c: no tiebreak, a can't score
                assert!(!a_won);
            } else {
                assert!(a_won);
            }
        }
        for c in map.values() {
            assert!((0..=8).contains(&c.positioning()));
        }
    }
}
