//! Round resolver integration tests
//!
//! Each test builds a small fight, resolves one round and checks the state
//! the round leaves behind.

use std::collections::BTreeMap;

use crossguard::combat::damage::StrikeReport;
use crossguard::combat::resolution::ExchangeRecord;
use crossguard::combat::{
    resolve_round, Combatant, ComboId, Move, Outcome, RoundInput, RoundReport, WeaponProfile,
};
use crossguard::core::{CombatConfig, CombatantId};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

struct Fighter {
    name: &'static str,
    weapon: WeaponProfile,
    positioning: i32,
    mv: Move,
    combo: ComboId,
}

impl Fighter {
    fn new(name: &'static str, weapon: WeaponProfile, mv: Move) -> Self {
        Self {
            name,
            weapon,
            positioning: 0,
            mv,
            combo: ComboId::Dummy,
        }
    }

    fn positioned(mut self, positioning: i32) -> Self {
        self.positioning = positioning;
        self
    }

    fn using(mut self, combo: ComboId) -> Self {
        self.combo = combo;
        self
    }
}

fn fixed_id(n: u128) -> CombatantId {
    CombatantId(Uuid::from_u128(n))
}

/// Resolve one round of a duel between `a` and `b`
fn duel(
    a: Fighter,
    b: Fighter,
    seed: u64,
) -> (BTreeMap<CombatantId, Combatant>, RoundReport, CombatantId, CombatantId) {
    let (a_id, b_id) = (fixed_id(1), fixed_id(2));
    let mut combatants = BTreeMap::new();
    let mut input = RoundInput::default();
    for (id, fighter, target) in [(a_id, a, b_id), (b_id, b, a_id)] {
        let mut combatant = Combatant::new(fighter.name).armed_with(fighter.weapon, true);
        combatant.id = id;
        combatant.set_positioning(fighter.positioning);
        combatants.insert(id, combatant);
        input.moves.insert(id, fighter.mv);
        if !fighter.combo.is_dummy() {
            input.combos.insert(id, fighter.combo);
        }
        input.targets.insert(id, target);
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let report = resolve_round(&mut combatants, &input, &CombatConfig::default(), &mut rng);
    (combatants, report, a_id, b_id)
}

/// The strike `id` made and the positioning delta it received
fn side(record: &ExchangeRecord, id: CombatantId) -> (&StrikeReport, i32) {
    if record.one == id {
        (&record.strikes.0, record.positioning.0)
    } else {
        (&record.strikes.1, record.positioning.1)
    }
}

fn sole_winner(record: &ExchangeRecord) -> Option<CombatantId> {
    match record.outcome {
        Outcome::PlayerOne => Some(record.one),
        Outcome::PlayerTwo => Some(record.two),
        _ => None,
    }
}

#[test]
fn test_feinted_thrust_turns_high_parry() {
    let (combatants, report, a, b) = duel(
        Fighter::new("Aldric", WeaponProfile::longsword(), Move::Thrust)
            .positioned(3)
            .using(ComboId::Feint),
        Fighter::new("Bryn", WeaponProfile::mace(), Move::HighParry),
        11,
    );
    let record = &report.exchanges[0];
    assert_eq!(sole_winner(record), Some(a));

    let (strike, delta) = side(record, a);
    assert!(strike.damage > 0);
    // offensive gain 1 + feint's 2, minus its cost of 3
    assert_eq!(delta, 0);
    assert_eq!(combatants[&a].positioning(), 3);

    let (parry, _) = side(record, b);
    assert_eq!(parry.damage, 0);
    assert!(combatants[&b].health < combatants[&b].max_health);
    assert_eq!(combatants[&b].wounds.len(), 1);
    assert!(combatants[&a].wounds.is_empty());
}

#[test]
fn test_feint_without_feint_loses_to_high_parry() {
    let (combatants, report, a, b) = duel(
        Fighter::new("Aldric", WeaponProfile::longsword(), Move::Thrust).positioned(3),
        Fighter::new("Bryn", WeaponProfile::mace(), Move::HighParry),
        11,
    );
    assert_eq!(sole_winner(&report.exchanges[0]), Some(b));
    assert_eq!(combatants[&b].health, combatants[&b].max_health);
    // a parry wounds no one
    assert_eq!(combatants[&a].health, combatants[&a].max_health);
}

#[test]
fn test_identical_rampage_goes_to_better_positioning() {
    let (_, report, a, _) = duel(
        Fighter::new("Aldric", WeaponProfile::axe(), Move::Thrust)
            .positioned(5)
            .using(ComboId::Rampage),
        Fighter::new("Bryn", WeaponProfile::axe(), Move::Thrust)
            .positioned(3)
            .using(ComboId::Rampage),
        21,
    );
    assert_eq!(sole_winner(&report.exchanges[0]), Some(a));
    assert!(report.won_any(a));
}

#[test]
fn test_identical_rampage_at_equal_positioning_is_null() {
    let (combatants, report, a, b) = duel(
        Fighter::new("Aldric", WeaponProfile::axe(), Move::Thrust)
            .positioned(4)
            .using(ComboId::Rampage),
        Fighter::new("Bryn", WeaponProfile::axe(), Move::Thrust)
            .positioned(4)
            .using(ComboId::Rampage),
        22,
    );
    assert_eq!(report.exchanges[0].outcome, Outcome::Null);
    for id in [a, b] {
        assert_eq!(combatants[&id].health, combatants[&id].max_health);
        // both still pay for the attempt
        assert_eq!(combatants[&id].positioning(), 2);
    }
}

#[test]
fn test_rampage_feeds_the_defenders_hit() {
    let run = |combo| {
        duel(
            Fighter::new("Aldric", WeaponProfile::axe(), Move::Slash)
                .positioned(2)
                .using(combo),
            Fighter::new("Bryn", WeaponProfile::longsword(), Move::Thrust),
            31,
        )
    };
    let (_, plain, _, b) = run(ComboId::Dummy);
    let (_, raging, _, _) = run(ComboId::Rampage);

    assert_eq!(sole_winner(&plain.exchanges[0]), Some(b));
    assert_eq!(sole_winner(&raging.exchanges[0]), Some(b));
    let (calm_hit, _) = side(&plain.exchanges[0], b);
    let (fed_hit, _) = side(&raging.exchanges[0], b);
    assert_eq!(calm_hit.roll, fed_hit.roll);
    assert_eq!(calm_hit.location, fed_hit.location);
    assert!(fed_hit.damage > calm_hit.damage);
}

#[test]
fn test_backstab_uses_its_own_range_and_gains_nothing() {
    for seed in 0..40 {
        let (combatants, report, a, b) = duel(
            Fighter::new("Aldric", WeaponProfile::dagger(), Move::Dodge)
                .positioned(5)
                .using(ComboId::Backstab),
            Fighter::new("Bryn", WeaponProfile::longsword(), Move::Thrust),
            seed,
        );
        let record = &report.exchanges[0];
        assert_eq!(sole_winner(record), Some(a));
        let (strike, delta) = side(record, a);
        assert!((8..=24).contains(&strike.roll), "roll {}", strike.roll);
        if !strike.critical {
            assert!((8..=24).contains(&strike.damage), "damage {}", strike.damage);
        }
        assert!(delta <= 0);
        assert!(combatants[&a].positioning() <= 5);
        assert!(combatants[&b].health < combatants[&b].max_health);
    }
}

#[test]
fn test_mutual_thrust_rolls_within_weapon_ranges() {
    for seed in 0..20 {
        let (combatants, report, a, b) = duel(
            Fighter::new("Aldric", WeaponProfile::longsword(), Move::Thrust),
            Fighter::new("Bryn", WeaponProfile::greatsword(), Move::Thrust),
            seed,
        );
        let record = &report.exchanges[0];
        assert_eq!(record.outcome, Outcome::Both);
        let (a_strike, _) = side(record, a);
        let (b_strike, _) = side(record, b);
        assert!((4..=7).contains(&a_strike.roll));
        assert!((4..=11).contains(&b_strike.roll));
        assert!(combatants[&a].health < combatants[&a].max_health);
        assert!(combatants[&b].health < combatants[&b].max_health);
    }
}

#[test]
fn test_null_exchange_touches_nobody() {
    for (one, two) in [(Move::Dodge, Move::Duck), (Move::HighCut, Move::HighCut), (Move::Riposte, Move::Riposte)] {
        let (combatants, report, a, b) = duel(
            Fighter::new("Aldric", WeaponProfile::longsword(), one),
            Fighter::new("Bryn", WeaponProfile::longsword(), two),
            5,
        );
        assert_eq!(report.exchanges[0].outcome, Outcome::Null, "{one} vs {two}");
        for id in [a, b] {
            assert_eq!(combatants[&id].health, combatants[&id].max_health);
            assert!(combatants[&id].wounds.is_empty());
        }
    }
}

#[test]
fn test_positioning_stays_clamped_after_a_round() {
    let (combatants, _, a, b) = duel(
        Fighter::new("Aldric", WeaponProfile::longsword(), Move::Disengage).positioned(8),
        Fighter::new("Bryn", WeaponProfile::longsword(), Move::Thrust)
            .positioned(0)
            .using(ComboId::Rampage),
        9,
    );
    assert_eq!(combatants[&a].positioning(), 8);
    assert_eq!(combatants[&b].positioning(), 0);
}

#[test]
fn test_narrative_names_both_sides() {
    let (_, report, _, _) = duel(
        Fighter::new("Aldric", WeaponProfile::longsword(), Move::Thrust),
        Fighter::new("Bryn", WeaponProfile::mace(), Move::Slash),
        3,
    );
    let text = report.narrative.join("\n");
    assert!(text.contains("Aldric"));
    assert!(text.contains("Bryn"));
}
