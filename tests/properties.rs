//! Property tests over the move matrix, positioning and wound decay

use std::collections::BTreeMap;

use crossguard::combat::moves::Relation;
use crossguard::combat::{
    resolve_round, BodyLocation, Combatant, DamageType, Move, Outcome, RoundInput, WeaponProfile,
    Wound,
};
use crossguard::core::CombatConfig;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn any_move() -> impl Strategy<Value = Move> {
    prop::sample::select(Move::ALL.to_vec())
}

fn fighting_move() -> impl Strategy<Value = Move> {
    prop::sample::select(Move::FIGHTING.to_vec())
}

proptest! {
    #[test]
    fn test_relation_is_mirrored(a in any_move(), b in any_move()) {
        let forward = a.relation(b);
        let backward = b.relation(a);
        prop_assert_eq!(forward.mirrored(), backward);
        prop_assert_eq!(forward == Relation::Beats, backward == Relation::LosesTo);
    }

    #[test]
    fn test_positioning_clamped_for_any_delta(start in -20i32..20, deltas in prop::collection::vec(-12i32..12, 0..10)) {
        let mut combatant = Combatant::new("Aldric");
        combatant.set_positioning(start);
        for delta in deltas {
            combatant.adjust_positioning(delta);
            prop_assert!((0..=8).contains(&combatant.positioning()));
        }
    }

    #[test]
    fn test_round_keeps_positioning_in_bounds(
        a_move in fighting_move(),
        b_move in fighting_move(),
        a_pos in 0i32..=8,
        b_pos in 0i32..=8,
        seed in any::<u64>(),
    ) {
        let mut a = Combatant::new("Aldric").armed_with(WeaponProfile::longsword(), true);
        let mut b = Combatant::new("Bryn").armed_with(WeaponProfile::axe(), true);
        a.set_positioning(a_pos);
        b.set_positioning(b_pos);
        let (a_id, b_id) = (a.id, b.id);
        let mut combatants = BTreeMap::new();
        combatants.insert(a_id, a);
        combatants.insert(b_id, b);

        let mut input = RoundInput::default();
        input.moves.insert(a_id, a_move);
        input.moves.insert(b_id, b_move);
        input.targets.insert(a_id, b_id);
        input.targets.insert(b_id, a_id);

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let report = resolve_round(&mut combatants, &input, &CombatConfig::default(), &mut rng);

        for combatant in combatants.values() {
            prop_assert!((0..=8).contains(&combatant.positioning()));
        }
        if report.exchanges[0].outcome == Outcome::Null {
            for combatant in combatants.values() {
                prop_assert_eq!(combatant.health, combatant.max_health);
                prop_assert!(combatant.wounds.is_empty());
            }
        }
    }

    #[test]
    fn test_wound_damage_only_shrinks(damage in 0i32..60, decrement in 1i32..6, ticks in 1usize..20) {
        let mut wound = Wound::new(BodyLocation::Torso, damage, 0, DamageType::Edge);
        let mut last = wound.damage;
        for _ in 0..ticks {
            wound.heal_tick(decrement);
            prop_assert!(wound.damage <= last);
            prop_assert!(wound.damage >= 0);
            last = wound.damage;
        }
    }

    #[test]
    fn test_bleed_stops_below_floor(bleed in 0i32..60, ticks in 1usize..10) {
        let mut wound = Wound::new(BodyLocation::Arms, 0, bleed, DamageType::Edge);
        for _ in 0..ticks {
            let before = wound.bleed;
            wound.bleed_tick(2, 2);
            prop_assert!(wound.bleed <= before);
            prop_assert!(wound.bleed == 0 || wound.bleed >= 2);
        }
    }
}

#[test]
fn test_wound_decay_example() {
    let mut wound = Wound::new(BodyLocation::Legs, 10, 10, DamageType::Edge);
    wound.bleed_tick(2, 2);
    assert_eq!(wound.bleed, 5);
    wound.heal_tick(3);
    assert_eq!(wound.damage, 7);

    let mut spent = Wound::new(BodyLocation::Legs, 0, 2, DamageType::Edge);
    spent.bleed_tick(2, 2);
    assert_eq!(spent.bleed, 0);
    assert!(!spent.is_open());
}
