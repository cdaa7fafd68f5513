use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use crossguard::combat::{resolve_round, Combatant, EffectLibrary, Move, RoundInput, WeaponProfile};
use crossguard::core::{CombatConfig, CombatantId};
use crossguard::encounter::EncounterRegistry;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn melee(size: usize) -> (BTreeMap<CombatantId, Combatant>, RoundInput) {
    let weapons: [fn() -> WeaponProfile; 4] = [
        WeaponProfile::longsword,
        WeaponProfile::axe,
        WeaponProfile::mace,
        WeaponProfile::spear,
    ];
    let moves = [Move::Thrust, Move::HighCut, Move::Dodge, Move::LowParry, Move::Slash];

    let mut combatants = BTreeMap::new();
    let mut ids = Vec::with_capacity(size);
    for i in 0..size {
        let combatant =
            Combatant::new(&format!("fighter-{i}")).armed_with(weapons[i % weapons.len()](), true);
        ids.push(combatant.id);
        combatants.insert(combatant.id, combatant);
    }

    let mut input = RoundInput::default();
    for (i, id) in ids.iter().enumerate() {
        input.moves.insert(*id, moves[i % moves.len()]);
        input.targets.insert(*id, ids[(i + 1) % size]);
    }
    (combatants, input)
}

fn bench_duel_round(c: &mut Criterion) {
    let config = CombatConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    c.bench_function("duel_round", |b| {
        b.iter(|| {
            let (mut combatants, input) = melee(2);
            black_box(resolve_round(&mut combatants, &input, &config, &mut rng))
        })
    });
}

fn bench_melee_round(c: &mut Criterion) {
    let config = CombatConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    c.bench_function("melee_round_12", |b| {
        b.iter(|| {
            let (mut combatants, input) = melee(12);
            black_box(resolve_round(&mut combatants, &input, &config, &mut rng))
        })
    });
}

fn bench_registry_sweep(c: &mut Criterion) {
    let config = CombatConfig {
        rng_seed: Some(3),
        round_timeout_ms: 0,
        ..CombatConfig::default()
    };
    c.bench_function("registry_sweep_64", |b| {
        b.iter(|| {
            let mut registry = EncounterRegistry::new(config.clone(), Arc::new(EffectLibrary::standard()));
            for i in 0..64 {
                let first = Combatant::new(&format!("a{i}")).armed_with(WeaponProfile::longsword(), true);
                let second = Combatant::new(&format!("b{i}")).armed_with(WeaponProfile::axe(), true);
                let _ = registry.start(first, second);
            }
            black_box(registry.resolve_due(Instant::now()))
        })
    });
}

criterion_group!(benches, bench_duel_round, bench_melee_round, bench_registry_sweep);
criterion_main!(benches);
