//! All live encounters, keyed by id
//!
//! Encounters share nothing mutable, so due rounds resolve in parallel.

use std::sync::Arc;
use std::time::Instant;

use ahash::AHashMap;
use rayon::prelude::*;

use crate::combat::combatant::Combatant;
use crate::combat::effects::{EffectFactory, EffectLibrary};
use crate::core::{config, CombatConfig, CombatError, CombatantId, EncounterId, Result};
use crate::encounter::handler::{Departure, Encounter, JoinRejected, RoundSummary};

#[derive(Debug)]
pub struct EncounterRegistry {
    encounters: AHashMap<EncounterId, Encounter>,
    membership: AHashMap<CombatantId, EncounterId>,
    next_id: u64,
    config: CombatConfig,
    effects: Arc<dyn EffectFactory>,
    /// Combatants who fled or fell, waiting to be collected
    departed: Vec<(Combatant, Departure)>,
}

impl Default for EncounterRegistry {
    fn default() -> Self {
        Self::new(config().clone(), Arc::new(EffectLibrary::standard()))
    }
}

impl EncounterRegistry {
    pub fn new(config: CombatConfig, effects: Arc<dyn EffectFactory>) -> Self {
        Self {
            encounters: AHashMap::new(),
            membership: AHashMap::new(),
            next_id: 1,
            config,
            effects,
            departed: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.encounters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encounters.is_empty()
    }

    pub fn get(&self, id: EncounterId) -> Option<&Encounter> {
        self.encounters.get(&id)
    }

    pub fn get_mut(&mut self, id: EncounterId) -> Option<&mut Encounter> {
        self.encounters.get_mut(&id)
    }

    /// Encounter a combatant is fighting in
    pub fn encounter_of(&self, combatant: CombatantId) -> Option<EncounterId> {
        self.membership.get(&combatant).copied()
    }

    fn ensure_free(&self, combatant: CombatantId) -> Result<()> {
        if self.membership.contains_key(&combatant) {
            Err(CombatError::AlreadyEngaged(combatant))
        } else {
            Ok(())
        }
    }

    /// Open a new encounter between two free combatants
    pub fn start(&mut self, first: Combatant, second: Combatant) -> Result<EncounterId> {
        self.ensure_free(first.id)?;
        self.ensure_free(second.id)?;
        if first.id == second.id {
            return Err(CombatError::SelfTarget);
        }
        let id = EncounterId(self.next_id);
        self.next_id += 1;
        self.membership.insert(first.id, id);
        self.membership.insert(second.id, id);
        let encounter = Encounter::start(id, self.config.clone(), Arc::clone(&self.effects), first, second);
        self.encounters.insert(id, encounter);
        Ok(id)
    }

    /// Attack `opponent`, entering whatever encounter they are in
    ///
    /// A rejected combatant comes back inside the error.
    pub fn join(
        &mut self,
        combatant: Combatant,
        opponent: CombatantId,
    ) -> std::result::Result<EncounterId, JoinRejected> {
        let combatant_id = combatant.id;
        let id = match self.ensure_free(combatant_id).and_then(|()| {
            self.encounter_of(opponent)
                .ok_or_else(|| CombatError::InvalidTarget(format!("{opponent} isn't fighting")))
        }) {
            Ok(id) => id,
            Err(error) => return Err(JoinRejected::new(error, combatant)),
        };
        let Some(encounter) = self.encounters.get_mut(&id) else {
            return Err(JoinRejected::new(CombatError::EncounterGone, combatant));
        };
        encounter.join(combatant, opponent)?;
        self.membership.insert(combatant_id, id);
        Ok(id)
    }

    pub fn leave(&mut self, combatant: CombatantId) -> Result<Combatant> {
        let id = self
            .encounter_of(combatant)
            .ok_or(CombatError::NotInEncounter(combatant))?;
        let encounter = self.encounters.get_mut(&id).ok_or(CombatError::EncounterGone)?;
        let left = encounter.leave(combatant)?;
        self.membership.remove(&combatant);
        Ok(left)
    }

    /// Out-of-combat recovery: close wounds a little and let them bleed
    ///
    /// Combatants still fighting heal only through the round loop.
    pub fn recover(&self, combatant: &mut Combatant) -> Result<()> {
        self.ensure_free(combatant.id)?;
        combatant.heal_tick(self.config.heal_decrement);
        combatant.bleed_tick(self.config.bleed_divisor, self.config.bleed_floor);
        Ok(())
    }

    /// Combatants who fled or fell since the last call
    pub fn take_departed(&mut self) -> Vec<(Combatant, Departure)> {
        std::mem::take(&mut self.departed)
    }

    /// Resolve every encounter whose round is due, in parallel
    ///
    /// Anyone who left during the round is moved to [`Self::take_departed`].
    pub fn resolve_due(&mut self, now: Instant) -> Vec<RoundSummary> {
        let due: Vec<&mut Encounter> = self
            .encounters
            .values_mut()
            .filter(|encounter| encounter.is_due(now))
            .collect();
        let results: Vec<Result<(RoundSummary, Vec<(Combatant, Departure)>)>> = due
            .into_par_iter()
            .map(|encounter| -> Result<(RoundSummary, Vec<(Combatant, Departure)>)> {
                let summary = encounter.resolve_round()?;
                Ok((summary, encounter.take_departed()))
            })
            .collect();

        let mut summaries = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok((summary, departed)) => {
                    for departure in &summary.departures {
                        self.membership.remove(&departure.id);
                    }
                    self.departed.extend(departed);
                    summaries.push(summary);
                }
                Err(err) => tracing::warn!(error = %err, "round not resolved"),
            }
        }
        summaries.sort_by_key(|s| s.encounter);
        summaries
    }

    /// Remove finished encounters, freeing anyone still listed in them
    pub fn reap_finished(&mut self) -> Vec<Encounter> {
        let finished: Vec<EncounterId> = self
            .encounters
            .iter()
            .filter(|(_, e)| e.is_finished())
            .map(|(id, _)| *id)
            .collect();
        let mut reaped = Vec::with_capacity(finished.len());
        for id in finished {
            if let Some(encounter) = self.encounters.remove(&id) {
                self.membership.retain(|_, enc| *enc != id);
                reaped.push(encounter);
            }
        }
        reaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::moves::Move;
    use crate::combat::weapons::WeaponProfile;

    fn registry() -> EncounterRegistry {
        let config = CombatConfig {
            rng_seed: Some(11),
            ..CombatConfig::default()
        };
        EncounterRegistry::new(config, Arc::new(EffectLibrary::standard()))
    }

    fn fighter(name: &str) -> Combatant {
        Combatant::new(name).armed_with(WeaponProfile::longsword(), true)
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut registry = registry();
        let first = registry.start(fighter("A"), fighter("B")).unwrap();
        let second = registry.start(fighter("C"), fighter("D")).unwrap();
        assert!(second > first);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_engaged_combatant_cannot_start_another() {
        let mut registry = registry();
        let a = fighter("A");
        let a_id = a.id;
        registry.start(a, fighter("B")).unwrap();
        let mut clone = fighter("A again");
        clone.id = a_id;
        assert!(matches!(
            registry.start(clone, fighter("C")),
            Err(CombatError::AlreadyEngaged(_))
        ));
    }

    #[test]
    fn test_join_routes_to_opponents_encounter() {
        let mut registry = registry();
        let b = fighter("B");
        let b_id = b.id;
        let id = registry.start(fighter("A"), b).unwrap();
        let c = fighter("C");
        let c_id = c.id;
        assert_eq!(registry.join(c, b_id).unwrap(), id);
        assert_eq!(registry.encounter_of(c_id), Some(id));
        assert_eq!(registry.get(id).unwrap().len(), 3);
    }

    #[test]
    fn test_resolve_due_only_touches_ready_encounters() {
        let mut registry = registry();
        let (a, b) = (fighter("A"), fighter("B"));
        let (a_id, b_id) = (a.id, b.id);
        let ready = registry.start(a, b).unwrap();
        let waiting = registry.start(fighter("C"), fighter("D")).unwrap();

        let encounter = registry.get_mut(ready).unwrap();
        encounter.submit_move(a_id, Move::Thrust).unwrap();
        encounter.submit_move(b_id, Move::HighParry).unwrap();

        let summaries = registry.resolve_due(Instant::now());
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].encounter, ready);
        assert_eq!(registry.get(ready).unwrap().round, 2);
        assert_eq!(registry.get(waiting).unwrap().round, 1);
    }

    #[test]
    fn test_rejected_join_returns_the_combatant() {
        let mut registry = registry();
        let (a, b) = (fighter("A"), fighter("B"));
        let a_id = a.id;
        registry.start(a, b).unwrap();

        let mut c = fighter("C");
        c.set_positioning(5);
        let c_id = c.id;
        let rejected = registry.join(c, CombatantId::new()).unwrap_err();
        assert!(matches!(rejected.error, CombatError::InvalidTarget(_)));
        assert_eq!(rejected.combatant.id, c_id);
        assert_eq!(rejected.combatant.positioning(), 5);
        assert_eq!(registry.encounter_of(c_id), None);

        let mut twin = fighter("A again");
        twin.id = a_id;
        let rejected = registry.join(twin, c_id).unwrap_err();
        assert!(matches!(rejected.error, CombatError::AlreadyEngaged(_)));
        assert_eq!(rejected.combatant.name, "A again");
    }

    #[test]
    fn test_departed_are_collected_after_a_sweep() {
        let mut registry = registry();
        let (a, b) = (fighter("A"), fighter("B"));
        let (a_id, b_id) = (a.id, b.id);
        let id = registry.start(a, b).unwrap();
        {
            let encounter = registry.get_mut(id).unwrap();
            encounter.declare_stop(a_id, b_id).unwrap();
            encounter.declare_stop(b_id, a_id).unwrap();
            encounter.submit_move(a_id, Move::Dodge).unwrap();
            encounter.submit_move(b_id, Move::Duck).unwrap();
        }
        let summaries = registry.resolve_due(Instant::now());
        assert_eq!(summaries[0].departures.len(), 2);

        let departed = registry.take_departed();
        assert_eq!(departed.len(), 2);
        assert!(departed.iter().all(|(_, reason)| *reason == Departure::Stopped));
        assert!(registry.get_mut(id).unwrap().take_departed().is_empty());
        assert!(registry.take_departed().is_empty());
        assert_eq!(registry.encounter_of(a_id), None);
    }

    #[test]
    fn test_recover_only_outside_combat() {
        use crate::combat::body_zone::BodyLocation;
        use crate::combat::weapons::DamageType;
        use crate::combat::wounds::Wound;

        let mut registry = registry();
        let (a, b) = (fighter("A"), fighter("B"));
        let a_id = a.id;
        registry.start(a, b).unwrap();
        let mut engaged = fighter("A again");
        engaged.id = a_id;
        assert!(registry.recover(&mut engaged).is_err());

        let mut resting = fighter("C");
        resting.add_wound(Wound::new(BodyLocation::Arms, 10, 0, DamageType::Edge));
        registry.recover(&mut resting).unwrap();
        assert_eq!(resting.health, resting.max_health - 7);
    }

    #[test]
    fn test_reap_frees_members() {
        let mut registry = registry();
        let (a, b) = (fighter("A"), fighter("B"));
        let (a_id, b_id) = (a.id, b.id);
        registry.start(a, b).unwrap();
        registry.leave(a_id).unwrap();
        let reaped = registry.reap_finished();
        assert_eq!(reaped.len(), 1);
        assert!(registry.is_empty());
        assert_eq!(registry.encounter_of(b_id), None);
        assert_eq!(registry.encounter_of(a_id), None);
    }
}
