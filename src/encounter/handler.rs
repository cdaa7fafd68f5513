//! Encounter state machine
//!
//! Collecting -> Resolving -> PostProcessing -> Collecting, until fewer than
//! two combatants remain.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::combat::combatant::{Combatant, Vitality};
use crate::combat::combo::ComboId;
use crate::combat::damage::QueuedEffect;
use crate::combat::effects::{effect_keys, trait_keys, EffectFactory, StatusEffect};
use crate::combat::modifiers::StatKey;
use crate::combat::moves::Move;
use crate::combat::resolution::{self, RoundInput, RoundReport};
use crate::combat::stance::{choose_fallback_move, FallbackContext};
use crate::combat::wounds::Wound;
use crate::core::{CombatConfig, CombatError, CombatantId, EncounterId, Result, Round};
use crate::encounter::ledger::RoundLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncounterPhase {
    #[default]
    Collecting,
    Resolving,
    PostProcessing,
    Finished,
}

/// Why a combatant left the encounter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Departure {
    Fled,
    Stopped,
    Left,
    Unconscious,
    Dead,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepartureRecord {
    pub id: CombatantId,
    pub name: String,
    pub reason: Departure,
}

/// Result of one full round, post-processing included
#[derive(Debug, Clone, Serialize)]
pub struct RoundSummary {
    pub encounter: EncounterId,
    pub round: Round,
    pub report: RoundReport,
    pub departures: Vec<DepartureRecord>,
    pub status: Vec<String>,
    pub finished: bool,
}

/// A join turned away, with the combatant handed back untouched
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct JoinRejected {
    pub error: CombatError,
    pub combatant: Box<Combatant>,
}

impl JoinRejected {
    pub fn new(error: CombatError, combatant: Combatant) -> Self {
        Self {
            error,
            combatant: Box::new(combatant),
        }
    }
}

impl From<JoinRejected> for CombatError {
    fn from(rejected: JoinRejected) -> Self {
        rejected.error
    }
}

impl RoundSummary {
    pub fn narrative(&self) -> &[String] {
        &self.report.narrative
    }
}

#[derive(Debug)]
pub struct Encounter {
    pub id: EncounterId,
    pub phase: EncounterPhase,
    pub round: Round,
    combatants: BTreeMap<CombatantId, Combatant>,
    /// attacker -> target
    targets: BTreeMap<CombatantId, CombatantId>,
    ledger: RoundLedger,
    config: CombatConfig,
    effects: Arc<dyn EffectFactory>,
    rng: ChaCha8Rng,
    deadline: Instant,
    departed: Vec<(Combatant, Departure)>,
}

impl Encounter {
    pub fn new(id: EncounterId, config: CombatConfig, effects: Arc<dyn EffectFactory>) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let deadline = Instant::now() + config.round_timeout();
        Self {
            id,
            phase: EncounterPhase::Collecting,
            round: 1,
            combatants: BTreeMap::new(),
            targets: BTreeMap::new(),
            ledger: RoundLedger::new(),
            config,
            effects,
            rng,
            deadline,
            departed: Vec::new(),
        }
    }

    /// Open an encounter between two combatants facing each other
    pub fn start(
        id: EncounterId,
        config: CombatConfig,
        effects: Arc<dyn EffectFactory>,
        first: Combatant,
        second: Combatant,
    ) -> Self {
        let mut encounter = Self::new(id, config, effects);
        let (a, b) = (first.id, second.id);
        tracing::info!(encounter = %id, first = %first.name, second = %second.name, "encounter started");
        encounter.combatants.insert(a, first);
        encounter.combatants.insert(b, second);
        encounter.targets.insert(a, b);
        encounter.targets.insert(b, a);
        encounter
    }

    // === QUERIES ===

    pub fn is_finished(&self) -> bool {
        self.phase == EncounterPhase::Finished
    }

    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    pub fn contains(&self, id: CombatantId) -> bool {
        self.combatants.contains_key(&id)
    }

    pub fn combatant(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    pub fn combatant_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.get_mut(&id)
    }

    pub fn combatants(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.values()
    }

    pub fn target_of(&self, id: CombatantId) -> Option<CombatantId> {
        self.targets.get(&id).copied()
    }

    pub fn ledger(&self) -> &RoundLedger {
        &self.ledger
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Combatants who have left, with the reason, handed back to the caller
    pub fn take_departed(&mut self) -> Vec<(Combatant, Departure)> {
        std::mem::take(&mut self.departed)
    }

    /// Everyone still fighting has a move in
    pub fn all_submitted(&self) -> bool {
        self.combatants.keys().all(|id| self.ledger.has_submitted(*id))
    }

    /// The round should close now
    pub fn is_due(&self, now: Instant) -> bool {
        self.phase == EncounterPhase::Collecting && (self.all_submitted() || now >= self.deadline)
    }

    fn require(&self, id: CombatantId) -> Result<&Combatant> {
        self.combatants.get(&id).ok_or(CombatError::NotInEncounter(id))
    }

    fn ensure_collecting(&self) -> Result<()> {
        if self.phase == EncounterPhase::Collecting {
            Ok(())
        } else {
            Err(CombatError::RoundClosed)
        }
    }

    fn require_positioning(&self, id: CombatantId, action: &'static str, required: i32) -> Result<()> {
        let available = self.require(id)?.positioning();
        if available < required {
            return Err(CombatError::InsufficientPositioning {
                action,
                required,
                available,
            });
        }
        Ok(())
    }

    // === MEMBERSHIP ===

    /// Whether `id` may join attacking `opponent`
    pub fn check_join(&self, id: CombatantId, opponent: CombatantId) -> Result<()> {
        if self.is_finished() {
            return Err(CombatError::RoundClosed);
        }
        if id == opponent {
            return Err(CombatError::SelfTarget);
        }
        if self.contains(id) {
            return Err(CombatError::AlreadyEngaged(id));
        }
        if !self.contains(opponent) {
            return Err(CombatError::InvalidTarget(format!("{opponent} is not in this fight")));
        }
        Ok(())
    }

    /// Add a combatant attacking `opponent`
    pub fn join(
        &mut self,
        combatant: Combatant,
        opponent: CombatantId,
    ) -> std::result::Result<(), JoinRejected> {
        let id = combatant.id;
        if let Err(error) = self.check_join(id, opponent) {
            return Err(JoinRejected::new(error, combatant));
        }
        tracing::info!(encounter = %self.id, name = %combatant.name, "combatant joined");
        self.combatants.insert(id, combatant);
        self.targets.insert(id, opponent);
        self.targets.entry(opponent).or_insert(id);
        Ok(())
    }

    /// Withdraw a combatant outright; their attackers are retargeted
    pub fn leave(&mut self, id: CombatantId) -> Result<Combatant> {
        self.require(id)?;
        let mut departures = Vec::new();
        self.depart(id, Departure::Left, &mut departures);
        self.retarget_orphans();
        self.check_finished();
        let position = self
            .departed
            .iter()
            .rposition(|(c, _)| c.id == id)
            .ok_or(CombatError::NotInEncounter(id))?;
        Ok(self.departed.remove(position).0)
    }

    fn depart(&mut self, id: CombatantId, reason: Departure, records: &mut Vec<DepartureRecord>) {
        let Some(combatant) = self.combatants.remove(&id) else {
            return;
        };
        self.targets.remove(&id);
        self.ledger.forget(id);
        tracing::info!(encounter = %self.id, name = %combatant.name, ?reason, "combatant departed");
        records.push(DepartureRecord {
            id,
            name: combatant.name.clone(),
            reason,
        });
        self.departed.push((combatant, reason));
    }

    fn check_finished(&mut self) {
        if self.combatants.len() < 2 {
            self.phase = EncounterPhase::Finished;
            tracing::info!(encounter = %self.id, round = self.round, "encounter finished");
        }
    }

    // === SUBMISSIONS ===

    pub fn submit_move(&mut self, id: CombatantId, mv: Move) -> Result<()> {
        self.ensure_collecting()?;
        let combatant = self.require(id)?;
        if self.ledger.is_shifting(id) {
            return Err(CombatError::Shifting);
        }
        if self.ledger.is_fleeing(id) && mv.is_offensive() {
            return Err(CombatError::Fleeing("attack"));
        }
        if let Some(reason) = mv.blocked_reason(&combatant.modifiers) {
            return Err(CombatError::MoveBanned { mv, reason });
        }
        if mv != Move::Pass && self.ledger.previous_move(id) == Some(mv) {
            return Err(CombatError::RepeatedMove(mv));
        }
        if self.ledger.moves.get(&id) != Some(&mv) {
            self.ledger.combos.remove(&id);
        }
        self.ledger.moves.insert(id, mv);
        tracing::debug!(encounter = %self.id, combatant = %id, %mv, "move submitted");
        Ok(())
    }

    /// Layer a combo on the pending move, picking a move if none is pending
    pub fn submit_combo(&mut self, id: CombatantId, combo: ComboId) -> Result<Move> {
        self.ensure_collecting()?;
        let combatant = self.require(id)?;
        if self.ledger.is_shifting(id) {
            return Err(CombatError::Shifting);
        }
        if self.ledger.is_fleeing(id) {
            return Err(CombatError::Fleeing("use combos"));
        }
        if !combatant.available_combos().contains(&combo) {
            return Err(CombatError::ComboUnavailable {
                combo,
                reason: "your weapons and training don't allow it".to_string(),
            });
        }
        let def = combo.def();
        if def.affordable_for(combatant.positioning()).is_some() {
            return Err(CombatError::InsufficientPositioning {
                action: "use that combo",
                required: def.positioning_cost,
                available: combatant.positioning(),
            });
        }

        let mv = match self.ledger.moves.get(&id) {
            Some(&mv) => {
                if let Some(legal) = def.legality_error(mv) {
                    return Err(CombatError::ComboNotLegal { combo, legal });
                }
                mv
            }
            None => {
                let previous = self.ledger.previous_move(id);
                let candidates: Vec<Move> = def
                    .usable_moves()
                    .into_iter()
                    .filter(|mv| Some(*mv) != previous)
                    .filter(|mv| !combatant.modifiers.is_move_banned(*mv))
                    .collect();
                *candidates
                    .choose(&mut self.rng)
                    .ok_or(CombatError::NoLegalMoveForCombo(combo))?
            }
        };

        self.ledger.moves.insert(id, mv);
        self.ledger.combos.insert(id, combo);
        tracing::debug!(encounter = %self.id, combatant = %id, %combo, %mv, "combo submitted");
        Ok(mv)
    }

    // === SIDE ACTIONS ===

    /// Start fleeing; a pending combo is dropped, and so is a pending attack
    pub fn declare_flee(&mut self, id: CombatantId) -> Result<()> {
        self.ensure_collecting()?;
        self.require(id)?;
        if self.ledger.is_fleeing(id) {
            return Err(CombatError::AlreadyDeclared("flee"));
        }
        self.require_positioning(id, "flee", self.config.flee.threshold)?;
        self.ledger.flee.insert(id, 0);
        self.ledger.combos.remove(&id);
        if self.ledger.moves.get(&id).is_some_and(|mv| mv.is_offensive()) {
            self.ledger.moves.remove(&id);
        }
        if let Some(combatant) = self.combatants.get_mut(&id) {
            combatant.attach(Box::new(StatusEffect::fleeing()));
            tracing::info!(encounter = %self.id, name = %combatant.name, "flee declared");
        }
        Ok(())
    }

    pub fn cancel_flee(&mut self, id: CombatantId) -> Result<()> {
        self.ensure_collecting()?;
        self.require(id)?;
        if self.ledger.flee.remove(&id).is_none() {
            return Err(CombatError::NothingToCancel("flee"));
        }
        if let Some(combatant) = self.combatants.get_mut(&id) {
            combatant.modifiers.remove(effect_keys::FLEEING);
        }
        Ok(())
    }

    /// Draw the attacker of `rescuee` onto `rescuer`
    ///
    /// Both must be fighting the same third party, who is attacking the
    /// rescuee.
    pub fn declare_rescue(&mut self, rescuer: CombatantId, rescuee: CombatantId) -> Result<()> {
        self.ensure_collecting()?;
        self.require(rescuer)?;
        self.require(rescuee)?;
        if rescuer == rescuee {
            return Err(CombatError::SelfTarget);
        }
        if self.ledger.rescue.contains_key(&rescuer) {
            return Err(CombatError::AlreadyDeclared("rescue"));
        }
        self.require_positioning(rescuer, "rescue", self.config.rescue.threshold)?;
        let attacker = self
            .target_of(rescuer)
            .ok_or_else(|| CombatError::InvalidTarget("you aren't fighting anyone".to_string()))?;
        if attacker == rescuee || self.target_of(rescuee) != Some(attacker) {
            return Err(CombatError::InvalidTarget(
                "you must be fighting the same opponent".to_string(),
            ));
        }
        if self.target_of(attacker) != Some(rescuee) {
            return Err(CombatError::InvalidTarget(
                "nobody is pressing them".to_string(),
            ));
        }
        self.ledger.rescue.insert(rescuer, rescuee);
        Ok(())
    }

    pub fn cancel_rescue(&mut self, rescuer: CombatantId) -> Result<()> {
        self.ensure_collecting()?;
        self.require(rescuer)?;
        self.ledger
            .rescue
            .remove(&rescuer)
            .map(|_| ())
            .ok_or(CombatError::NothingToCancel("rescue"))
    }

    /// Give up this round's action to switch targets at round end
    pub fn declare_shift(&mut self, id: CombatantId, new_target: CombatantId) -> Result<()> {
        self.ensure_collecting()?;
        self.require(id)?;
        if id == new_target {
            return Err(CombatError::SelfTarget);
        }
        if !self.contains(new_target) {
            return Err(CombatError::InvalidTarget(format!("{new_target} is not in this fight")));
        }
        if self.target_of(id) == Some(new_target) {
            return Err(CombatError::InvalidTarget("you are already fighting them".to_string()));
        }
        if self.ledger.is_shifting(id) {
            return Err(CombatError::AlreadyDeclared("shift"));
        }
        self.require_positioning(id, "shift targets", self.config.shift.threshold)?;
        self.ledger.shift.insert(id, new_target);
        self.ledger.moves.insert(id, Move::Pass);
        self.ledger.combos.remove(&id);
        Ok(())
    }

    pub fn cancel_shift(&mut self, id: CombatantId) -> Result<()> {
        self.ensure_collecting()?;
        self.require(id)?;
        if self.ledger.shift.remove(&id).is_none() {
            return Err(CombatError::NothingToCancel("shift targets"));
        }
        self.ledger.moves.remove(&id);
        Ok(())
    }

    pub fn declare_stop(&mut self, id: CombatantId, opponent: CombatantId) -> Result<()> {
        self.ensure_collecting()?;
        self.require(id)?;
        if id == opponent {
            return Err(CombatError::SelfTarget);
        }
        if !self.contains(opponent) {
            return Err(CombatError::InvalidTarget(format!("{opponent} is not in this fight")));
        }
        if self.ledger.stop.contains_key(&id) {
            return Err(CombatError::AlreadyDeclared("stop"));
        }
        self.ledger.stop.insert(id, opponent);
        Ok(())
    }

    pub fn cancel_stop(&mut self, id: CombatantId) -> Result<()> {
        self.ensure_collecting()?;
        self.require(id)?;
        self.ledger
            .stop
            .remove(&id)
            .map(|_| ())
            .ok_or(CombatError::NothingToCancel("stop"))
    }

    /// Queue an effect from outside the resolver for this round's end
    pub fn queue_effect(&mut self, effect: QueuedEffect) -> Result<()> {
        self.require(effect.target)?;
        self.ledger.pending_effects.push(effect);
        Ok(())
    }

    // === ROUND ===

    fn fill_missing_moves(&mut self) {
        let ids: Vec<CombatantId> = self.combatants.keys().copied().collect();
        for id in ids {
            if self.ledger.has_submitted(id) {
                continue;
            }
            let Some(combatant) = self.combatants.get(&id) else {
                continue;
            };
            let ctx = FallbackContext {
                stance: combatant.stance,
                bans: combatant.modifiers.ban_state(),
                previous_move: self.ledger.previous_move(id),
                opponent_previous_move: self
                    .target_of(id)
                    .and_then(|t| self.ledger.previous_move(t)),
            };
            let mv = choose_fallback_move(&ctx, &mut self.rng);
            tracing::debug!(encounter = %self.id, combatant = %id, %mv, "fallback move");
            self.ledger.moves.insert(id, mv);
        }
    }

    fn resolve_flee(&mut self, report: &RoundReport, departures: &mut Vec<DepartureRecord>) {
        let rule = self.config.flee.clone();
        let fleeing: Vec<(CombatantId, u32)> = self.ledger.flee.iter().map(|(id, n)| (*id, *n)).collect();
        for (id, survived) in fleeing {
            let survived = if report.scored_against(id) {
                0
            } else {
                (survived + 1).min(rule.rounds)
            };
            self.ledger.flee.insert(id, survived);
            if survived < rule.rounds {
                continue;
            }
            let Some(combatant) = self.combatants.get_mut(&id) else {
                continue;
            };
            if combatant.positioning() >= rule.cost {
                combatant.adjust_positioning(-rule.cost);
                self.depart(id, Departure::Fled, departures);
            } else {
                combatant.modifiers.remove(effect_keys::FLEEING);
                tracing::warn!(encounter = %self.id, name = %combatant.name, "flee failed: out of position");
                self.ledger.flee.remove(&id);
            }
        }
    }

    fn side_action_cost(combatant: &Combatant, cost: i32, doubles_for_cowards: bool) -> i32 {
        if combatant.has_trait(trait_keys::RELENTLESS_CUNNING) {
            0
        } else if doubles_for_cowards && combatant.has_trait(trait_keys::COWARDICE) {
            cost * 2
        } else {
            cost
        }
    }

    fn resolve_rescue(&mut self, report: &RoundReport) {
        let requests: Vec<(CombatantId, CombatantId)> =
            self.ledger.rescue.iter().map(|(a, b)| (*a, *b)).collect();
        for (rescuer, rescuee) in requests {
            let Some(attacker) = self.target_of(rescuer) else {
                continue;
            };
            let cost = self.config.rescue.cost;
            let Some(combatant) = self.combatants.get_mut(&rescuer) else {
                continue;
            };
            let paid = Self::side_action_cost(combatant, cost, true);
            combatant.adjust_positioning(-paid);

            let still_pressed = self.contains(rescuee) && self.target_of(attacker) == Some(rescuee);
            if still_pressed && report.won_any(rescuer) {
                self.targets.insert(attacker, rescuer);
                tracing::info!(encounter = %self.id, %rescuer, %rescuee, "rescue succeeded");
            } else {
                tracing::info!(encounter = %self.id, %rescuer, %rescuee, "rescue failed");
            }
        }
    }

    fn resolve_shift(&mut self) {
        let requests: Vec<(CombatantId, CombatantId)> =
            self.ledger.shift.iter().map(|(a, b)| (*a, *b)).collect();
        for (id, new_target) in requests {
            if !self.contains(new_target) {
                continue;
            }
            let cost = self.config.shift.cost;
            let Some(combatant) = self.combatants.get_mut(&id) else {
                continue;
            };
            let paid = Self::side_action_cost(combatant, cost, false);
            combatant.adjust_positioning(-paid);
            self.targets.insert(id, new_target);
        }
    }

    fn resolve_stop(&mut self, departures: &mut Vec<DepartureRecord>) {
        let requests: Vec<(CombatantId, CombatantId)> =
            self.ledger.stop.iter().map(|(a, b)| (*a, *b)).collect();
        let mut stopping: BTreeMap<CombatantId, CombatantId> = BTreeMap::new();
        for (a, b) in requests {
            if !self.contains(a) || !self.contains(b) {
                continue;
            }
            let mutual = self.ledger.stop.get(&b) == Some(&a);
            let one_sided = self.target_of(b) != Some(a);
            if mutual {
                stopping.insert(a, b);
                stopping.insert(b, a);
            } else if one_sided {
                stopping.insert(a, b);
            }
        }

        let mut leaving = BTreeSet::new();
        for (&id, &partner) in &stopping {
            let attackers: Vec<CombatantId> = self
                .targets
                .iter()
                .filter(|(attacker, target)| **target == id && **attacker != partner)
                .map(|(attacker, _)| *attacker)
                .collect();
            match attackers.choose(&mut self.rng) {
                Some(&attacker) => {
                    self.targets.insert(id, attacker);
                }
                None => {
                    leaving.insert(id);
                }
            }
        }
        for id in leaving {
            self.depart(id, Departure::Stopped, departures);
        }
    }

    fn apply_effects(&mut self, report: &RoundReport) {
        for combatant in self.combatants.values_mut() {
            for key in combatant.modifiers.tick_round() {
                tracing::debug!(name = %combatant.name, effect = %key, "effect expired");
            }
        }

        let queued: Vec<QueuedEffect> = report
            .queued_effects()
            .cloned()
            .chain(self.ledger.pending_effects.drain(..))
            .collect();
        for effect in queued {
            let Some(combatant) = self.combatants.get_mut(&effect.target) else {
                continue;
            };
            if let Some(existing) = combatant.modifiers.get_mut(&effect.effect) {
                existing.extend(effect.rounds);
                continue;
            }
            match self.effects.create(&effect.effect, effect.rounds) {
                Some(source) => combatant.attach(source),
                None => tracing::warn!(effect = %effect.effect, "unknown status effect"),
            }
        }
    }

    /// Regeneration and internal bleeding granted by status effects
    fn apply_effect_vitals(&mut self, report: &RoundReport, input: &RoundInput) {
        for (id, combatant) in self.combatants.iter_mut() {
            let condition = report.round_condition(*id);
            let mv = input.move_of(*id);
            let combo = input.combo_of(*id);
            let regen = combatant
                .modifiers
                .stat(StatKey::HealthRegen, condition, mv, combo)
                .round() as i32;
            if regen > 0 {
                combatant.health = (combatant.health + regen).min(combatant.max_health);
            }
            let bleed = combatant
                .modifiers
                .stat(StatKey::Bleed, condition, mv, combo)
                .round() as i32;
            if bleed > 0 {
                combatant.add_wound(Wound::internal(bleed));
            }
        }
    }

    fn bleed_all(&mut self) {
        let (divisor, floor) = (self.config.bleed_divisor, self.config.bleed_floor);
        for combatant in self.combatants.values_mut() {
            let lost = combatant.bleed_tick(divisor, floor);
            if lost > 0 {
                tracing::debug!(name = %combatant.name, lost, "bleeding");
            }
        }
    }

    fn remove_fallen(&mut self, departures: &mut Vec<DepartureRecord>) {
        let fallen: Vec<(CombatantId, Departure)> = self
            .combatants
            .iter()
            .filter_map(|(id, c)| match c.vitality() {
                Vitality::Conscious => None,
                Vitality::Unconscious => Some((*id, Departure::Unconscious)),
                Vitality::Dead => Some((*id, Departure::Dead)),
            })
            .collect();
        for (id, reason) in fallen {
            self.depart(id, reason, departures);
        }
    }

    /// Anyone whose target left turns on someone attacking them, or anyone
    fn retarget_orphans(&mut self) {
        let ids: Vec<CombatantId> = self.combatants.keys().copied().collect();
        for &id in &ids {
            if self
                .target_of(id)
                .is_some_and(|target| self.contains(target))
            {
                continue;
            }
            let attackers: Vec<CombatantId> = self
                .targets
                .iter()
                .filter(|(attacker, target)| **target == id && **attacker != id)
                .map(|(attacker, _)| *attacker)
                .collect();
            let others: Vec<CombatantId> = ids.iter().copied().filter(|other| *other != id).collect();
            let pick = attackers
                .choose(&mut self.rng)
                .or_else(|| others.choose(&mut self.rng))
                .copied();
            match pick {
                Some(target) => {
                    self.targets.insert(id, target);
                }
                None => {
                    self.targets.remove(&id);
                }
            }
        }
    }

    /// Close the round: fill in silent combatants, resolve every exchange,
    /// then run side actions, effects and bleeding
    pub fn resolve_round(&mut self) -> Result<RoundSummary> {
        self.ensure_collecting()?;
        self.phase = EncounterPhase::Resolving;
        self.fill_missing_moves();

        let input = RoundInput {
            moves: self.ledger.moves.clone(),
            combos: self.ledger.combos.clone(),
            targets: self.targets.clone(),
        };
        let report = resolution::resolve_round(&mut self.combatants, &input, &self.config, &mut self.rng);

        self.phase = EncounterPhase::PostProcessing;
        let mut departures = Vec::new();
        self.resolve_flee(&report, &mut departures);
        self.resolve_rescue(&report);
        self.resolve_shift();
        self.resolve_stop(&mut departures);
        self.apply_effects(&report);
        self.apply_effect_vitals(&report, &input);
        self.bleed_all();
        self.remove_fallen(&mut departures);
        self.retarget_orphans();
        self.ledger.reset_round();

        let round = self.round;
        self.round += 1;
        self.phase = EncounterPhase::Collecting;
        self.deadline = Instant::now() + self.config.round_timeout();
        self.check_finished();

        tracing::info!(
            encounter = %self.id,
            round,
            exchanges = report.exchanges.len(),
            departures = departures.len(),
            "round complete"
        );

        Ok(RoundSummary {
            encounter: self.id,
            round,
            report,
            departures,
            status: self.combatants.values().map(Combatant::status_line).collect(),
            finished: self.is_finished(),
        })
    }

    /// Time left before the round closes on its own
    pub fn time_left(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::body_zone::BodyLocation;
    use crate::combat::effects::{EffectLibrary, Trait};
    use crate::combat::weapons::{DamageType, WeaponProfile};

    fn seeded() -> CombatConfig {
        CombatConfig {
            rng_seed: Some(7),
            ..CombatConfig::default()
        }
    }

    fn duel() -> (Encounter, CombatantId, CombatantId) {
        let a = Combatant::new("Aldric").armed_with(WeaponProfile::longsword(), true);
        let b = Combatant::new("Bryn").armed_with(WeaponProfile::mace(), true);
        let (a_id, b_id) = (a.id, b.id);
        let encounter = Encounter::start(
            EncounterId(1),
            seeded(),
            Arc::new(EffectLibrary::standard()),
            a,
            b,
        );
        (encounter, a_id, b_id)
    }

    #[test]
    fn test_start_pairs_the_two() {
        let (encounter, a, b) = duel();
        assert_eq!(encounter.target_of(a), Some(b));
        assert_eq!(encounter.target_of(b), Some(a));
        assert_eq!(encounter.phase, EncounterPhase::Collecting);
    }

    #[test]
    fn test_join_validation() {
        let (mut encounter, a, _) = duel();
        let c = Combatant::new("Cass");
        let c_id = c.id;
        assert!(matches!(
            encounter.join(Combatant::new("Dain"), CombatantId::new()),
            Err(JoinRejected {
                error: CombatError::InvalidTarget(_),
                ..
            })
        ));
        encounter.join(c, a).unwrap();
        assert_eq!(encounter.target_of(c_id), Some(a));
        assert_eq!(encounter.len(), 3);
    }

    #[test]
    fn test_rejected_join_hands_the_combatant_back() {
        let (mut encounter, a, _) = duel();
        let mut dain = Combatant::new("Dain").armed_with(WeaponProfile::axe(), true);
        dain.set_positioning(6);
        dain.add_wound(Wound::new(BodyLocation::Legs, 9, 3, DamageType::Edge));
        let dain_id = dain.id;

        let rejected = encounter.join(dain, dain_id).unwrap_err();
        assert!(matches!(rejected.error, CombatError::SelfTarget));
        let dain = *rejected.combatant;
        assert_eq!(dain.id, dain_id);
        assert_eq!(dain.positioning(), 6);
        assert_eq!(dain.wounds.len(), 1);
        assert_eq!(dain.health, dain.max_health - 9);

        let rejected = encounter.join(dain, CombatantId::new()).unwrap_err();
        assert!(rejected.error.is_rejection());
        assert_eq!(encounter.len(), 2);
        encounter.join(*rejected.combatant, a).unwrap();
        assert!(encounter.contains(dain_id));
    }

    #[test]
    fn test_repeated_move_rejected() {
        let (mut encounter, a, b) = duel();
        encounter.submit_move(a, Move::Dodge).unwrap();
        encounter.submit_move(b, Move::Duck).unwrap();
        encounter.resolve_round().unwrap();

        let err = encounter.submit_move(a, Move::Dodge).unwrap_err();
        assert!(matches!(err, CombatError::RepeatedMove(Move::Dodge)));
        assert!(err.is_rejection());
        encounter.submit_move(a, Move::Pass).unwrap();
        encounter.submit_move(a, Move::Thrust).unwrap();
    }

    #[test]
    fn test_changing_move_clears_combo() {
        let (mut encounter, a, _) = duel();
        encounter.combatant_mut(a).unwrap().set_positioning(8);
        encounter.submit_move(a, Move::Thrust).unwrap();
        encounter.submit_combo(a, ComboId::Feint).unwrap();
        assert_eq!(encounter.ledger().combos.get(&a), Some(&ComboId::Feint));

        encounter.submit_move(a, Move::Slash).unwrap();
        assert!(encounter.ledger().combos.get(&a).is_none());
    }

    #[test]
    fn test_combo_checks() {
        let (mut encounter, a, _) = duel();
        assert!(matches!(
            encounter.submit_combo(a, ComboId::Feint),
            Err(CombatError::InsufficientPositioning { required: 3, .. })
        ));
        assert!(matches!(
            encounter.submit_combo(a, ComboId::Stun),
            Err(CombatError::ComboUnavailable { .. })
        ));

        encounter.combatant_mut(a).unwrap().set_positioning(8);
        encounter.submit_move(a, Move::Dodge).unwrap();
        assert!(matches!(
            encounter.submit_combo(a, ComboId::Impale),
            Err(CombatError::ComboNotLegal { .. })
        ));
    }

    #[test]
    fn test_combo_without_move_picks_one() {
        let (mut encounter, a, _) = duel();
        encounter.combatant_mut(a).unwrap().set_positioning(8);
        let mv = encounter.submit_combo(a, ComboId::Feint).unwrap();
        assert!(mv.is_offensive());
        assert_eq!(encounter.ledger().moves.get(&a), Some(&mv));
    }

    #[test]
    fn test_flee_declaration_needs_positioning() {
        let (mut encounter, a, _) = duel();
        assert!(matches!(
            encounter.declare_flee(a),
            Err(CombatError::InsufficientPositioning { action: "flee", .. })
        ));
        encounter.combatant_mut(a).unwrap().set_positioning(3);
        encounter.declare_flee(a).unwrap();
        assert!(matches!(encounter.declare_flee(a), Err(CombatError::AlreadyDeclared("flee"))));
        assert!(matches!(
            encounter.submit_move(a, Move::Thrust),
            Err(CombatError::Fleeing(_))
        ));
        assert!(matches!(
            encounter.submit_combo(a, ComboId::Feint),
            Err(CombatError::Fleeing(_))
        ));
        encounter.cancel_flee(a).unwrap();
        assert!(matches!(encounter.cancel_flee(a), Err(CombatError::NothingToCancel(_))));
        encounter.submit_move(a, Move::Thrust).unwrap();
    }

    #[test]
    fn test_flee_declared_after_attack_drops_the_attack() {
        let (mut encounter, a, b) = duel();
        encounter.combatant_mut(a).unwrap().set_positioning(8);
        encounter.submit_move(a, Move::Thrust).unwrap();
        encounter.submit_combo(a, ComboId::Feint).unwrap();
        encounter.declare_flee(a).unwrap();
        assert!(encounter.ledger().moves.get(&a).is_none());
        assert!(encounter.ledger().combos.get(&a).is_none());

        encounter.submit_move(b, Move::Dodge).unwrap();
        let summary = encounter.resolve_round().unwrap();
        let fled_with = encounter.ledger().previous_move(a).unwrap();
        assert!(!fled_with.is_offensive(), "fleeing combatant used {fled_with}");
        assert!(summary.report.exchanges[0].involves(a));
    }

    #[test]
    fn test_flee_keeps_a_pending_defense() {
        let (mut encounter, a, _) = duel();
        encounter.combatant_mut(a).unwrap().set_positioning(4);
        encounter.submit_move(a, Move::Duck).unwrap();
        encounter.declare_flee(a).unwrap();
        assert_eq!(encounter.ledger().moves.get(&a), Some(&Move::Duck));
    }

    #[test]
    fn test_side_actions_refused_once_finished() {
        let (mut encounter, a, b) = duel();
        encounter.combatant_mut(a).unwrap().set_positioning(8);
        encounter.leave(b).unwrap();
        assert!(encounter.is_finished());
        assert!(matches!(encounter.declare_flee(a), Err(CombatError::RoundClosed)));
        assert!(matches!(encounter.declare_stop(a, b), Err(CombatError::RoundClosed)));
        assert!(matches!(encounter.declare_rescue(a, b), Err(CombatError::RoundClosed)));
        assert!(matches!(encounter.cancel_stop(a), Err(CombatError::RoundClosed)));
    }

    #[test]
    fn test_flee_succeeds_after_two_quiet_rounds() {
        let (mut encounter, a, b) = duel();
        encounter.combatant_mut(a).unwrap().set_positioning(5);
        encounter.declare_flee(a).unwrap();

        encounter.submit_move(a, Move::Disengage).unwrap();
        encounter.submit_move(b, Move::Pass).unwrap();
        let first = encounter.resolve_round().unwrap();
        assert!(first.departures.is_empty());
        assert_eq!(encounter.ledger().flee.get(&a), Some(&1));

        encounter.submit_move(a, Move::Duck).unwrap();
        encounter.submit_move(b, Move::Dodge).unwrap();
        let second = encounter.resolve_round().unwrap();
        assert_eq!(second.departures.len(), 1);
        assert_eq!(second.departures[0].reason, Departure::Fled);
        assert!(second.finished);
        let departed = encounter.take_departed();
        assert_eq!(departed[0].0.positioning(), 2);
    }

    #[test]
    fn test_shift_forfeits_the_round() {
        let (mut encounter, a, b) = duel();
        let c = Combatant::new("Cass").armed_with(WeaponProfile::dagger(), true);
        let c_id = c.id;
        encounter.join(c, b).unwrap();
        encounter.combatant_mut(a).unwrap().set_positioning(2);

        encounter.declare_shift(a, c_id).unwrap();
        assert!(matches!(encounter.submit_move(a, Move::Thrust), Err(CombatError::Shifting)));
        assert_eq!(encounter.ledger().moves.get(&a), Some(&Move::Pass));

        encounter.resolve_round().unwrap();
        assert_eq!(encounter.target_of(a), Some(c_id));
    }

    #[test]
    fn test_cunning_shifts_for_free() {
        let (mut encounter, a, b) = duel();
        let c = Combatant::new("Cass");
        let c_id = c.id;
        encounter.join(c, b).unwrap();
        {
            let aldric = encounter.combatant_mut(a).unwrap();
            aldric.set_positioning(2);
            aldric.learn(Trait::new(trait_keys::RELENTLESS_CUNNING));
        }
        encounter.declare_shift(a, c_id).unwrap();
        encounter.submit_move(b, Move::Dodge).unwrap();
        encounter.submit_move(c_id, Move::Duck).unwrap();
        encounter.resolve_round().unwrap();
        assert!(encounter.combatant(a).unwrap().positioning() >= 2);
    }

    #[test]
    fn test_mutual_stop_ends_the_fight() {
        let (mut encounter, a, b) = duel();
        encounter.declare_stop(a, b).unwrap();
        encounter.declare_stop(b, a).unwrap();
        encounter.submit_move(a, Move::Dodge).unwrap();
        encounter.submit_move(b, Move::Duck).unwrap();
        let summary = encounter.resolve_round().unwrap();
        assert_eq!(summary.departures.len(), 2);
        assert!(summary.finished);
        assert!(matches!(
            encounter.submit_move(a, Move::Thrust),
            Err(CombatError::RoundClosed)
        ));
    }

    #[test]
    fn test_stop_with_third_attacker_redirects() {
        let (mut encounter, a, b) = duel();
        let c = Combatant::new("Cass");
        let c_id = c.id;
        encounter.join(c, a).unwrap();
        encounter.declare_stop(a, b).unwrap();
        encounter.declare_stop(b, a).unwrap();
        for (id, mv) in [(a, Move::Dodge), (b, Move::Duck), (c_id, Move::Disengage)] {
            encounter.submit_move(id, mv).unwrap();
        }
        let summary = encounter.resolve_round().unwrap();
        assert_eq!(summary.departures.len(), 1);
        assert_eq!(summary.departures[0].id, b);
        assert_eq!(encounter.target_of(a), Some(c_id));
    }

    #[test]
    fn test_rescue_validation() {
        let (mut encounter, a, b) = duel();
        let c = Combatant::new("Cass");
        let c_id = c.id;
        encounter.join(c, b).unwrap();
        // a and c both fight b, b presses a
        encounter.combatant_mut(c_id).unwrap().set_positioning(2);
        encounter.declare_rescue(c_id, a).unwrap();
        assert!(matches!(
            encounter.declare_rescue(c_id, a),
            Err(CombatError::AlreadyDeclared("rescue"))
        ));
        encounter.cancel_rescue(c_id).unwrap();
        assert!(matches!(
            encounter.declare_rescue(c_id, c_id),
            Err(CombatError::SelfTarget)
        ));
    }

    #[test]
    fn test_silent_combatants_get_fallback_moves() {
        let (mut encounter, a, b) = duel();
        let summary = encounter.resolve_round().unwrap();
        assert_eq!(summary.report.exchanges.len(), 1);
        assert!(encounter.ledger().previous_move(a).is_some());
        assert!(encounter.ledger().previous_move(b).is_some());
        assert_eq!(encounter.round, 2);
    }

    #[test]
    fn test_leave_retargets_attackers() {
        let (mut encounter, a, b) = duel();
        let c = Combatant::new("Cass");
        let c_id = c.id;
        encounter.join(c, b).unwrap();
        let left = encounter.leave(b).unwrap();
        assert_eq!(left.id, b);
        assert_eq!(encounter.target_of(a), Some(c_id));
        assert_eq!(encounter.target_of(c_id), Some(a));
        assert!(!encounter.is_finished());
    }

    #[test]
    fn test_is_due_when_everyone_submitted() {
        let (mut encounter, a, b) = duel();
        let now = Instant::now();
        assert!(!encounter.is_due(now));
        encounter.submit_move(a, Move::Thrust).unwrap();
        encounter.submit_move(b, Move::Thrust).unwrap();
        assert!(encounter.is_due(now));
        assert!(encounter.is_due(encounter.deadline()));
    }

    #[test]
    fn test_queued_effect_lands_at_round_end() {
        let (mut encounter, a, b) = duel();
        encounter
            .queue_effect(QueuedEffect {
                target: b,
                effect: effect_keys::STUNNED.to_string(),
                rounds: 2,
            })
            .unwrap();
        encounter.submit_move(a, Move::Dodge).unwrap();
        encounter.submit_move(b, Move::Duck).unwrap();
        encounter.resolve_round().unwrap();
        let bryn = encounter.combatant(b).unwrap();
        assert!(bryn.modifiers.has(effect_keys::STUNNED));
        assert!(matches!(
            encounter.submit_move(b, Move::Thrust),
            Err(CombatError::MoveBanned { .. })
        ));
    }
}
