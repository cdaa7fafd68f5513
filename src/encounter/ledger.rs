//! Per-round bookkeeping for one encounter

use std::collections::BTreeMap;

use crate::combat::combo::ComboId;
use crate::combat::damage::QueuedEffect;
use crate::combat::moves::Move;
use crate::core::types::CombatantId;

/// Pending input and side-action requests
///
/// Moves, combos and the rescue/shift/stop requests last one round. Flee
/// counters and the previous-move history survive [`RoundLedger::reset_round`].
#[derive(Debug, Clone, Default)]
pub struct RoundLedger {
    pub moves: BTreeMap<CombatantId, Move>,
    pub combos: BTreeMap<CombatantId, ComboId>,
    pub previous_moves: BTreeMap<CombatantId, Move>,
    /// Effects queued outside the resolver, applied with the round's own
    pub pending_effects: Vec<QueuedEffect>,
    /// Rounds survived since declaring a flee
    pub flee: BTreeMap<CombatantId, u32>,
    /// rescuer -> rescuee
    pub rescue: BTreeMap<CombatantId, CombatantId>,
    /// shifter -> new target
    pub shift: BTreeMap<CombatantId, CombatantId>,
    /// requester -> opponent
    pub stop: BTreeMap<CombatantId, CombatantId>,
}

impl RoundLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_submitted(&self, id: CombatantId) -> bool {
        self.moves.contains_key(&id)
    }

    pub fn previous_move(&self, id: CombatantId) -> Option<Move> {
        self.previous_moves.get(&id).copied()
    }

    pub fn is_fleeing(&self, id: CombatantId) -> bool {
        self.flee.contains_key(&id)
    }

    pub fn is_shifting(&self, id: CombatantId) -> bool {
        self.shift.contains_key(&id)
    }

    /// Drop everything recorded for a combatant who left
    pub fn forget(&mut self, id: CombatantId) {
        self.moves.remove(&id);
        self.combos.remove(&id);
        self.previous_moves.remove(&id);
        self.pending_effects.retain(|e| e.target != id);
        self.flee.remove(&id);
        self.rescue.retain(|rescuer, rescuee| *rescuer != id && *rescuee != id);
        self.shift.retain(|shifter, target| *shifter != id && *target != id);
        self.stop.retain(|requester, opponent| *requester != id && *opponent != id);
    }

    /// Close the round: this round's moves become history and the
    /// one-round requests are cleared
    pub fn reset_round(&mut self) {
        let moves = std::mem::take(&mut self.moves);
        self.previous_moves.extend(moves);
        self.combos.clear();
        self.pending_effects.clear();
        self.rescue.clear();
        self.shift.clear();
        self.stop.clear();
    }
}
