//! Combat stances and the fallback move chooser
//!
//! A combatant who doesn't submit a move in time fights according to their
//! stance: offensive stances pick attacks, defensive stances pick defences,
//! balanced stances pick either. Each stance also avoids moves that would
//! lose to what the opponent just did.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::combat::modifiers::BanState;
use crate::combat::moves::{Move, MoveCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Offensive,
    Defensive,
    #[default]
    Balanced,
}

/// "After the opponent used `opponent_move`, don't answer with `avoid`"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StanceRule {
    pub opponent_move: Move,
    pub avoid: Move,
}

const fn rule(opponent_move: Move, avoid: Move) -> StanceRule {
    StanceRule {
        opponent_move,
        avoid,
    }
}

const OFFENSIVE_RULES: &[StanceRule] = &[
    rule(Move::Thrust, Move::Riposte),
    rule(Move::HighParry, Move::Slash),
    rule(Move::LowParry, Move::Slash),
];

const DEFENSIVE_RULES: &[StanceRule] = &[
    rule(Move::HighCut, Move::Duck),
    rule(Move::HighCut, Move::HighParry),
    rule(Move::LowCut, Move::LowParry),
    rule(Move::Thrust, Move::Dodge),
];

impl Stance {
    pub fn rules(self) -> Vec<StanceRule> {
        match self {
            Stance::Offensive => OFFENSIVE_RULES.to_vec(),
            Stance::Defensive => DEFENSIVE_RULES.to_vec(),
            Stance::Balanced => OFFENSIVE_RULES
                .iter()
                .chain(DEFENSIVE_RULES)
                .copied()
                .collect(),
        }
    }

    /// Whether the stance fights with moves of this category
    pub fn admits(self, category: MoveCategory) -> bool {
        match self {
            Stance::Offensive => category == MoveCategory::Offensive,
            Stance::Defensive => category == MoveCategory::Defensive,
            Stance::Balanced => true,
        }
    }
}

/// What the chooser knows about the combatant's situation
#[derive(Debug, Clone)]
pub struct FallbackContext {
    pub stance: Stance,
    pub bans: BanState,
    pub previous_move: Option<Move>,
    pub opponent_previous_move: Option<Move>,
}

/// Pick a move for a combatant who didn't submit one
///
/// Active bans take priority: a fully banned combatant passes, and a
/// partially banned one picks any allowed move regardless of stance.
pub fn choose_fallback_move<R: Rng + ?Sized>(ctx: &FallbackContext, rng: &mut R) -> Move {
    let mut candidates: Vec<Move> = Move::FIGHTING
        .into_iter()
        .filter(|mv| Some(*mv) != ctx.previous_move)
        .collect();

    match &ctx.bans {
        BanState::All => return Move::Pass,
        BanState::Partial(banned) => {
            candidates.retain(|mv| !banned.contains(mv));
            return candidates.choose(rng).copied().unwrap_or(Move::Pass);
        }
        BanState::Free => {}
    }

    candidates.retain(|mv| ctx.stance.admits(mv.category()));
    if let Some(opponent_move) = ctx.opponent_previous_move {
        let rules = ctx.stance.rules();
        candidates.retain(|mv| {
            !rules
                .iter()
                .any(|r| r.opponent_move == opponent_move && r.avoid == *mv)
        });
    }

    candidates.choose(rng).copied().unwrap_or(Move::Pass)
}
