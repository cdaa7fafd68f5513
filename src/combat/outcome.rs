//! Exchange outcome
//!
//! The move matrix gives a base result. Three adjustments follow, in order:
//! a side that isn't attacking can't score, a feint flips or cancels
//! certain results, and identical combos landing on both sides are settled by
//! round-start positioning.

use serde::{Deserialize, Serialize};

use crate::combat::combo::ComboId;
use crate::combat::moves::{Move, MoveCategory, Relation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    PlayerOne,
    PlayerTwo,
    Both,
    Null,
}

impl Outcome {
    pub fn one_scores(self) -> bool {
        matches!(self, Outcome::PlayerOne | Outcome::Both)
    }

    pub fn two_scores(self) -> bool {
        matches!(self, Outcome::PlayerTwo | Outcome::Both)
    }
}

/// One side of an exchange as the outcome rules see it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Side {
    pub mv: Move,
    pub combo: ComboId,
    /// This side chose the other as its target
    pub attacking: bool,
    /// Positioning frozen at round start
    pub positioning: i32,
}

pub fn base_outcome(one: Move, two: Move) -> Outcome {
    match one.relation(two) {
        Relation::Beats => Outcome::PlayerOne,
        Relation::LosesTo => Outcome::PlayerTwo,
        Relation::Both => Outcome::Both,
        Relation::Null => Outcome::Null,
    }
}

/// Only a side that is attacking can score
fn require_attack(outcome: Outcome, one: &Side, two: &Side) -> Outcome {
    match outcome {
        Outcome::PlayerOne if !one.attacking => Outcome::Null,
        Outcome::PlayerTwo if !two.attacking => Outcome::Null,
        Outcome::Both => match (one.attacking, two.attacking) {
            (true, true) => Outcome::Both,
            (true, false) => Outcome::PlayerOne,
            (false, true) => Outcome::PlayerTwo,
            (false, false) => Outcome::Null,
        },
        other => other,
    }
}

/// Categories of the (winner, loser) moves; for `Both`, (one, two)
fn categories(outcome: Outcome, one: &Side, two: &Side) -> (MoveCategory, MoveCategory) {
    match outcome {
        Outcome::PlayerTwo => (two.mv.category(), one.mv.category()),
        _ => (one.mv.category(), two.mv.category()),
    }
}

fn apply_feint(outcome: Outcome, one: &Side, two: &Side) -> Outcome {
    use MoveCategory::{Defensive, Offensive};

    let one_feints = one.combo == ComboId::Feint;
    let two_feints = two.combo == ComboId::Feint;
    if !one_feints && !two_feints {
        return outcome;
    }

    let (winner_cat, loser_cat) = categories(outcome, one, two);
    match outcome {
        Outcome::Both if one_feints && two_feints => Outcome::Null,
        Outcome::Both if one_feints => Outcome::PlayerTwo,
        Outcome::Both => Outcome::PlayerOne,
        // A feint that loses to a defence turns the defence around
        Outcome::PlayerOne if two_feints && winner_cat == Defensive && loser_cat == Offensive => {
            Outcome::PlayerTwo
        }
        Outcome::PlayerTwo if one_feints && winner_cat == Defensive && loser_cat == Offensive => {
            Outcome::PlayerOne
        }
        // A feint that wins is only a feint: it commits nothing
        Outcome::PlayerOne if one_feints && winner_cat == Offensive => Outcome::Null,
        Outcome::PlayerTwo if two_feints && winner_cat == Offensive => Outcome::Null,
        other => other,
    }
}

/// Identical real combos on a mutual hit: better positioning wins
fn break_combo_tie(outcome: Outcome, one: &Side, two: &Side) -> Outcome {
    if outcome != Outcome::Both || one.combo != two.combo || one.combo.is_dummy() {
        return outcome;
    }
    match one.positioning.cmp(&two.positioning) {
        std::cmp::Ordering::Greater => Outcome::PlayerOne,
        std::cmp::Ordering::Less => Outcome::PlayerTwo,
        std::cmp::Ordering::Equal => Outcome::Null,
    }
}

pub fn determine_outcome(one: &Side, two: &Side) -> Outcome {
    let outcome = base_outcome(one.mv, two.mv);
    let outcome = require_attack(outcome, one, two);
    let outcome = apply_feint(outcome, one, two);
    let outcome = require_attack(outcome, one, two);
    break_combo_tie(outcome, one, two)
}
