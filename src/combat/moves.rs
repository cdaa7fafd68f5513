//! Move catalog and the win/lose/null matrix
//!
//! Every move carries hand-authored `beats`, `loses_to` and `nulls` lists.
//! The relation between two moves is derived from the `beats` lists alone so
//! it is symmetric by construction; `validate_matrix` checks that the other
//! two lists agree with it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::combat::modifiers::ModifierRegistry;
use crate::core::error::CombatError;

/// A move a combatant commits to for one round
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Move {
    Thrust,
    HighCut,
    LowCut,
    Slash,
    Riposte,
    Dodge,
    HighParry,
    LowParry,
    Duck,
    Disengage,
    Pass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveCategory {
    Offensive,
    Defensive,
}

/// How one move fares against another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    Beats,
    LosesTo,
    /// Each move beats the other; both connect
    Both,
    Null,
}

impl Relation {
    /// The same relation seen from the other side
    pub fn mirrored(self) -> Relation {
        match self {
            Relation::Beats => Relation::LosesTo,
            Relation::LosesTo => Relation::Beats,
            other => other,
        }
    }
}

/// Static definition of a move
#[derive(Debug)]
pub struct MoveDef {
    pub name: &'static str,
    pub alias: &'static str,
    pub category: MoveCategory,
    pub beats: &'static [Move],
    pub loses_to: &'static [Move],
    pub nulls: &'static [Move],
    pub bonus_positioning: i32,
    pub bonus_damage: i32,
    pub bonus_bleed: i32,
}

use Move::*;

static THRUST: MoveDef = MoveDef {
    name: "thrust",
    alias: "th",
    category: MoveCategory::Offensive,
    beats: &[Thrust, HighCut, LowCut, Slash, Duck, Pass],
    loses_to: &[Riposte, Dodge, HighParry, LowParry, Disengage],
    nulls: &[],
    bonus_positioning: 0,
    bonus_damage: 0,
    bonus_bleed: 0,
};

static HIGH_CUT: MoveDef = MoveDef {
    name: "high cut",
    alias: "hc",
    category: MoveCategory::Offensive,
    beats: &[LowCut, Slash, Riposte, Dodge, LowParry, Disengage, Pass],
    loses_to: &[Thrust, HighParry, Duck],
    nulls: &[HighCut],
    bonus_positioning: 0,
    bonus_damage: 0,
    bonus_bleed: 0,
};

static LOW_CUT: MoveDef = MoveDef {
    name: "low cut",
    alias: "lc",
    category: MoveCategory::Offensive,
    beats: &[HighCut, Slash, Riposte, Dodge, HighParry, Duck, Disengage, Pass],
    loses_to: &[Thrust, LowParry],
    nulls: &[LowCut],
    bonus_positioning: 0,
    bonus_damage: 0,
    bonus_bleed: 0,
};

static SLASH: MoveDef = MoveDef {
    name: "slash",
    alias: "sl",
    category: MoveCategory::Offensive,
    beats: &[HighParry, LowParry, Duck, Slash, Pass],
    loses_to: &[Thrust, HighCut, LowCut, Riposte, Dodge],
    nulls: &[Disengage],
    bonus_positioning: 0,
    bonus_damage: 4,
    bonus_bleed: 0,
};

static RIPOSTE: MoveDef = MoveDef {
    name: "riposte",
    alias: "ri",
    category: MoveCategory::Offensive,
    beats: &[Thrust, Slash, Pass],
    loses_to: &[HighCut, LowCut],
    nulls: &[Riposte, Dodge, HighParry, LowParry, Duck, Disengage],
    bonus_positioning: 0,
    bonus_damage: 0,
    bonus_bleed: 0,
};

static DODGE: MoveDef = MoveDef {
    name: "dodge",
    alias: "do",
    category: MoveCategory::Defensive,
    beats: &[Thrust, Slash, HighParry, LowParry, Pass],
    loses_to: &[HighCut, LowCut],
    nulls: &[Riposte, Dodge, Duck, Disengage],
    bonus_positioning: 0,
    bonus_damage: 0,
    bonus_bleed: 0,
};

static HIGH_PARRY: MoveDef = MoveDef {
    name: "high parry",
    alias: "hp",
    category: MoveCategory::Defensive,
    beats: &[Thrust, HighCut, Pass],
    loses_to: &[LowCut, Slash, Dodge, Duck],
    nulls: &[Riposte, HighParry, LowParry, Disengage],
    bonus_positioning: 0,
    bonus_damage: 0,
    bonus_bleed: 0,
};

static LOW_PARRY: MoveDef = MoveDef {
    name: "low parry",
    alias: "lp",
    category: MoveCategory::Defensive,
    beats: &[Thrust, LowCut, Pass],
    loses_to: &[HighCut, Slash, Dodge, Duck],
    nulls: &[Riposte, HighParry, LowParry, Disengage],
    bonus_positioning: 0,
    bonus_damage: 0,
    bonus_bleed: 0,
};

static DUCK: MoveDef = MoveDef {
    name: "duck",
    alias: "du",
    category: MoveCategory::Defensive,
    beats: &[HighCut, HighParry, LowParry, Pass],
    loses_to: &[Thrust, LowCut, Slash],
    nulls: &[Riposte, Dodge, Duck, Disengage],
    bonus_positioning: 0,
    bonus_damage: 0,
    bonus_bleed: 0,
};

static DISENGAGE: MoveDef = MoveDef {
    name: "disengage",
    alias: "di",
    category: MoveCategory::Defensive,
    beats: &[Thrust, Pass],
    loses_to: &[HighCut, LowCut],
    nulls: &[Slash, Riposte, Dodge, HighParry, LowParry, Duck, Disengage],
    bonus_positioning: 2,
    bonus_damage: 0,
    bonus_bleed: 0,
};

static PASS: MoveDef = MoveDef {
    name: "pass",
    alias: "pass",
    category: MoveCategory::Defensive,
    beats: &[],
    loses_to: &[
        Thrust, HighCut, LowCut, Slash, Riposte, Dodge, HighParry, LowParry, Duck, Disengage,
    ],
    nulls: &[Pass],
    bonus_positioning: 0,
    bonus_damage: 0,
    bonus_bleed: 0,
};

impl Move {
    /// Every move, pass included
    pub const ALL: [Move; 11] = [
        Thrust, HighCut, LowCut, Slash, Riposte, Dodge, HighParry, LowParry, Duck, Disengage, Pass,
    ];

    /// The ten moves a combatant actually fights with
    pub const FIGHTING: [Move; 10] = [
        Thrust, HighCut, LowCut, Slash, Riposte, Dodge, HighParry, LowParry, Duck, Disengage,
    ];

    pub const OFFENSIVE: [Move; 5] = [Thrust, HighCut, LowCut, Slash, Riposte];
    pub const DEFENSIVE: [Move; 5] = [Dodge, HighParry, LowParry, Duck, Disengage];
    pub const PARRIES: [Move; 2] = [HighParry, LowParry];

    pub fn def(self) -> &'static MoveDef {
        match self {
            Thrust => &THRUST,
            HighCut => &HIGH_CUT,
            LowCut => &LOW_CUT,
            Slash => &SLASH,
            Riposte => &RIPOSTE,
            Dodge => &DODGE,
            HighParry => &HIGH_PARRY,
            LowParry => &LOW_PARRY,
            Duck => &DUCK,
            Disengage => &DISENGAGE,
            Pass => &PASS,
        }
    }

    pub fn name(self) -> &'static str {
        self.def().name
    }

    pub fn category(self) -> MoveCategory {
        self.def().category
    }

    pub fn is_offensive(self) -> bool {
        self.category() == MoveCategory::Offensive
    }

    pub fn is_parry(self) -> bool {
        matches!(self, HighParry | LowParry)
    }

    /// Whether this move's authored win list contains `other`
    pub fn beats(self, other: Move) -> bool {
        self.def().beats.contains(&other)
    }

    /// Relation of `self` against `other`, derived from the win lists
    pub fn relation(self, other: Move) -> Relation {
        match (self.beats(other), other.beats(self)) {
            (true, true) => Relation::Both,
            (true, false) => Relation::Beats,
            (false, true) => Relation::LosesTo,
            (false, false) => Relation::Null,
        }
    }

    /// Look up a move by its full name or short alias
    pub fn from_name(text: &str) -> Option<Move> {
        let wanted = text.trim().to_ascii_lowercase().replace('_', " ");
        Move::ALL
            .into_iter()
            .find(|mv| mv.def().name == wanted || mv.def().alias == wanted)
    }

    /// Why an active effect forbids this move, if one does
    pub fn blocked_reason(self, modifiers: &ModifierRegistry) -> Option<String> {
        modifiers.ban_reason(self)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Move {
    type Err = CombatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Move::from_name(s).ok_or_else(|| CombatError::UnknownMove(s.to_string()))
    }
}

/// One disagreement between the authored lists and the derived relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixIssue {
    pub mv: Move,
    pub other: Move,
    pub problem: &'static str,
}

/// Cross-check the authored `loses_to` and `nulls` lists against the win lists
pub fn validate_matrix() -> Vec<MatrixIssue> {
    let mut issues = Vec::new();

    for mv in Move::ALL {
        let def = mv.def();
        for other in Move::ALL {
            let relation = mv.relation(other);
            let listed_loss = def.loses_to.contains(&other);
            let listed_null = def.nulls.contains(&other);

            if relation == Relation::LosesTo && !listed_loss {
                issues.push(MatrixIssue {
                    mv,
                    other,
                    problem: "beaten but missing from loses_to",
                });
            }
            if listed_loss && relation != Relation::LosesTo {
                issues.push(MatrixIssue {
                    mv,
                    other,
                    problem: "listed in loses_to but not beaten",
                });
            }
            if listed_null && relation != Relation::Null {
                issues.push(MatrixIssue {
                    mv,
                    other,
                    problem: "listed in nulls but decisive",
                });
            }
        }
    }

    issues
}
