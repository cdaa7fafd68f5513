//! Combo catalog
//!
//! A combo is an optional technique layered on a move. It costs positioning,
//! may only ride on certain moves, and modifies the exchange: damage and
//! positioning deltas, multipliers, a hard damage range, and effects queued
//! for the end of the round.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::combat::effects::effect_keys;
use crate::combat::moves::Move;
use crate::core::error::CombatError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComboId {
    /// Stand-in for "no combo"; contributes nothing
    #[default]
    Dummy,
    Rampage,
    Feint,
    Cleave,
    Break,
    Daze,
    Stun,
    Disarm,
    Beat,
    Impale,
    Skewer,
    Clash,
    Stagger,
    Rage,
    Smash,
    Sweep,
    Flurry,
    Counter,
    Circle,
    Twist,
    Backstab,
    ShieldBash,
}

/// Who a triggered effect lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectTarget {
    Performer,
    Victim,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectTrigger {
    /// Only when the performer wins the exchange
    OnWin,
    OnAnyOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggeredEffect {
    pub effect: &'static str,
    pub target: EffectTarget,
    pub repeats: u32,
    pub trigger: EffectTrigger,
}

impl TriggeredEffect {
    const fn on_win(effect: &'static str, target: EffectTarget, repeats: u32) -> Self {
        Self {
            effect,
            target,
            repeats,
            trigger: EffectTrigger::OnWin,
        }
    }
}

/// Text appended when the combo lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinText {
    Plain(&'static str),
    /// Break-style combos whose payoff depends on a contest
    Contested {
        success: &'static str,
        failure: &'static str,
    },
}

/// Static combo definition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Combo {
    pub id: ComboId,
    pub name: &'static str,
    pub positioning_cost: i32,
    /// Positioning the performer gains when it lands
    pub performer_positioning: i32,
    /// Positioning change inflicted on the opponent
    pub victim_positioning: i32,
    /// Extra damage on any hit the performer receives this exchange
    pub performer_damage: i32,
    /// Extra damage on the performer's own hit
    pub victim_damage: i32,
    pub performer_bleed: i32,
    pub victim_bleed: i32,
    pub damage_multiplier: f64,
    /// Fraction of final damage converted into extra bleed
    pub bleed_multiplier: f64,
    pub critical_chance_bonus: f64,
    /// Replaces the weapon's damage range; also lets defensive moves wound
    pub hard_damage_range: Option<(i32, i32)>,
    pub no_positioning_gain: bool,
    pub breaks_equipment: bool,
    /// Empty means any move is legal
    pub legal_moves: &'static [Move],
    pub triggered_effects: &'static [TriggeredEffect],
    pub active_text: &'static str,
    pub gerund_text: &'static str,
    pub win_text: WinText,
}

const OFFENSIVE: &[Move] = &Move::OFFENSIVE;
const PARRIES: &[Move] = &Move::PARRIES;

const BASE: Combo = Combo {
    id: ComboId::Dummy,
    name: "",
    positioning_cost: 0,
    performer_positioning: 0,
    victim_positioning: 0,
    performer_damage: 0,
    victim_damage: 0,
    performer_bleed: 0,
    victim_bleed: 0,
    damage_multiplier: 1.0,
    bleed_multiplier: 0.0,
    critical_chance_bonus: 0.0,
    hard_damage_range: None,
    no_positioning_gain: false,
    breaks_equipment: false,
    legal_moves: &[],
    triggered_effects: &[],
    active_text: "",
    gerund_text: "",
    win_text: WinText::Plain(""),
};

static DUMMY: Combo = BASE;

static RAMPAGE: Combo = Combo {
    id: ComboId::Rampage,
    name: "rampage",
    positioning_cost: 2,
    performer_damage: 4,
    victim_damage: 4,
    legal_moves: OFFENSIVE,
    active_text: "rampage",
    gerund_text: "rampaging",
    win_text: WinText::Plain("$s hammers into $o with reckless abandon."),
    ..BASE
};

static FEINT: Combo = Combo {
    id: ComboId::Feint,
    name: "feint",
    positioning_cost: 3,
    performer_positioning: 2,
    victim_damage: 1,
    legal_moves: OFFENSIVE,
    active_text: "feint",
    gerund_text: "feinting",
    win_text: WinText::Plain("$s draws $o out of position."),
    ..BASE
};

static CLEAVE: Combo = Combo {
    id: ComboId::Cleave,
    name: "cleave",
    positioning_cost: 3,
    bleed_multiplier: 0.5,
    legal_moves: &[Move::LowCut, Move::HighCut],
    active_text: "cleave",
    gerund_text: "cleaving",
    win_text: WinText::Plain("$gs blade bites deep."),
    ..BASE
};

static BREAK: Combo = Combo {
    id: ComboId::Break,
    name: "break",
    positioning_cost: 5,
    victim_damage: 4,
    breaks_equipment: true,
    legal_moves: OFFENSIVE,
    active_text: "smash",
    gerund_text: "smashing",
    win_text: WinText::Contested {
        success: "$gs blow shatters $go $bo!",
        failure: "$go $bo holds against the blow.",
    },
    ..BASE
};

static DAZE: Combo = Combo {
    id: ComboId::Daze,
    name: "daze",
    positioning_cost: 2,
    victim_positioning: -2,
    victim_damage: 2,
    legal_moves: OFFENSIVE,
    active_text: "daze",
    gerund_text: "dazing",
    win_text: WinText::Plain("$o staggers, dazed."),
    ..BASE
};

static STUN: Combo = Combo {
    id: ComboId::Stun,
    name: "stun",
    positioning_cost: 3,
    legal_moves: &[Move::Slash, Move::Riposte],
    triggered_effects: &[TriggeredEffect::on_win(effect_keys::STUNNED, EffectTarget::Victim, 1)],
    active_text: "stun",
    gerund_text: "stunning",
    win_text: WinText::Plain("$o is left reeling."),
    ..BASE
};

static DISARM: Combo = Combo {
    id: ComboId::Disarm,
    name: "disarm",
    positioning_cost: 2,
    legal_moves: PARRIES,
    triggered_effects: &[TriggeredEffect::on_win(effect_keys::DISARMED, EffectTarget::Victim, 1)],
    active_text: "disarm",
    gerund_text: "disarming",
    win_text: WinText::Plain("$s twists $go $wo out of line."),
    ..BASE
};

static BEAT: Combo = Combo {
    id: ComboId::Beat,
    name: "beat",
    positioning_cost: 2,
    no_positioning_gain: true,
    legal_moves: PARRIES,
    triggered_effects: &[TriggeredEffect::on_win(effect_keys::DOUBLE_DAMAGE, EffectTarget::Performer, 1)],
    active_text: "beat aside",
    gerund_text: "beating aside",
    win_text: WinText::Plain("$s slaps $go $wo wide, opening a line."),
    ..BASE
};

static IMPALE: Combo = Combo {
    id: ComboId::Impale,
    name: "impale",
    positioning_cost: 5,
    victim_damage: 6,
    bleed_multiplier: 0.5,
    legal_moves: &[Move::Thrust],
    active_text: "impale",
    gerund_text: "impaling",
    win_text: WinText::Plain("$s drives the $ws deep into $o."),
    ..BASE
};

static SKEWER: Combo = Combo {
    id: ComboId::Skewer,
    name: "skewer",
    positioning_cost: 5,
    bleed_multiplier: 1.0,
    triggered_effects: &[TriggeredEffect::on_win(effect_keys::OFF_BALANCE, EffectTarget::Victim, 2)],
    active_text: "skewer",
    gerund_text: "skewering",
    win_text: WinText::Plain("$o is run through and left off-balance."),
    ..BASE
};

static CLASH: Combo = Combo {
    id: ComboId::Clash,
    name: "clash",
    positioning_cost: 2,
    performer_positioning: 2,
    victim_positioning: -2,
    legal_moves: PARRIES,
    active_text: "clash",
    gerund_text: "clashing",
    win_text: WinText::Plain("$s drives $o back with the force of the parry."),
    ..BASE
};

static STAGGER: Combo = Combo {
    id: ComboId::Stagger,
    name: "stagger",
    positioning_cost: 5,
    legal_moves: OFFENSIVE,
    triggered_effects: &[
        TriggeredEffect::on_win(effect_keys::OFF_BALANCE, EffectTarget::Victim, 1),
        TriggeredEffect::on_win(effect_keys::DOUBLE_DAMAGE, EffectTarget::Performer, 1),
        TriggeredEffect::on_win(effect_keys::DAZED, EffectTarget::Victim, 1),
    ],
    active_text: "stagger",
    gerund_text: "staggering",
    win_text: WinText::Plain("$o staggers under the blow."),
    ..BASE
};

static RAGE: Combo = Combo {
    id: ComboId::Rage,
    name: "rage",
    positioning_cost: 5,
    legal_moves: &[
        Move::LowParry,
        Move::HighParry,
        Move::Dodge,
        Move::Disengage,
        Move::Duck,
    ],
    triggered_effects: &[TriggeredEffect::on_win(effect_keys::BUTCHERS_EDGE, EffectTarget::Performer, 3)],
    active_text: "rage",
    gerund_text: "raging",
    win_text: WinText::Plain("$s bares $gs teeth, hungry for blood."),
    ..BASE
};

static SMASH: Combo = Combo {
    id: ComboId::Smash,
    name: "smash",
    positioning_cost: 3,
    damage_multiplier: 2.0,
    legal_moves: OFFENSIVE,
    triggered_effects: &[TriggeredEffect::on_win(effect_keys::OFF_BALANCE, EffectTarget::Performer, 3)],
    active_text: "smash",
    gerund_text: "smashing",
    win_text: WinText::Plain("$s overcommits to a crushing blow."),
    ..BASE
};

static SWEEP: Combo = Combo {
    id: ComboId::Sweep,
    name: "sweep",
    positioning_cost: 3,
    victim_positioning: -2,
    legal_moves: OFFENSIVE,
    triggered_effects: &[TriggeredEffect::on_win(effect_keys::KNOCKED_DOWN, EffectTarget::Victim, 1)],
    active_text: "sweep",
    gerund_text: "sweeping",
    win_text: WinText::Plain("$o is swept off $go feet."),
    ..BASE
};

static FLURRY: Combo = Combo {
    id: ComboId::Flurry,
    name: "flurry",
    positioning_cost: 5,
    victim_damage: 6,
    legal_moves: OFFENSIVE,
    triggered_effects: &[TriggeredEffect::on_win(effect_keys::OFF_BALANCE, EffectTarget::Victim, 2)],
    active_text: "unleash a flurry",
    gerund_text: "unleashing a flurry",
    win_text: WinText::Plain("$o is battered off-balance."),
    ..BASE
};

static COUNTER: Combo = Combo {
    id: ComboId::Counter,
    name: "counter",
    positioning_cost: 2,
    performer_positioning: 2,
    legal_moves: &[Move::Riposte],
    triggered_effects: &[TriggeredEffect::on_win(effect_keys::WEAKENED, EffectTarget::Victim, 1)],
    active_text: "counter",
    gerund_text: "countering",
    win_text: WinText::Plain("$o is left too shaken to attack."),
    ..BASE
};

static CIRCLE: Combo = Combo {
    id: ComboId::Circle,
    name: "circle",
    positioning_cost: 2,
    performer_positioning: 2,
    legal_moves: &[Move::Dodge],
    triggered_effects: &[TriggeredEffect::on_win(effect_keys::PREPARED, EffectTarget::Performer, 1)],
    active_text: "circle",
    gerund_text: "circling",
    win_text: WinText::Plain("$s slips around $o, looking for an opening."),
    ..BASE
};

static TWIST: Combo = Combo {
    id: ComboId::Twist,
    name: "twist",
    positioning_cost: 3,
    bleed_multiplier: 0.5,
    legal_moves: &[Move::Thrust],
    active_text: "twist",
    gerund_text: "twisting",
    win_text: WinText::Plain("$s twists the blade in the wound."),
    ..BASE
};

static BACKSTAB: Combo = Combo {
    id: ComboId::Backstab,
    name: "backstab",
    positioning_cost: 5,
    hard_damage_range: Some((8, 24)),
    no_positioning_gain: true,
    legal_moves: &[Move::Dodge, Move::Duck],
    active_text: "backstab",
    gerund_text: "backstabbing",
    win_text: WinText::Plain("$s slips behind $o and strikes at $go back."),
    ..BASE
};

static SHIELD_BASH: Combo = Combo {
    id: ComboId::ShieldBash,
    name: "shield bash",
    positioning_cost: 2,
    victim_positioning: -2,
    legal_moves: PARRIES,
    triggered_effects: &[TriggeredEffect::on_win(effect_keys::KNOCKED_DOWN, EffectTarget::Victim, 2)],
    active_text: "shield bash",
    gerund_text: "shield bashing",
    win_text: WinText::Plain("$s slams $gs shield into $o, knocking $po down."),
    ..BASE
};

impl ComboId {
    /// Every real combo (the dummy excluded)
    pub const ALL: [ComboId; 21] = [
        ComboId::Rampage,
        ComboId::Feint,
        ComboId::Cleave,
        ComboId::Break,
        ComboId::Daze,
        ComboId::Stun,
        ComboId::Disarm,
        ComboId::Beat,
        ComboId::Impale,
        ComboId::Skewer,
        ComboId::Clash,
        ComboId::Stagger,
        ComboId::Rage,
        ComboId::Smash,
        ComboId::Sweep,
        ComboId::Flurry,
        ComboId::Counter,
        ComboId::Circle,
        ComboId::Twist,
        ComboId::Backstab,
        ComboId::ShieldBash,
    ];

    pub fn def(self) -> &'static Combo {
        match self {
            ComboId::Dummy => &DUMMY,
            ComboId::Rampage => &RAMPAGE,
            ComboId::Feint => &FEINT,
            ComboId::Cleave => &CLEAVE,
            ComboId::Break => &BREAK,
            ComboId::Daze => &DAZE,
            ComboId::Stun => &STUN,
            ComboId::Disarm => &DISARM,
            ComboId::Beat => &BEAT,
            ComboId::Impale => &IMPALE,
            ComboId::Skewer => &SKEWER,
            ComboId::Clash => &CLASH,
            ComboId::Stagger => &STAGGER,
            ComboId::Rage => &RAGE,
            ComboId::Smash => &SMASH,
            ComboId::Sweep => &SWEEP,
            ComboId::Flurry => &FLURRY,
            ComboId::Counter => &COUNTER,
            ComboId::Circle => &CIRCLE,
            ComboId::Twist => &TWIST,
            ComboId::Backstab => &BACKSTAB,
            ComboId::ShieldBash => &SHIELD_BASH,
        }
    }

    pub fn is_dummy(self) -> bool {
        self == ComboId::Dummy
    }

    pub fn from_name(text: &str) -> Option<ComboId> {
        let wanted = text.trim().to_ascii_lowercase().replace('_', " ");
        ComboId::ALL.into_iter().find(|c| c.def().name == wanted)
    }
}

impl fmt::Display for ComboId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComboId::Dummy => f.write_str("no combo"),
            other => f.write_str(other.def().name),
        }
    }
}

impl FromStr for ComboId {
    type Err = CombatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComboId::from_name(s).ok_or_else(|| CombatError::UnknownCombo(s.to_string()))
    }
}

impl Combo {
    pub fn legal_for(&self, mv: Move) -> bool {
        self.legal_moves.is_empty() || self.legal_moves.contains(&mv)
    }

    /// Moves this combo can ride on
    pub fn usable_moves(&self) -> Vec<Move> {
        if self.legal_moves.is_empty() {
            Move::FIGHTING.to_vec()
        } else {
            self.legal_moves.to_vec()
        }
    }

    /// Message listing the legal moves, if `mv` is not one of them
    pub fn legality_error(&self, mv: Move) -> Option<String> {
        if self.legal_for(mv) {
            return None;
        }
        let names: Vec<&str> = self.legal_moves.iter().map(|m| m.name()).collect();
        Some(match names.split_last() {
            Some((last, [])) => last.to_string(),
            Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
            None => String::new(),
        })
    }

    /// Why the combo can't be paid for, if it can't
    pub fn affordable_for(&self, positioning: i32) -> Option<String> {
        if positioning >= self.positioning_cost {
            None
        } else {
            Some(format!(
                "needs {} positioning, you have {}",
                self.positioning_cost, positioning
            ))
        }
    }
}
