//! Exchange narration
//!
//! Templates use `$` tokens filled per exchange:
//!
//! | token | meaning |
//! |-------|---------|
//! | `$s` / `$o` | subject / object name |
//! | `$gs` | subject's possessive pronoun |
//! | `$go` | object name, possessive |
//! | `$ps` / `$po` | subject pronoun / object pronoun (objective case) |
//! | `$ws` / `$wo` | subject / object weapon |
//! | `$bo` | the object's item a break attempt targeted |

use crate::combat::breaking::BreakOutcome;
use crate::combat::combo::{Combo, WinText};
use crate::combat::damage::StrikeReport;
use crate::combat::moves::Move;
use crate::combat::outcome::Outcome;
use crate::core::types::{CombatantId, Pronouns};

struct Wording {
    armed: &'static str,
    barehanded: &'static str,
    success: &'static str,
}

fn wording(mv: Move) -> Wording {
    let (armed, barehanded, success) = match mv {
        Move::Thrust => ("$s thrusts $gs $ws at $o", "$s jabs at $o", "$s drives home"),
        Move::HighCut => ("$s brings $gs $ws down at $go head", "$s hooks at $go head", "$s strikes high"),
        Move::LowCut => ("$s sweeps $gs $ws at $go legs", "$s kicks at $go legs", "$s strikes low"),
        Move::Slash => ("$s slashes wildly at $o", "$s flails at $o", "$s tears through $go guard"),
        Move::Riposte => ("$s ripostes off $go line", "$s counters with a quick punch", "$s turns the line and strikes back"),
        Move::Dodge => ("$s shifts $gs weight to dodge", "$s shifts $gs weight to dodge", "$s sidesteps $go attack"),
        Move::HighParry => ("$s raises $gs $ws high", "$s raises $gs arms high", "$s turns $go blow aside high"),
        Move::LowParry => ("$s drops $gs $ws low", "$s drops $gs guard low", "$s turns $go blow aside low"),
        Move::Duck => ("$s ducks", "$s ducks", "$s ducks under $go swing"),
        Move::Disengage => ("$s steps back to disengage", "$s steps back to disengage", "$s slips out of $go reach"),
        Move::Pass => ("$s holds $gs ground", "$s holds $gs ground", "$s waits"),
    };
    Wording {
        armed,
        barehanded,
        success,
    }
}

const CLASH_ARMED: &str = "Steel rings against steel as neither $s nor $o finds an opening.";
const CLASH_BAREHANDED: &str = "$s and $o circle each other, neither finding an opening.";

/// Who is speaking in a template
#[derive(Debug, Clone, Copy)]
pub struct Voice<'a> {
    pub name: &'a str,
    pub pronouns: Pronouns,
    pub weapon: &'a str,
    pub barehanded: bool,
}

fn possessive(name: &str) -> String {
    if name.ends_with('s') {
        format!("{name}'")
    } else {
        format!("{name}'s")
    }
}

/// Fill a template for `subject` acting on `object`
pub fn substitute(template: &str, subject: &Voice<'_>, object: &Voice<'_>, broken: Option<&str>) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let Some(&first) = chars.peek() else {
            out.push(c);
            break;
        };
        chars.next();
        let second = chars.peek().copied();
        let two_letter = match (first, second) {
            ('g', Some('s')) => Some(subject.pronouns.possessive().to_string()),
            ('g', Some('o')) => Some(possessive(object.name)),
            ('p', Some('s')) => Some(subject.pronouns.subjective().to_string()),
            ('p', Some('o')) => Some(object.pronouns.objective().to_string()),
            ('w', Some('s')) => Some(subject.weapon.to_string()),
            ('w', Some('o')) => Some(object.weapon.to_string()),
            ('b', Some('o')) => Some(broken.unwrap_or(object.weapon).to_string()),
            _ => None,
        };
        if let Some(text) = two_letter {
            chars.next();
            out.push_str(&text);
            continue;
        }
        match first {
            's' => out.push_str(subject.name),
            'o' => out.push_str(object.name),
            other => {
                out.push('$');
                out.push(other);
            }
        }
    }
    out
}

fn capitalize(line: String) -> String {
    let mut chars = line.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        _ => line,
    }
}

/// One side of an exchange as narration sees it
pub struct NarratedSide<'a> {
    pub id: CombatantId,
    pub voice: Voice<'a>,
    pub mv: Move,
    pub combo: &'static Combo,
    pub strike: &'a StrikeReport,
    pub max_health: i32,
}

fn opening(side: &NarratedSide<'_>, other: &NarratedSide<'_>) -> String {
    let words = wording(side.mv);
    let template = if side.voice.barehanded {
        words.barehanded
    } else {
        words.armed
    };
    let mut line = substitute(template, &side.voice, &other.voice, None);
    if !side.combo.id.is_dummy() {
        line.push_str(", ");
        line.push_str(side.combo.gerund_text);
    }
    line.push('.');
    capitalize(line)
}

fn landed(side: &NarratedSide<'_>, other: &NarratedSide<'_>, lines: &mut Vec<String>) {
    let words = wording(side.mv);
    let mut line = substitute(words.success, &side.voice, &other.voice, None);
    match &side.strike.wound {
        Some(wound) => {
            if side.strike.critical {
                line.push_str(" with a critical blow");
            }
            line.push_str(&format!(
                ", leaving {} with {}.",
                other.voice.name,
                wound.describe(other.max_health)
            ));
        }
        None => line.push('.'),
    }
    lines.push(capitalize(line));

    if let WinText::Plain(text) = side.combo.win_text {
        if !text.is_empty() {
            lines.push(capitalize(substitute(text, &side.voice, &other.voice, None)));
        }
    }
}

fn effect_lines(side: &NarratedSide<'_>, one: &NarratedSide<'_>, two: &NarratedSide<'_>, lines: &mut Vec<String>) {
    for effect in &side.strike.effects {
        let name = if effect.target == one.id {
            one.voice.name
        } else {
            two.voice.name
        };
        lines.push(format!("{name} is {} for {} rounds.", effect.effect, effect.rounds));
    }
}

/// Narrate one resolved exchange, one line per beat
pub fn narrate_exchange(
    one: &NarratedSide<'_>,
    two: &NarratedSide<'_>,
    outcome: Outcome,
    break_outcome: Option<&BreakOutcome>,
) -> Vec<String> {
    let mut lines = vec![opening(one, two), opening(two, one)];

    match outcome {
        Outcome::PlayerOne => landed(one, two, &mut lines),
        Outcome::PlayerTwo => landed(two, one, &mut lines),
        Outcome::Both => {
            landed(one, two, &mut lines);
            landed(two, one, &mut lines);
        }
        Outcome::Null => {
            let clash = if one.voice.barehanded || two.voice.barehanded {
                CLASH_BAREHANDED
            } else {
                CLASH_ARMED
            };
            lines.push(substitute(clash, &one.voice, &two.voice, None));
        }
    }

    if let Some(result) = break_outcome {
        let (breaker, parrier) = match outcome {
            Outcome::PlayerOne => (two, one),
            _ => (one, two),
        };
        if let WinText::Contested { success, failure } = breaker.combo.win_text {
            let line = match result {
                BreakOutcome::Shattered { item, .. } => {
                    substitute(success, &breaker.voice, &parrier.voice, Some(item))
                }
                BreakOutcome::Failed => substitute(failure, &breaker.voice, &parrier.voice, None),
            };
            lines.push(capitalize(line));
        }
    }

    effect_lines(one, one, two, &mut lines);
    effect_lines(two, one, two, &mut lines);
    lines
}
