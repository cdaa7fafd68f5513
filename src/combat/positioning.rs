//! Positioning changes from one exchange
//!
//! Returns net deltas (gains minus combo costs). The caller adds them to the
//! combatants and clamps to the positioning bounds.

use crate::combat::breaking::BreakOutcome;
use crate::combat::combatant::Combatant;
use crate::combat::combo::Combo;
use crate::combat::constants::{
    DEFENSIVE_POSITIONING_GAIN, NO_MASTERY_PENALTY, OFFENSIVE_POSITIONING_GAIN, SHIELD_BONUS_CAP,
};
use crate::combat::damage::StrikeReport;
use crate::combat::effects::trait_keys;
use crate::combat::modifiers::{StatKey, WinCondition};
use crate::combat::moves::{Move, MoveCategory};
use crate::combat::outcome::Outcome;

/// One side of the exchange as positioning sees it
pub struct PositionSide<'a> {
    pub combatant: &'a Combatant,
    pub mv: Move,
    pub combo: &'static Combo,
    pub strike: &'a StrikeReport,
}

impl PositionSide<'_> {
    fn stat(&self, stat: StatKey, condition: WinCondition) -> i32 {
        self.combatant
            .modifiers
            .stat(stat, condition, self.mv, self.combo.id)
            .round() as i32
    }

    /// Gains from status effects for the given result
    fn effect_gain(&self, condition: WinCondition) -> i32 {
        self.stat(StatKey::PosGain, condition) + self.stat(StatKey::PosVuln, condition)
    }

    fn cost(&self, condition: WinCondition) -> i32 {
        self.combo.positioning_cost + self.stat(StatKey::TechPosMod, condition)
    }

    fn trained_with_weapon(&self) -> bool {
        self.strike
            .weapon_category
            .mastery_trait()
            .is_some_and(|key| self.combatant.has_trait(key))
    }

    /// Extra defensive gain from parrying with a trained shield
    fn shield_bonus(&self, opponent: &PositionSide<'_>) -> i32 {
        if !self.mv.is_parry() || !self.combatant.has_trait(trait_keys::SHIELD_MASTERY) {
            return 0;
        }
        match self.combatant.loadout.shield() {
            Some(shield) => {
                let opponent_mod = opponent.stat(StatKey::ShieldQMod, WinCondition::Lose);
                (i32::from(shield.quality) + opponent_mod - 1).min(SHIELD_BONUS_CAP)
            }
            None => 0,
        }
    }

    /// Best positional modifier among the held weapons for this move
    fn weapon_modifier(&self) -> i32 {
        self.combatant
            .loadout
            .striking_weapons()
            .iter()
            .filter_map(|(_, w)| w.positional_modifier_for(self.mv))
            .max()
            .unwrap_or(0)
    }

    /// Gain for landing this move, before the opponent's combo is considered
    fn winning_gain(&self, opponent: &PositionSide<'_>) -> i32 {
        let mut gain = match self.mv.category() {
            MoveCategory::Offensive => OFFENSIVE_POSITIONING_GAIN,
            MoveCategory::Defensive => DEFENSIVE_POSITIONING_GAIN + self.shield_bonus(opponent),
        };
        if !self.trained_with_weapon() {
            gain -= NO_MASTERY_PENALTY;
        }
        gain += self.mv.def().bonus_positioning + self.combo.performer_positioning;
        gain += self.weapon_modifier();
        gain.max(0)
    }

    fn finish(&self, gain: i32) -> i32 {
        if self.combo.no_positioning_gain || self.combatant.modifiers.forbids_positioning() {
            0
        } else {
            gain
        }
    }
}

/// Net positioning deltas `(one, two)` for a resolved exchange
pub fn exchange_positioning(
    one: &PositionSide<'_>,
    two: &PositionSide<'_>,
    outcome: Outcome,
    break_outcome: Option<&BreakOutcome>,
) -> (i32, i32) {
    match outcome {
        Outcome::PlayerOne => single_winner(one, two, break_outcome),
        Outcome::PlayerTwo => {
            let (two_delta, one_delta) = single_winner(two, one, break_outcome);
            (one_delta, two_delta)
        }
        Outcome::Both => {
            let one_gain = one.winning_gain(two)
                + two.combo.victim_positioning
                + one.effect_gain(WinCondition::Win)
                + two.strike.critical_positioning();
            let two_gain = two.winning_gain(one)
                + one.combo.victim_positioning
                + two.effect_gain(WinCondition::Win)
                + one.strike.critical_positioning();
            (
                one.finish(one_gain) - one.cost(WinCondition::Win),
                two.finish(two_gain) - two.cost(WinCondition::Win),
            )
        }
        Outcome::Null => (
            one.finish(one.effect_gain(WinCondition::Null)) - one.cost(WinCondition::Lose),
            two.finish(two.effect_gain(WinCondition::Null)) - two.cost(WinCondition::Lose),
        ),
    }
}

fn single_winner(
    winner: &PositionSide<'_>,
    loser: &PositionSide<'_>,
    break_outcome: Option<&BreakOutcome>,
) -> (i32, i32) {
    let mut win_gain = winner.winning_gain(loser);
    if matches!(break_outcome, Some(BreakOutcome::Shattered { .. })) {
        // a shattered item earns no positioning
        win_gain = 0;
    }

    let lose_gain = winner.combo.victim_positioning
        + loser.effect_gain(WinCondition::Lose)
        + winner.strike.critical_positioning();

    (
        winner.finish(win_gain) - winner.cost(WinCondition::Win),
        loser.finish(lose_gain) - loser.cost(WinCondition::Lose),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::combo::ComboId;
    use crate::combat::effects::{EffectLibrary, effect_keys, Trait};
    use crate::combat::equipment::Hand;
    use crate::combat::weapons::{DamageType, WeaponCategory, WeaponProfile};

    fn report(category: WeaponCategory) -> StrikeReport {
        StrikeReport {
            hand: Some(Hand::Main),
            weapon_name: "test".into(),
            weapon_category: category,
            damage_type: DamageType::Edge,
            roll: 0,
            location: None,
            critical: false,
            damage: 0,
            bleed: 0,
            wound: None,
            effects: Vec::new(),
        }
    }

    fn deltas(
        a: &Combatant,
        a_move: Move,
        a_combo: ComboId,
        b: &Combatant,
        b_move: Move,
        outcome: Outcome,
    ) -> (i32, i32) {
        let a_report = report(a.loadout.striking_weapons().first().map_or(WeaponCategory::Unarmed, |(_, w)| w.category));
        let b_report = report(b.loadout.striking_weapons().first().map_or(WeaponCategory::Unarmed, |(_, w)| w.category));
        let one = PositionSide {
            combatant: a,
            mv: a_move,
            combo: a_combo.def(),
            strike: &a_report,
        };
        let two = PositionSide {
            combatant: b,
            mv: b_move,
            combo: ComboId::Dummy.def(),
            strike: &b_report,
        };
        exchange_positioning(&one, &two, outcome, None)
    }

    #[test]
    fn test_trained_offensive_win() {
        let a = Combatant::new("A").armed_with(WeaponProfile::longsword(), true);
        let b = Combatant::new("B");
        let (one, two) = deltas(&a, Move::Thrust, ComboId::Dummy, &b, Move::Dodge, Outcome::PlayerOne);
        assert_eq!(one, 1);
        assert_eq!(two, 0);
    }

    #[test]
    fn test_untrained_penalty() {
        let a = Combatant::new("A").armed_with(WeaponProfile::longsword(), false);
        let b = Combatant::new("B");
        let (one, _) = deltas(&a, Move::HighParry, ComboId::Dummy, &b, Move::Thrust, Outcome::PlayerOne);
        assert_eq!(one, 1);
    }

    #[test]
    fn test_disengage_bonus() {
        let a = Combatant::new("A").armed_with(WeaponProfile::longsword(), true);
        let b = Combatant::new("B");
        let (one, _) = deltas(&a, Move::Disengage, ComboId::Dummy, &b, Move::Thrust, Outcome::PlayerOne);
        assert_eq!(one, 4);
    }

    #[test]
    fn test_battleaxe_parry_gains_nothing() {
        let a = Combatant::new("A").armed_with(WeaponProfile::battleaxe(), true);
        let b = Combatant::new("B");
        let (one, _) = deltas(&a, Move::HighParry, ComboId::Dummy, &b, Move::Thrust, Outcome::PlayerOne);
        assert_eq!(one, 0);
    }

    #[test]
    fn test_shield_parry_bonus() {
        let mut a = Combatant::new("A").armed_with(WeaponProfile::longsword(), true);
        a.equip(Hand::Off, WeaponProfile::shield().with_quality(3), true);
        let b = Combatant::new("B");
        let (one, _) = deltas(&a, Move::LowParry, ComboId::Dummy, &b, Move::LowCut, Outcome::PlayerOne);
        assert_eq!(one, 2 + 2);
    }

    #[test]
    fn test_combo_cost_and_no_gain_flag() {
        let a = Combatant::new("A").armed_with(WeaponProfile::dagger(), true);
        let b = Combatant::new("B");
        let (one, _) = deltas(&a, Move::Dodge, ComboId::Backstab, &b, Move::Thrust, Outcome::PlayerOne);
        assert_eq!(one, -5);
    }

    #[test]
    fn test_loser_takes_victim_delta() {
        let a = Combatant::new("A").armed_with(WeaponProfile::mace(), true);
        let b = Combatant::new("B");
        let (one, two) = deltas(&a, Move::Thrust, ComboId::Daze, &b, Move::Duck, Outcome::PlayerOne);
        assert_eq!(one, 1 - 2);
        assert_eq!(two, -2);
    }

    #[test]
    fn test_null_pays_cost_only() {
        let a = Combatant::new("A").armed_with(WeaponProfile::longsword(), true);
        let b = Combatant::new("B");
        let (one, two) = deltas(&a, Move::HighCut, ComboId::Feint, &b, Move::HighCut, Outcome::Null);
        assert_eq!(one, -3);
        assert_eq!(two, 0);
    }

    #[test]
    fn test_forbidden_positioning() {
        let mut a = Combatant::new("A").armed_with(WeaponProfile::longsword(), true);
        a.attach(Box::new(EffectLibrary::standard().get(effect_keys::OFF_BALANCE).cloned().unwrap()));
        a.learn(Trait::new("spare"));
        let b = Combatant::new("B");
        let (one, _) = deltas(&a, Move::Thrust, ComboId::Dummy, &b, Move::Pass, Outcome::PlayerOne);
        assert_eq!(one, 0);
    }

    #[test]
    fn test_both_sides_gain() {
        let a = Combatant::new("A").armed_with(WeaponProfile::longsword(), true);
        let b = Combatant::new("B").armed_with(WeaponProfile::longsword(), true);
        let (one, two) = deltas(&a, Move::Thrust, ComboId::Dummy, &b, Move::Thrust, Outcome::Both);
        assert_eq!((one, two), (1, 1));
    }
}
