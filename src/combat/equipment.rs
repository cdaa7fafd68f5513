//! What a combatant carries into a fight
//!
//! Two hands and armor per body location. Two-handed weapons occupy both
//! hands; a combatant with nothing able to strike falls back to the unarmed
//! profile.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::combat::armor::ArmorPiece;
use crate::combat::body_zone::BodyLocation;
use crate::combat::combo::ComboId;
use crate::combat::weapons::WeaponProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Main,
    Off,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loadout {
    pub main_hand: Option<WeaponProfile>,
    pub off_hand: Option<WeaponProfile>,
    pub armor: BTreeMap<BodyLocation, ArmorPiece>,
    pub unarmed: WeaponProfile,
}

impl Default for Loadout {
    fn default() -> Self {
        Self {
            main_hand: None,
            off_hand: None,
            armor: BTreeMap::new(),
            unarmed: WeaponProfile::fists(),
        }
    }
}

impl Loadout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `weapon` in `hand`, returning whatever it displaces
    pub fn wield(&mut self, hand: Hand, weapon: WeaponProfile) -> Vec<WeaponProfile> {
        let mut displaced = Vec::new();
        if weapon.hands >= 2 {
            displaced.extend(self.main_hand.take());
            displaced.extend(self.off_hand.take());
            self.main_hand = Some(weapon);
            return displaced;
        }

        if self.main_hand.as_ref().is_some_and(|w| w.hands >= 2) {
            displaced.extend(self.main_hand.take());
        }
        let slot = match hand {
            Hand::Main => &mut self.main_hand,
            Hand::Off => &mut self.off_hand,
        };
        displaced.extend(slot.replace(weapon));
        displaced
    }

    pub fn wear(&mut self, location: BodyLocation, piece: ArmorPiece) -> Option<ArmorPiece> {
        self.armor.insert(location, piece)
    }

    pub fn item(&self, hand: Hand) -> Option<&WeaponProfile> {
        match hand {
            Hand::Main => self.main_hand.as_ref(),
            Hand::Off => self.off_hand.as_ref(),
        }
    }

    pub fn item_mut(&mut self, hand: Hand) -> Option<&mut WeaponProfile> {
        match hand {
            Hand::Main => self.main_hand.as_mut(),
            Hand::Off => self.off_hand.as_mut(),
        }
    }

    /// Every held item with its hand
    pub fn held(&self) -> impl Iterator<Item = (Hand, &WeaponProfile)> {
        [(Hand::Main, self.main_hand.as_ref()), (Hand::Off, self.off_hand.as_ref())]
            .into_iter()
            .filter_map(|(hand, item)| item.map(|w| (hand, w)))
    }

    /// Held items that can strike (shields excluded)
    pub fn striking_weapons(&self) -> Vec<(Hand, &WeaponProfile)> {
        self.held().filter(|(_, w)| !w.is_shield()).collect()
    }

    /// An intact shield, if one is held
    pub fn shield(&self) -> Option<&WeaponProfile> {
        self.held()
            .map(|(_, w)| w)
            .find(|w| w.is_shield() && !w.broken)
    }

    /// Held items an opponent could break
    pub fn breakable_items(&self) -> Vec<Hand> {
        self.held()
            .filter(|(_, w)| w.breakable && !w.broken)
            .map(|(hand, _)| hand)
            .collect()
    }

    pub fn armor_at(&self, location: BodyLocation) -> Option<&ArmorPiece> {
        self.armor.get(&location)
    }

    /// Combos granted by held items, in hand order, deduplicated
    pub fn granted_combos(&self) -> Vec<ComboId> {
        let mut combos = Vec::new();
        for (_, item) in self.held() {
            for combo in item.category.combos() {
                if !combos.contains(combo) {
                    combos.push(*combo);
                }
            }
        }
        combos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::armor::ArmorType;

    #[test]
    fn test_two_handed_clears_both_hands() {
        let mut loadout = Loadout::new();
        loadout.wield(Hand::Main, WeaponProfile::longsword());
        loadout.wield(Hand::Off, WeaponProfile::shield());

        let displaced = loadout.wield(Hand::Main, WeaponProfile::greatsword());
        assert_eq!(displaced.len(), 2);
        assert!(loadout.off_hand.is_none());
        assert_eq!(loadout.striking_weapons().len(), 1);
    }

    #[test]
    fn test_one_hander_displaces_two_hander() {
        let mut loadout = Loadout::new();
        loadout.wield(Hand::Main, WeaponProfile::stave());
        let displaced = loadout.wield(Hand::Off, WeaponProfile::dagger());
        assert_eq!(displaced[0].name, "stave");
        assert!(loadout.main_hand.is_none());
    }

    #[test]
    fn test_shield_is_not_a_striking_weapon() {
        let mut loadout = Loadout::new();
        loadout.wield(Hand::Main, WeaponProfile::mace());
        loadout.wield(Hand::Off, WeaponProfile::shield());

        assert_eq!(loadout.striking_weapons().len(), 1);
        assert!(loadout.shield().is_some());
        assert_eq!(loadout.breakable_items(), vec![Hand::Main, Hand::Off]);
        assert!(loadout.granted_combos().contains(&ComboId::ShieldBash));
        assert!(loadout.granted_combos().contains(&ComboId::Break));
    }

    #[test]
    fn test_broken_shield_is_ignored() {
        let mut loadout = Loadout::new();
        let mut shield = WeaponProfile::shield();
        shield.break_item();
        loadout.wield(Hand::Off, shield);
        assert!(loadout.shield().is_none());
        assert!(loadout.breakable_items().is_empty());
    }

    #[test]
    fn test_armor_by_location() {
        let mut loadout = Loadout::new();
        loadout.wear(BodyLocation::Head, ArmorPiece::new("helm", ArmorType::Plate, 1));
        assert!(loadout.armor_at(BodyLocation::Head).is_some());
        assert!(loadout.armor_at(BodyLocation::Feet).is_none());
    }
}
