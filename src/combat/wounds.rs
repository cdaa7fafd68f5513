//! Wound model: damage and bleed that decay over time
//!
//! Wounds carry raw damage (healed by heal ticks) and bleed (drained by
//! bleed ticks). Internal wounds have no location and only bleed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::combat::body_zone::BodyLocation;
use crate::combat::weapons::DamageType;

/// Descriptive wound severity, relative to max health
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WoundSeverity {
    /// Healed over
    None,
    Small,
    Minor,
    Moderate,
    Severe,
    Terrible,
    Mortal,
}

impl WoundSeverity {
    pub fn from_fraction(fraction: f64) -> Self {
        match fraction {
            f if f > 0.40 => WoundSeverity::Mortal,
            f if f > 0.30 => WoundSeverity::Terrible,
            f if f > 0.20 => WoundSeverity::Severe,
            f if f > 0.15 => WoundSeverity::Moderate,
            f if f > 0.10 => WoundSeverity::Minor,
            f if f > 0.0 => WoundSeverity::Small,
            _ => WoundSeverity::None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WoundSeverity::None => "healed",
            WoundSeverity::Small => "small",
            WoundSeverity::Minor => "minor",
            WoundSeverity::Moderate => "moderate",
            WoundSeverity::Severe => "severe",
            WoundSeverity::Terrible => "terrible",
            WoundSeverity::Mortal => "mortal",
        }
    }
}

/// How fast a wound bleeds, relative to max health
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BleedRate {
    Trickling,
    Oozing,
    Dripping,
    Spurting,
    Gushing,
    Hemorrhaging,
}

impl BleedRate {
    pub fn from_fraction(fraction: f64) -> Option<Self> {
        match fraction {
            f if f > 0.40 => Some(BleedRate::Hemorrhaging),
            f if f > 0.30 => Some(BleedRate::Gushing),
            f if f > 0.20 => Some(BleedRate::Spurting),
            f if f > 0.15 => Some(BleedRate::Dripping),
            f if f > 0.10 => Some(BleedRate::Oozing),
            f if f > 0.0 => Some(BleedRate::Trickling),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BleedRate::Trickling => "trickling",
            BleedRate::Oozing => "oozing",
            BleedRate::Dripping => "dripping",
            BleedRate::Spurting => "spurting",
            BleedRate::Gushing => "gushing",
            BleedRate::Hemorrhaging => "hemorrhaging",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wound {
    /// `None` for internal bleeding
    pub location: Option<BodyLocation>,
    pub damage: i32,
    pub bleed: i32,
    pub damage_type: Option<DamageType>,
}

impl Wound {
    pub fn new(location: BodyLocation, damage: i32, bleed: i32, damage_type: DamageType) -> Self {
        Self {
            location: Some(location),
            damage: damage.max(0),
            bleed: bleed.max(0),
            damage_type: Some(damage_type),
        }
    }

    /// Bleed-only wound with no location
    pub fn internal(bleed: i32) -> Self {
        Self {
            location: None,
            damage: 0,
            bleed: bleed.max(0),
            damage_type: None,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.location.is_none()
    }

    /// Still has damage or bleed left
    pub fn is_open(&self) -> bool {
        self.damage > 0 || self.bleed > 0
    }

    pub fn heal_tick(&mut self, decrement: i32) {
        self.damage = (self.damage - decrement).max(0);
    }

    /// Divide bleed by `divisor`; bleed under `floor` stops
    pub fn bleed_tick(&mut self, divisor: i32, floor: i32) {
        if self.bleed <= 0 {
            return;
        }
        if divisor > 0 {
            self.bleed = (f64::from(self.bleed) / f64::from(divisor)).round() as i32;
        }
        if self.bleed < floor {
            self.bleed = 0;
        }
    }

    pub fn severity(&self, max_health: i32) -> WoundSeverity {
        WoundSeverity::from_fraction(fraction(self.damage, max_health))
    }

    pub fn bleed_rate(&self, max_health: i32) -> Option<BleedRate> {
        BleedRate::from_fraction(fraction(self.bleed, max_health))
    }

    /// e.g. "a severe edge wound to the head, spurting blood"
    pub fn describe(&self, max_health: i32) -> String {
        let mut text = match (self.location, self.damage_type) {
            (Some(location), Some(damage_type)) => format!(
                "a {} {} wound to the {}",
                self.severity(max_health).label(),
                damage_type_label(damage_type),
                location
            ),
            _ => "internal bleeding".to_string(),
        };
        if let Some(rate) = self.bleed_rate(max_health) {
            text.push_str(&format!(", {} blood", rate.label()));
        }
        text
    }
}

impl fmt::Display for Wound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(location) => write!(f, "{}: {} damage, {} bleed", location, self.damage, self.bleed),
            None => write!(f, "internal: {} bleed", self.bleed),
        }
    }
}

fn fraction(amount: i32, max_health: i32) -> f64 {
    if max_health <= 0 {
        return 0.0;
    }
    f64::from(amount) / f64::from(max_health)
}

fn damage_type_label(damage_type: DamageType) -> &'static str {
    match damage_type {
        DamageType::Edge => "cutting",
        DamageType::Blunt => "crushing",
        DamageType::Pierce => "piercing",
    }
}
