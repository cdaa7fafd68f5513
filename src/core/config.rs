//! Combat configuration with documented tunables
//!
//! Values that a game operator may want to rebalance live here. Rules that
//! define the shape of the combat system itself (positioning bounds, base
//! gains, quality caps) are fixed in [`crate::combat::constants`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{CombatError, Result};

/// Damage dampener applied when the defender is already badly hurt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DampenerConfig {
    /// Defender health fraction at or below which damage is softened
    pub moderate_threshold: f64,
    /// Multiplier applied between the two thresholds
    pub moderate_factor: f64,
    /// Defender health fraction below which damage is softened further
    pub severe_threshold: f64,
    /// Multiplier applied below `severe_threshold`
    pub severe_factor: f64,
}

impl Default for DampenerConfig {
    fn default() -> Self {
        Self {
            moderate_threshold: 0.5,
            moderate_factor: 0.8,
            severe_threshold: 0.25,
            severe_factor: 0.6,
        }
    }
}

/// Positioning requirement and price of a side action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SideActionRule {
    /// Positioning needed to declare the action
    pub threshold: i32,
    /// Positioning paid when the action resolves
    pub cost: i32,
}

impl Default for SideActionRule {
    fn default() -> Self {
        Self {
            threshold: 2,
            cost: 2,
        }
    }
}

/// Fleeing needs a streak of survived rounds on top of the usual rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FleeRule {
    pub threshold: i32,
    pub cost: i32,
    /// Consecutive rounds without being scored against before escaping
    pub rounds: u32,
}

impl Default for FleeRule {
    fn default() -> Self {
        Self {
            threshold: 3,
            cost: 3,
            rounds: 2,
        }
    }
}

/// Configuration for combat encounters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CombatConfig {
    // === ROUND TIMING ===
    /// How long a round collects submissions before it resolves anyway
    ///
    /// Rounds also close early once every combatant has submitted.
    pub round_timeout_ms: u64,

    /// Seed for encounter RNGs; `None` draws from entropy
    pub rng_seed: Option<u64>,

    // === WOUNDS ===
    /// Damage removed from every wound per heal tick
    pub heal_decrement: i32,

    /// Bleed is divided by this on each bleed tick (0 disables decay)
    pub bleed_divisor: i32,

    /// Bleed below this after a tick stops entirely
    pub bleed_floor: i32,

    /// Health of a freshly created combatant
    pub max_health: i32,

    // === RESOLUTION ===
    /// Tied break contests are re-rolled at most this many times
    pub break_retry_limit: u32,

    pub dampener: DampenerConfig,

    // === SIDE ACTIONS ===
    pub flee: FleeRule,
    pub rescue: SideActionRule,
    pub shift: SideActionRule,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            round_timeout_ms: 40_000,
            rng_seed: None,

            heal_decrement: 3,
            bleed_divisor: 2,
            bleed_floor: 2,
            max_health: crate::combat::constants::DEFAULT_MAX_HEALTH,

            break_retry_limit: 3,
            dampener: DampenerConfig::default(),

            flee: FleeRule::default(),
            rescue: SideActionRule::default(),
            shift: SideActionRule::default(),
        }
    }
}

impl CombatConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML, filling gaps with defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CombatConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn round_timeout(&self) -> Duration {
        Duration::from_millis(self.round_timeout_ms)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_health <= 0 {
            return Err(CombatError::Config(format!(
                "max_health ({}) must be positive",
                self.max_health
            )));
        }

        if self.heal_decrement < 0 || self.bleed_divisor < 0 || self.bleed_floor < 0 {
            return Err(CombatError::Config(
                "wound decay settings must not be negative".into(),
            ));
        }

        let d = &self.dampener;
        if d.severe_threshold >= d.moderate_threshold {
            return Err(CombatError::Config(format!(
                "dampener severe_threshold ({}) should be < moderate_threshold ({})",
                d.severe_threshold, d.moderate_threshold
            )));
        }
        if !(0.0..=1.0).contains(&d.moderate_factor) || !(0.0..=1.0).contains(&d.severe_factor) {
            return Err(CombatError::Config(
                "dampener factors must lie in [0, 1]".into(),
            ));
        }

        if self.break_retry_limit == 0 {
            return Err(CombatError::Config(
                "break_retry_limit must allow at least one roll".into(),
            ));
        }

        for (name, threshold, cost) in [
            ("flee", self.flee.threshold, self.flee.cost),
            ("rescue", self.rescue.threshold, self.rescue.cost),
            ("shift", self.shift.threshold, self.shift.cost),
        ] {
            if threshold < 0 || cost < 0 {
                return Err(CombatError::Config(format!(
                    "{} threshold and cost must not be negative",
                    name
                )));
            }
        }

        Ok(())
    }
}

// === GLOBAL CONFIG ACCESS ===

use std::sync::OnceLock;

static CONFIG: OnceLock<CombatConfig> = OnceLock::new();

/// Get the global combat config (initializes with defaults if not set)
pub fn config() -> &'static CombatConfig {
    CONFIG.get_or_init(CombatConfig::default)
}

/// Set the global combat config (can only be called once)
///
/// Returns Err if config was already set.
pub fn set_config(config: CombatConfig) -> std::result::Result<(), CombatConfig> {
    CONFIG.set(config)
}
