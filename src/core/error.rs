use thiserror::Error;

use crate::combat::combo::ComboId;
use crate::combat::moves::Move;
use crate::core::types::CombatantId;

#[derive(Error, Debug)]
pub enum CombatError {
    #[error("Combatant not in this encounter: {0}")]
    NotInEncounter(CombatantId),

    #[error("Combatant already engaged: {0}")]
    AlreadyEngaged(CombatantId),

    #[error("You can't target yourself")]
    SelfTarget,

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("You need at least {required} positioning to {action} (you have {available})")]
    InsufficientPositioning {
        action: &'static str,
        required: i32,
        available: i32,
    },

    #[error("You can't use {mv} right now: {reason}")]
    MoveBanned { mv: Move, reason: String },

    #[error("You can't use {0} twice in a row")]
    RepeatedMove(Move),

    #[error("{combo} must be used with {legal}")]
    ComboNotLegal { combo: ComboId, legal: String },

    #[error("{combo} is unavailable: {reason}")]
    ComboUnavailable { combo: ComboId, reason: String },

    #[error("No usable move is left for {0}")]
    NoLegalMoveForCombo(ComboId),

    #[error("You can't {0} while fleeing")]
    Fleeing(&'static str),

    #[error("You have given up your action this round to change targets")]
    Shifting,

    #[error("You are already trying to {0}")]
    AlreadyDeclared(&'static str),

    #[error("You aren't trying to {0}")]
    NothingToCancel(&'static str),

    #[error("The round is no longer accepting actions")]
    RoundClosed,

    #[error("Unknown move: {0}")]
    UnknownMove(String),

    #[error("Unknown combo: {0}")]
    UnknownCombo(String),

    #[error("Exchange could not be resolved: {0}")]
    Exchange(String),

    #[error("Encounter task has stopped")]
    EncounterGone,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl CombatError {
    /// Whether this error is a rejected player action.
    ///
    /// Rejections are reported back to the submitter and leave the encounter
    /// untouched.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            CombatError::Exchange(_)
                | CombatError::EncounterGone
                | CombatError::Config(_)
                | CombatError::IoError(_)
                | CombatError::TomlError(_)
                | CombatError::SerdeError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CombatError>;
