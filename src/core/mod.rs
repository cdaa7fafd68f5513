pub mod config;
pub mod error;
pub mod types;

pub use config::{config, CombatConfig};
pub use error::{CombatError, Result};
pub use types::{CombatantId, EncounterId, Pronouns, Round};
