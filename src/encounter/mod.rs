//! Encounters: round bookkeeping, the turn state machine, the registry of
//! live fights and the async driver

pub mod driver;
pub mod handler;
pub mod ledger;
pub mod registry;

pub use driver::{spawn_encounter, EncounterHandle};
pub use handler::{Departure, Encounter, EncounterPhase, RoundSummary};
pub use ledger::RoundLedger;
pub use registry::EncounterRegistry;
