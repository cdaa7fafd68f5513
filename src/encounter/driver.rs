//! Async driver: one task owns one encounter
//!
//! Commands arrive over an mpsc channel and are answered through oneshot
//! replies. The task closes a round as soon as everyone has submitted or the
//! round timer runs out, and publishes each [`RoundSummary`]. Combatants who
//! leave stay on the encounter the task yields back.

use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::combat::combatant::Combatant;
use crate::combat::combo::ComboId;
use crate::combat::moves::Move;
use crate::core::{CombatError, CombatantId, EncounterId, Result};
use crate::encounter::handler::{Encounter, JoinRejected, RoundSummary};

const COMMAND_BUFFER: usize = 64;
const SUMMARY_BUFFER: usize = 16;

type Reply<T> = oneshot::Sender<Result<T>>;

#[derive(Debug)]
pub enum Command {
    Join {
        combatant: Box<Combatant>,
        opponent: CombatantId,
        reply: oneshot::Sender<std::result::Result<(), JoinRejected>>,
    },
    Leave {
        id: CombatantId,
        reply: Reply<Combatant>,
    },
    SubmitMove {
        id: CombatantId,
        mv: Move,
        reply: Reply<()>,
    },
    SubmitCombo {
        id: CombatantId,
        combo: ComboId,
        reply: Reply<Move>,
    },
    /// `cancel` withdraws an earlier declaration
    Flee {
        id: CombatantId,
        cancel: bool,
        reply: Reply<()>,
    },
    /// `None` cancels
    Rescue {
        rescuer: CombatantId,
        rescuee: Option<CombatantId>,
        reply: Reply<()>,
    },
    Shift {
        id: CombatantId,
        target: Option<CombatantId>,
        reply: Reply<()>,
    },
    Stop {
        id: CombatantId,
        opponent: Option<CombatantId>,
        reply: Reply<()>,
    },
    Status {
        reply: oneshot::Sender<Vec<String>>,
    },
    Shutdown,
}

fn apply(encounter: &mut Encounter, command: Command) {
    // a dropped reply receiver only means the caller stopped waiting
    match command {
        Command::Join {
            combatant,
            opponent,
            reply,
        } => {
            let _ = reply.send(encounter.join(*combatant, opponent));
        }
        Command::Leave { id, reply } => {
            let _ = reply.send(encounter.leave(id));
        }
        Command::SubmitMove { id, mv, reply } => {
            let _ = reply.send(encounter.submit_move(id, mv));
        }
        Command::SubmitCombo { id, combo, reply } => {
            let _ = reply.send(encounter.submit_combo(id, combo));
        }
        Command::Flee { id, cancel, reply } => {
            let result = if cancel {
                encounter.cancel_flee(id)
            } else {
                encounter.declare_flee(id)
            };
            let _ = reply.send(result);
        }
        Command::Rescue {
            rescuer,
            rescuee,
            reply,
        } => {
            let result = match rescuee {
                Some(rescuee) => encounter.declare_rescue(rescuer, rescuee),
                None => encounter.cancel_rescue(rescuer),
            };
            let _ = reply.send(result);
        }
        Command::Shift { id, target, reply } => {
            let result = match target {
                Some(target) => encounter.declare_shift(id, target),
                None => encounter.cancel_shift(id),
            };
            let _ = reply.send(result);
        }
        Command::Stop {
            id,
            opponent,
            reply,
        } => {
            let result = match opponent {
                Some(opponent) => encounter.declare_stop(id, opponent),
                None => encounter.cancel_stop(id),
            };
            let _ = reply.send(result);
        }
        Command::Status { reply } => {
            let _ = reply.send(encounter.combatants().map(Combatant::status_line).collect());
        }
        Command::Shutdown => {}
    }
}

/// Turn away whatever is still queued once the encounter stops
fn drain(encounter: &Encounter, commands: &mut mpsc::Receiver<Command>) {
    commands.close();
    while let Ok(command) = commands.try_recv() {
        if let Command::Join {
            combatant, reply, ..
        } = command
        {
            let rejected = JoinRejected {
                error: CombatError::RoundClosed,
                combatant,
            };
            if let Err(Err(rejected)) = reply.send(Err(rejected)) {
                tracing::warn!(encounter = %encounter.id, name = %rejected.combatant.name, "queued joiner dropped");
            }
        }
    }
}

async fn run(
    mut encounter: Encounter,
    mut commands: mpsc::Receiver<Command>,
    summaries: mpsc::Sender<RoundSummary>,
) -> Encounter {
    while !encounter.is_finished() {
        let deadline = tokio::time::Instant::from_std(encounter.deadline());
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Shutdown) | None => {
                    tracing::info!(encounter = %encounter.id, "encounter driver shutting down");
                    break;
                }
                Some(command) => apply(&mut encounter, command),
            },
            _ = tokio::time::sleep_until(deadline) => {}
        }

        if encounter.is_due(Instant::now()) {
            match encounter.resolve_round() {
                Ok(summary) => {
                    if summaries.send(summary).await.is_err() {
                        tracing::debug!(encounter = %encounter.id, "nobody is listening for round summaries");
                    }
                }
                Err(err) => tracing::warn!(encounter = %encounter.id, error = %err, "round not resolved"),
            }
        }
    }
    drain(&encounter, &mut commands);
    encounter
}

/// Cloneable front end to a running encounter task
#[derive(Debug, Clone)]
pub struct EncounterHandle {
    pub id: EncounterId,
    commands: mpsc::Sender<Command>,
}

/// Spawn a task driving `encounter`
///
/// Returns the handle, the stream of round summaries, and the task itself,
/// which yields the encounter back once it finishes or is shut down.
pub fn spawn_encounter(
    encounter: Encounter,
) -> (EncounterHandle, mpsc::Receiver<RoundSummary>, JoinHandle<Encounter>) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (summary_tx, summary_rx) = mpsc::channel(SUMMARY_BUFFER);
    let handle = EncounterHandle {
        id: encounter.id,
        commands: command_tx,
    };
    let task = tokio::spawn(run(encounter, command_rx, summary_tx));
    (handle, summary_rx, task)
}

impl EncounterHandle {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| CombatError::EncounterGone)?;
        response.await.map_err(|_| CombatError::EncounterGone)?
    }

    /// Join the fight; a rejected combatant comes back in the inner error
    pub async fn join(
        &self,
        combatant: Combatant,
        opponent: CombatantId,
    ) -> Result<std::result::Result<(), JoinRejected>> {
        let Ok(permit) = self.commands.reserve().await else {
            return Ok(Err(JoinRejected::new(CombatError::EncounterGone, combatant)));
        };
        let (reply, response) = oneshot::channel();
        permit.send(Command::Join {
            combatant: Box::new(combatant),
            opponent,
            reply,
        });
        response.await.map_err(|_| CombatError::EncounterGone)
    }

    pub async fn leave(&self, id: CombatantId) -> Result<Combatant> {
        self.request(|reply| Command::Leave { id, reply }).await
    }

    pub async fn submit_move(&self, id: CombatantId, mv: Move) -> Result<()> {
        self.request(|reply| Command::SubmitMove { id, mv, reply }).await
    }

    pub async fn submit_combo(&self, id: CombatantId, combo: ComboId) -> Result<Move> {
        self.request(|reply| Command::SubmitCombo { id, combo, reply }).await
    }

    pub async fn declare_flee(&self, id: CombatantId) -> Result<()> {
        self.request(|reply| Command::Flee { id, cancel: false, reply }).await
    }

    pub async fn cancel_flee(&self, id: CombatantId) -> Result<()> {
        self.request(|reply| Command::Flee { id, cancel: true, reply }).await
    }

    pub async fn declare_rescue(&self, rescuer: CombatantId, rescuee: CombatantId) -> Result<()> {
        self.request(|reply| Command::Rescue {
            rescuer,
            rescuee: Some(rescuee),
            reply,
        })
        .await
    }

    pub async fn cancel_rescue(&self, rescuer: CombatantId) -> Result<()> {
        self.request(|reply| Command::Rescue {
            rescuer,
            rescuee: None,
            reply,
        })
        .await
    }

    pub async fn declare_shift(&self, id: CombatantId, target: CombatantId) -> Result<()> {
        self.request(|reply| Command::Shift {
            id,
            target: Some(target),
            reply,
        })
        .await
    }

    pub async fn cancel_shift(&self, id: CombatantId) -> Result<()> {
        self.request(|reply| Command::Shift { id, target: None, reply }).await
    }

    pub async fn declare_stop(&self, id: CombatantId, opponent: CombatantId) -> Result<()> {
        self.request(|reply| Command::Stop {
            id,
            opponent: Some(opponent),
            reply,
        })
        .await
    }

    pub async fn cancel_stop(&self, id: CombatantId) -> Result<()> {
        self.request(|reply| Command::Stop {
            id,
            opponent: None,
            reply,
        })
        .await
    }

    pub async fn status(&self) -> Result<Vec<String>> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Status { reply })
            .await
            .map_err(|_| CombatError::EncounterGone)?;
        response.await.map_err(|_| CombatError::EncounterGone)
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.commands
            .send(Command::Shutdown)
            .await
            .map_err(|_| CombatError::EncounterGone)
    }
}
