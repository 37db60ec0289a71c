//! Replay recording and playback for debugging and bug reports.
//!
//! Records the player commands applied to a stage. Playing the log back
//! against the stage definition reproduces every rotation and every run, with
//! hash verification at each checkpoint: the layout hash after rotations and
//! resets, and the report hash after runs.

use crate::direction::GridPosition;
use crate::engine::SimulationEngine;
use crate::error::SimulationError;
use crate::report::SimulationReport;
use crate::serialize::{DeserializeError, SerializeError};
use crate::sim::{SimConfig, StateHash};
use crate::stage::{Stage, StageDefinition, StageError};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ReplayCommand
// ---------------------------------------------------------------------------

/// A player command that can be recorded and replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplayCommand {
    Rotate { position: GridPosition },
    Reset,
    Run,
}

// ---------------------------------------------------------------------------
// ReplayMismatch
// ---------------------------------------------------------------------------

/// Details about where replay verification failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayMismatch {
    pub command_index: usize,
    pub expected_hash: u64,
    pub actual_hash: u64,
}

// ---------------------------------------------------------------------------
// ReplayLog
// ---------------------------------------------------------------------------

/// A recorded sequence of commands against one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayLog {
    /// Engine settings the runs were made with.
    pub config: SimConfig,
    pub commands: Vec<ReplayCommand>,
    /// Hash checkpoints: (command_index, hash).
    pub hash_checkpoints: Vec<(usize, u64)>,
}

impl ReplayLog {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            commands: Vec::new(),
            hash_checkpoints: Vec::new(),
        }
    }

    pub fn record(&mut self, cmd: ReplayCommand) {
        self.commands.push(cmd);
    }

    /// Record a command with a hash checkpoint.
    pub fn record_with_hash(&mut self, cmd: ReplayCommand, hash: u64) {
        let index = self.commands.len();
        self.commands.push(cmd);
        self.hash_checkpoints.push((index, hash));
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        bitcode::serialize(self).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializeError> {
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ReplayResult
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ReplayResult {
    pub commands_executed: usize,
    /// Whether all hash checkpoints matched.
    pub is_verified: bool,
    pub first_mismatch: Option<ReplayMismatch>,
    /// The stage after the last command.
    pub stage: Stage,
}

// ---------------------------------------------------------------------------
// Replay execution
// ---------------------------------------------------------------------------

/// Checkpoint hash of a run outcome. Configuration errors hash their message
/// so a replay that stops failing is still caught.
pub fn outcome_hash(outcome: &Result<SimulationReport, SimulationError>) -> u64 {
    match outcome {
        Ok(report) => report.report_hash(),
        Err(err) => {
            let mut hasher = StateHash::new();
            hasher.write_u8(0xFF);
            hasher.write(err.to_string().as_bytes());
            hasher.finish()
        }
    }
}

/// Apply one command to `stage` and return the hash it checkpoints.
pub fn apply_command(stage: &mut Stage, engine: &SimulationEngine, cmd: &ReplayCommand) -> u64 {
    match cmd {
        ReplayCommand::Rotate { position } => {
            stage.rotate(*position);
            stage.layout_hash()
        }
        ReplayCommand::Reset => {
            stage.reset();
            stage.layout_hash()
        }
        ReplayCommand::Run => outcome_hash(&engine.run(stage)),
    }
}

/// Rebuild the stage from `definition`, replay `log` and verify its
/// checkpoints.
pub fn replay_and_verify(
    definition: &StageDefinition,
    log: &ReplayLog,
) -> Result<ReplayResult, StageError> {
    let mut stage = Stage::new(definition.clone())?;
    let engine = SimulationEngine::new(log.config.clone());

    let mut first_mismatch: Option<ReplayMismatch> = None;
    let mut checkpoint_idx = 0;

    for (i, cmd) in log.commands.iter().enumerate() {
        let actual_hash = apply_command(&mut stage, &engine, cmd);

        while checkpoint_idx < log.hash_checkpoints.len()
            && log.hash_checkpoints[checkpoint_idx].0 == i
        {
            let (_, expected_hash) = log.hash_checkpoints[checkpoint_idx];
            if actual_hash != expected_hash && first_mismatch.is_none() {
                first_mismatch = Some(ReplayMismatch {
                    command_index: i,
                    expected_hash,
                    actual_hash,
                });
            }
            checkpoint_idx += 1;
        }
    }

    Ok(ReplayResult {
        commands_executed: log.commands.len(),
        is_verified: first_mismatch.is_none(),
        first_mismatch,
        stage,
    })
}
