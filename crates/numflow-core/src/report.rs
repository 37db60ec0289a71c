//! What a simulation run produces: a verdict and a replayable step log.

use crate::direction::GridPosition;
use crate::sim::StateHash;
use crate::tile::Operator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Log
// ---------------------------------------------------------------------------

/// What happened to one signal during one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapshotEvent {
    /// A pipe applied its operator. Recorded for every pipe, `None` included.
    Transformed {
        operator: Operator,
        operand: i64,
        previous: i64,
    },
    /// An input marker cell emitted the value unchanged.
    Emitted,
    /// The signal was consumed by an output port.
    Delivered,
}

/// One signal's state within a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub position: GridPosition,
    /// Value after this step's transformation.
    pub value: i64,
    pub event: SnapshotEvent,
}

impl SignalSnapshot {
    /// Display label of the operator applied, if any (`+3`, `÷2`, ...).
    pub fn operator_label(&self) -> Option<String> {
        match self.event {
            SnapshotEvent::Transformed {
                operator, operand, ..
            } => Some(operator.label(operand)),
            _ => None,
        }
    }

    /// The value before this step, for transformations.
    pub fn previous_value(&self) -> Option<i64> {
        match self.event {
            SnapshotEvent::Transformed { previous, .. } => Some(previous),
            _ => None,
        }
    }
}

/// All snapshots from one step, in signal creation order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StepLog {
    pub step: u32,
    pub signals: Vec<SignalSnapshot>,
}

/// Ordered per-step snapshots of a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SimulationLog {
    steps: Vec<StepLog>,
}

impl SimulationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: StepLog) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[StepLog] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&StepLog> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepLog> {
        self.steps.iter()
    }

    /// Every snapshot at `pos`, across all steps.
    pub fn visits(&self, pos: GridPosition) -> impl Iterator<Item = (u32, &SignalSnapshot)> {
        self.steps.iter().flat_map(move |step| {
            step.signals
                .iter()
                .filter(move |s| s.position == pos)
                .map(move |s| (step.step, s))
        })
    }
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

/// Why a signal could not continue into a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisconnectCause {
    /// The signal stands on a cell outside the grid.
    OffGrid,
    /// The signal stands on a cell with no tile.
    NoTile,
    /// An exit leads off the grid where no output port waits.
    Boundary,
    /// An exit leads into an empty cell.
    MissingTile,
    /// An exit leads into a pipe with no connector on the shared edge.
    MismatchedConnector,
}

impl DisconnectCause {
    fn describe(self) -> &'static str {
        match self {
            DisconnectCause::OffGrid => "signal left the grid",
            DisconnectCause::NoTile => "no tile under the signal",
            DisconnectCause::Boundary => "pipe leads off the grid",
            DisconnectCause::MissingTile => "pipe leads into an empty cell",
            DisconnectCause::MismatchedConnector => "neighbouring pipe is not connected",
        }
    }
}

/// Error taxonomy for player-facing failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    Collision,
    Disconnected,
    DeadEnd,
    Loop,
    Unreached,
    ValueMismatch,
}

/// A player-facing run failure. The stage is untouched; the player may rotate
/// tiles and run again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error, Serialize, Deserialize)]
pub enum Failure {
    #[error("collision: several values met at {position}")]
    Collision { position: GridPosition },

    #[error("disconnected at {position}: {}", .cause.describe())]
    Disconnected {
        /// The cell the signal stood on, or the neighbour it could not enter.
        position: GridPosition,
        cause: DisconnectCause,
    },

    #[error("dead end at {position}")]
    DeadEnd { position: GridPosition },

    #[error("loop detected at {position}")]
    Loop { position: GridPosition },

    #[error("loop: still running after {max_steps} steps")]
    StepLimit { max_steps: u32 },

    #[error("output at {position} received no value")]
    Unreached { position: GridPosition },

    #[error("output at {position} expected {expected} but received {actual}")]
    ValueMismatch {
        position: GridPosition,
        expected: i64,
        actual: i64,
    },
}

impl Failure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::Collision { .. } => FailureKind::Collision,
            Failure::Disconnected { .. } => FailureKind::Disconnected,
            Failure::DeadEnd { .. } => FailureKind::DeadEnd,
            Failure::Loop { .. } | Failure::StepLimit { .. } => FailureKind::Loop,
            Failure::Unreached { .. } => FailureKind::Unreached,
            Failure::ValueMismatch { .. } => FailureKind::ValueMismatch,
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimulationStatus {
    Clear,
    Fail,
}

/// The result of one engine run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub status: SimulationStatus,
    /// Set exactly when `status` is `Fail`.
    pub failure: Option<Failure>,
    pub log: SimulationLog,
    /// Last value delivered to each output port.
    pub reached: BTreeMap<GridPosition, i64>,
    /// Steps executed.
    pub steps: u32,
}

impl SimulationReport {
    pub fn clear(log: SimulationLog, reached: BTreeMap<GridPosition, i64>, steps: u32) -> Self {
        Self {
            status: SimulationStatus::Clear,
            failure: None,
            log,
            reached,
            steps,
        }
    }

    pub fn fail(
        failure: Failure,
        log: SimulationLog,
        reached: BTreeMap<GridPosition, i64>,
        steps: u32,
    ) -> Self {
        Self {
            status: SimulationStatus::Fail,
            failure: Some(failure),
            log,
            reached,
            steps,
        }
    }

    pub fn is_clear(&self) -> bool {
        self.status == SimulationStatus::Clear
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure.as_ref().map(Failure::kind)
    }

    /// Human-readable classification of the outcome.
    pub fn reason(&self) -> String {
        match &self.failure {
            Some(failure) => failure.to_string(),
            None => "every output reached its target value".to_string(),
        }
    }

    /// Deterministic hash over verdict, reached values and the full log.
    pub fn report_hash(&self) -> u64 {
        let mut hasher = StateHash::new();
        hasher.write_u8(self.status as u8);
        hasher.write_u32(self.steps);
        for (pos, value) in &self.reached {
            hasher.write_i64(i64::from(pos.x));
            hasher.write_i64(i64::from(pos.y));
            hasher.write_i64(*value);
        }
        for step in self.log.iter() {
            hasher.write_u32(step.step);
            for s in &step.signals {
                hasher.write_i64(i64::from(s.position.x));
                hasher.write_i64(i64::from(s.position.y));
                hasher.write_i64(s.value);
                match s.event {
                    SnapshotEvent::Transformed {
                        operator,
                        operand,
                        previous,
                    } => {
                        hasher.write_u8(0);
                        hasher.write_u8(operator as u8);
                        hasher.write_i64(operand);
                        hasher.write_i64(previous);
                    }
                    SnapshotEvent::Emitted => hasher.write_u8(1),
                    SnapshotEvent::Delivered => hasher.write_u8(2),
                }
            }
        }
        if let Some(failure) = &self.failure {
            hasher.write(failure.to_string().as_bytes());
        }
        hasher.finish()
    }
}
