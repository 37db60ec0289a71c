//! The simulation engine: propagates signals across a stage's grid in
//! discrete synchronous steps and judges the result.
//!
//! # Step pipeline
//!
//! Each step runs:
//! 1. **Collision** -- two active signals on one cell (output ports excepted)
//!    fail the run.
//! 2. **Resolve** -- each signal, in creation order, is delivered to an output
//!    port, transformed by the pipe it stands on, or rejected as disconnected.
//! 3. **Loop check** -- a signal that revisits a (cell, entry edge) state fails
//!    the run.
//! 4. **Route** -- the signal is cloned into every exit; each exit must lead to
//!    an output port or a pipe with a matching connector.
//! 5. **Log** -- the step's snapshots are appended to the report log.
//!
//! When no signals remain, every output port is checked against its target.
//!
//! A signal fresh from an input port has no entry edge. Its first hop probes
//! all four sides regardless of the first tile's shape: exits that lead
//! somewhere are taken, the rest are dropped, and the run only fails if none
//! lead anywhere.
//!
//! The engine borrows the stage immutably, so a run can never disturb the
//! player's layout.

use crate::direction::{Direction, GridPosition};
use crate::error::SimulationError;
use crate::report::{
    DisconnectCause, Failure, SignalSnapshot, SimulationLog, SimulationReport, SnapshotEvent,
    StepLog,
};
use crate::signal::Signal;
use crate::sim::SimConfig;
use crate::stage::Stage;
use crate::tile::{Tile, TileKind};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// SimulationEngine
// ---------------------------------------------------------------------------

/// Runs stages to completion. Holds no per-run state, so one engine can be
/// shared across any number of runs.
#[derive(Debug, Clone, Default)]
pub struct SimulationEngine {
    config: SimConfig,
}

impl SimulationEngine {
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Run `stage` until every signal is consumed, a failure is detected or
    /// the step ceiling is hit.
    ///
    /// Player-facing failures come back inside an `Ok` report. `Err` is
    /// reserved for malformed stages whose arithmetic is undefined.
    pub fn run(&self, stage: &Stage) -> Result<SimulationReport, SimulationError> {
        Run::new(stage, self.config.max_steps).execute()
    }

    /// Run several independent stages. Each run owns its signals, so with the
    /// `parallel` feature they fan out across threads.
    pub fn run_batch(&self, stages: &[Stage]) -> Vec<Result<SimulationReport, SimulationError>> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            stages.par_iter().map(|stage| self.run(stage)).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            stages.iter().map(|stage| self.run(stage)).collect()
        }
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Why a step stopped early.
enum Halt {
    Failed(Failure),
    Fatal(SimulationError),
}

impl From<Failure> for Halt {
    fn from(failure: Failure) -> Self {
        Halt::Failed(failure)
    }
}

impl From<SimulationError> for Halt {
    fn from(err: SimulationError) -> Self {
        Halt::Fatal(err)
    }
}

/// State of a single run.
struct Run<'a> {
    stage: &'a Stage,
    max_steps: u32,
    active: Vec<Signal>,
    reached: BTreeMap<GridPosition, i64>,
    log: SimulationLog,
    step: u32,
}

impl<'a> Run<'a> {
    fn new(stage: &'a Stage, max_steps: u32) -> Self {
        let active = stage
            .inputs()
            .iter()
            .map(|input| Signal::emitted(stage.entry_cell(input), input.value))
            .collect();
        Self {
            stage,
            max_steps,
            active,
            reached: BTreeMap::new(),
            log: SimulationLog::new(),
            step: 0,
        }
    }

    fn execute(mut self) -> Result<SimulationReport, SimulationError> {
        debug!(
            stage = %self.stage.name(),
            signals = self.active.len(),
            max_steps = self.max_steps,
            "simulation started"
        );

        while !self.active.is_empty() && self.step < self.max_steps {
            let mut step_log = StepLog {
                step: self.step,
                signals: Vec::new(),
            };
            let outcome = self.advance(&mut step_log);
            trace!(
                step = self.step,
                snapshots = step_log.signals.len(),
                "step complete"
            );
            if !step_log.signals.is_empty() {
                self.log.push(step_log);
            }
            self.step += 1;

            match outcome {
                Ok(next) => self.active = next,
                Err(Halt::Failed(failure)) => return Ok(self.fail(failure)),
                Err(Halt::Fatal(err)) => {
                    warn!(stage = %self.stage.name(), error = %err, "simulation aborted");
                    return Err(err);
                }
            }
        }

        if !self.active.is_empty() {
            let max_steps = self.max_steps;
            return Ok(self.fail(Failure::StepLimit { max_steps }));
        }

        if let Some(failure) = self.verify_outputs() {
            return Ok(self.fail(failure));
        }

        debug!(stage = %self.stage.name(), steps = self.step, "simulation clear");
        Ok(SimulationReport::clear(self.log, self.reached, self.step))
    }

    fn fail(self, failure: Failure) -> SimulationReport {
        debug!(
            stage = %self.stage.name(),
            steps = self.step,
            kind = ?failure.kind(),
            reason = %failure,
            "simulation failed"
        );
        SimulationReport::fail(failure, self.log, self.reached, self.step)
    }

    /// Process every active signal once and return the next generation.
    fn advance(&mut self, step_log: &mut StepLog) -> Result<Vec<Signal>, Halt> {
        let active = std::mem::take(&mut self.active);
        if let Some(position) = self.find_collision(&active) {
            return Err(Failure::Collision { position }.into());
        }

        let mut next = Vec::new();
        for mut signal in active {
            let pos = signal.position;

            if self.stage.is_output(pos) {
                self.reached.insert(pos, signal.value);
                step_log.signals.push(SignalSnapshot {
                    position: pos,
                    value: signal.value,
                    event: SnapshotEvent::Delivered,
                });
                continue;
            }

            let tile = match self.stage.grid().get(pos) {
                Some(tile) => *tile,
                None => {
                    return Err(Failure::Disconnected {
                        position: pos,
                        cause: DisconnectCause::OffGrid,
                    }
                    .into());
                }
            };

            match tile.kind {
                TileKind::Pipe => {
                    let previous = signal.value;
                    signal.value = tile.apply(previous).map_err(|fault| {
                        SimulationError::Configuration {
                            position: pos,
                            operator: tile.operator,
                            operand: tile.operand,
                            value: previous,
                            fault,
                        }
                    })?;
                    step_log.signals.push(SignalSnapshot {
                        position: pos,
                        value: signal.value,
                        event: SnapshotEvent::Transformed {
                            operator: tile.operator,
                            operand: tile.operand,
                            previous,
                        },
                    });
                    if !signal.record_current_state() {
                        return Err(Failure::Loop { position: pos }.into());
                    }
                }
                TileKind::Input if signal.entered_from.is_none() => {
                    signal.record_current_state();
                    step_log.signals.push(SignalSnapshot {
                        position: pos,
                        value: signal.value,
                        event: SnapshotEvent::Emitted,
                    });
                }
                _ => {
                    return Err(Failure::Disconnected {
                        position: pos,
                        cause: DisconnectCause::NoTile,
                    }
                    .into());
                }
            }

            self.route(&signal, &tile, &mut next)?;
        }
        Ok(next)
    }

    /// First cell (in creation order) holding more than one signal. Signals
    /// already standing on an output port are being consumed and never
    /// collide.
    fn find_collision(&self, signals: &[Signal]) -> Option<GridPosition> {
        let mut occupied = BTreeSet::new();
        signals
            .iter()
            .map(|s| s.position)
            .filter(|&pos| !self.stage.is_output(pos))
            .find(|&pos| !occupied.insert(pos))
    }

    /// Clone `signal` into each of its exits.
    fn route(&self, signal: &Signal, tile: &Tile, next: &mut Vec<Signal>) -> Result<(), Failure> {
        let pos = signal.position;
        match signal.entered_from {
            Some(entry) => {
                let exits = tile.output_directions(entry);
                if exits.is_empty() {
                    return Err(Failure::DeadEnd { position: pos });
                }
                for exit in exits.iter() {
                    self.check_exit(pos, exit)?;
                    next.push(signal.branch(exit));
                }
                Ok(())
            }
            None => {
                // Probe every side. With none open, an in-grid blockage is
                // reported ahead of a grid-edge exit.
                let mut blocked = None;
                let mut boundary = None;
                let mut taken = 0usize;
                for exit in Direction::all() {
                    match self.check_exit(pos, exit) {
                        Ok(()) => {
                            next.push(signal.branch(exit));
                            taken += 1;
                        }
                        Err(
                            failure @ Failure::Disconnected {
                                cause: DisconnectCause::Boundary,
                                ..
                            },
                        ) => {
                            boundary.get_or_insert(failure);
                        }
                        Err(failure) => {
                            blocked.get_or_insert(failure);
                        }
                    }
                }
                if taken > 0 {
                    return Ok(());
                }
                blocked.or(boundary).map_or(Ok(()), Err)
            }
        }
    }

    /// Can a signal leave `from` through `exit`?
    fn check_exit(&self, from: GridPosition, exit: Direction) -> Result<(), Failure> {
        let target = from.step(exit);
        if self.stage.is_output(target) {
            return Ok(());
        }
        let Some(neighbour) = self.stage.grid().get(target) else {
            return Err(Failure::Disconnected {
                position: from,
                cause: DisconnectCause::Boundary,
            });
        };
        if neighbour.is_empty() {
            return Err(Failure::Disconnected {
                position: target,
                cause: DisconnectCause::MissingTile,
            });
        }
        if !neighbour.can_accept_from(exit.opposite()) {
            return Err(Failure::Disconnected {
                position: target,
                cause: DisconnectCause::MismatchedConnector,
            });
        }
        Ok(())
    }

    /// First output port, in declaration order, that missed its target.
    fn verify_outputs(&self) -> Option<Failure> {
        self.stage.outputs().iter().find_map(|output| {
            match self.reached.get(&output.position) {
                None => Some(Failure::Unreached {
                    position: output.position,
                }),
                Some(&actual) if actual != output.target => Some(Failure::ValueMismatch {
                    position: output.position,
                    expected: output.target,
                    actual,
                }),
                Some(_) => None,
            }
        })
    }
}
