//! Numflow Core -- the simulation engine for number-pipe puzzles.
//!
//! A stage is a rectangular grid of rotatable pipe tiles. Input ports emit
//! integer values that travel through connected pipes, are transformed by
//! each pipe's arithmetic operator and must arrive at every output port with
//! its target value.
//!
//! # Step Pipeline
//!
//! Each call to [`engine::SimulationEngine::run`] seeds one signal per input
//! port and advances all signals in synchronous steps:
//!
//! 1. **Collision** -- at most one signal may occupy a cell.
//! 2. **Resolve** -- deliver to an output port, or apply the pipe's operator.
//! 3. **Loop check** -- a signal may not revisit a (cell, entry edge) state.
//! 4. **Route** -- clone the signal into every exit of its pipe.
//! 5. **Log** -- append the step's snapshots to the report.
//!
//! The run ends when no signals remain, a failure is detected or the step
//! ceiling is reached. The result is a [`report::SimulationReport`] holding
//! the verdict and a step-by-step log suitable for animated playback.
//!
//! # Key Types
//!
//! - [`stage::Stage`] -- Grid plus ports, built from a [`stage::StageDefinition`].
//! - [`tile::Tile`] -- Shape, rotation and operator of one cell.
//! - [`engine::SimulationEngine`] -- Stateless runner, bounded by [`sim::SimConfig`].
//! - [`report::Failure`] -- Player-facing failure taxonomy.
//! - [`error::SimulationError`] -- Malformed-stage errors that abort a run.
//! - [`replay`] -- Command recording with hash-checkpointed playback.
//! - [`serialize`] -- Versioned binary report snapshots via bitcode.

pub mod direction;
pub mod engine;
pub mod error;
pub mod grid;
pub mod replay;
pub mod report;
pub mod serialize;
pub mod signal;
pub mod sim;
pub mod stage;
pub mod tile;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
