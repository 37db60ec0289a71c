//! One stage being played.
//!
//! A [`Session`] owns the player's working copy of a stage and gates commands
//! on its state:
//!
//! ```text
//!  Idle --run--> Simulating --playback ends--> Success | Failure
//!   ^                                               |
//!   +------------------ retry / reset --------------+
//! ```
//!
//! The engine computes the whole report up front; `Simulating` only steps
//! through its log so a front end can animate it frame by frame.

use std::fmt;

use numflow_core::direction::GridPosition;
use numflow_core::engine::SimulationEngine;
use numflow_core::replay::{
    ReplayCommand, ReplayLog, ReplayResult, apply_command, outcome_hash, replay_and_verify,
};
use numflow_core::report::{SimulationReport, StepLog};
use numflow_core::sim::SimConfig;
use numflow_core::stage::{Stage, StageDefinition, StageError};
use tracing::{debug, info};

use crate::error::SessionError;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Accepting rotations.
    Idle,
    /// Playing back a computed report.
    Simulating,
    Success,
    Failure,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Simulating => "simulating",
            SessionState::Success => "showing success",
            SessionState::Failure => "showing failure",
        };
        f.write_str(name)
    }
}

fn verdict(report: &SimulationReport) -> SessionState {
    if report.is_clear() {
        SessionState::Success
    } else {
        SessionState::Failure
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Session {
    stage: Stage,
    engine: SimulationEngine,
    state: SessionState,
    report: Option<SimulationReport>,
    /// Index of the next frame to play.
    cursor: usize,
    replay: ReplayLog,
}

impl Session {
    pub fn new(stage: Stage, config: SimConfig) -> Self {
        info!(stage = %stage.name(), "session started");
        Self {
            replay: ReplayLog::new(config.clone()),
            engine: SimulationEngine::new(config),
            stage,
            state: SessionState::Idle,
            report: None,
            cursor: 0,
        }
    }

    pub fn from_definition(
        definition: StageDefinition,
        config: SimConfig,
    ) -> Result<Self, SessionError> {
        Ok(Self::new(Stage::new(definition)?, config))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// The report of the last run, kept until the next retry or reset.
    pub fn report(&self) -> Option<&SimulationReport> {
        self.report.as_ref()
    }

    /// Frames played so far in the current playback.
    pub fn frames_played(&self) -> usize {
        self.cursor
    }

    pub fn replay_log(&self) -> &ReplayLog {
        &self.replay
    }

    fn require_idle(&self, action: &'static str) -> Result<(), SessionError> {
        if self.state == SessionState::Idle {
            Ok(())
        } else {
            Err(SessionError::Busy {
                action,
                state: self.state,
            })
        }
    }

    /// Rotate the pipe at `position` a quarter turn clockwise.
    ///
    /// Returns `Ok(false)` for empty, fixed or out-of-bounds cells.
    pub fn rotate(&mut self, position: GridPosition) -> Result<bool, SessionError> {
        self.require_idle("rotate")?;
        let rotated = self.stage.rotate(position);
        if rotated {
            self.replay.record_with_hash(
                ReplayCommand::Rotate { position },
                self.stage.layout_hash(),
            );
            debug!(stage = %self.stage.name(), %position, "tile rotated");
        }
        Ok(rotated)
    }

    /// Simulate the current layout and start playback.
    ///
    /// A configuration error leaves the session idle.
    pub fn run(&mut self) -> Result<&SimulationReport, SessionError> {
        self.require_idle("run")?;
        let outcome = self.engine.run(&self.stage);
        self.replay
            .record_with_hash(ReplayCommand::Run, outcome_hash(&outcome));
        let report = outcome?;

        info!(
            stage = %self.stage.name(),
            steps = report.steps,
            verdict = %report.reason(),
            "run finished"
        );
        self.state = SessionState::Simulating;
        self.cursor = 0;
        Ok(self.report.insert(report))
    }

    /// The next logged step, or `None` once playback is over. Moving past
    /// the last frame enters the verdict state.
    pub fn next_frame(&mut self) -> Option<&StepLog> {
        if self.state != SessionState::Simulating {
            return None;
        }
        let report = self.report.as_ref()?;
        if self.cursor >= report.log.len() {
            self.state = verdict(report);
            return None;
        }
        let index = self.cursor;
        self.cursor += 1;
        report.log.step(index)
    }

    /// Skip the remaining frames and show the verdict.
    pub fn finish_playback(&mut self) -> SessionState {
        if self.state == SessionState::Simulating {
            if let Some(report) = &self.report {
                self.cursor = report.log.len();
                self.state = verdict(report);
            }
        }
        self.state
    }

    /// Leave the verdict and go back to editing, keeping the rotations.
    pub fn retry(&mut self) -> Result<(), SessionError> {
        if self.state == SessionState::Simulating {
            return Err(SessionError::Busy {
                action: "retry",
                state: self.state,
            });
        }
        self.state = SessionState::Idle;
        self.report = None;
        self.cursor = 0;
        Ok(())
    }

    /// Restore the authored rotations and go back to editing. Aborts any
    /// playback in progress.
    pub fn reset(&mut self) {
        let hash = apply_command(&mut self.stage, &self.engine, &ReplayCommand::Reset);
        self.replay.record_with_hash(ReplayCommand::Reset, hash);
        self.state = SessionState::Idle;
        self.report = None;
        self.cursor = 0;
        debug!(stage = %self.stage.name(), "stage reset");
    }

    /// Replay this session's commands against a fresh copy of the stage.
    pub fn verify_replay(&self) -> Result<ReplayResult, StageError> {
        replay_and_verify(self.stage.definition(), &self.replay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use numflow_core::test_utils::*;
    use numflow_core::tile::Operator;

    fn session() -> Session {
        Session::new(arithmetic_chain_stage(), SimConfig::default())
    }

    #[test]
    fn starts_idle() {
        let s = session();
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.report().is_none());
        assert_eq!(s.replay_log().command_count(), 0);
    }

    #[test]
    fn playback_walks_every_frame_then_shows_verdict() {
        let mut s = session();
        let steps = s.run().unwrap().log.len();
        assert_eq!(s.state(), SessionState::Simulating);

        let mut frames = 0;
        while s.next_frame().is_some() {
            frames += 1;
        }
        assert_eq!(frames, steps);
        assert_eq!(s.state(), SessionState::Success);
        assert!(s.next_frame().is_none());
    }

    #[test]
    fn commands_are_gated_while_simulating() {
        let mut s = session();
        s.run().unwrap();
        assert!(matches!(
            s.rotate(pos(1, 2)),
            Err(SessionError::Busy {
                state: SessionState::Simulating,
                ..
            })
        ));
        assert!(matches!(s.run(), Err(SessionError::Busy { .. })));
        assert!(matches!(s.retry(), Err(SessionError::Busy { .. })));
    }

    #[test]
    fn rotation_is_refused_on_the_verdict_screen() {
        let mut s = session();
        s.run().unwrap();
        s.finish_playback();
        assert!(matches!(s.rotate(pos(1, 2)), Err(SessionError::Busy { .. })));
    }

    #[test]
    fn finish_playback_skips_to_failure() {
        let mut s = session();
        assert!(s.rotate(pos(2, 2)).unwrap());
        s.run().unwrap();
        assert!(s.next_frame().is_some());
        assert_eq!(s.finish_playback(), SessionState::Failure);
        assert_eq!(s.frames_played(), s.report().unwrap().log.len());
    }

    #[test]
    fn retry_keeps_rotations() {
        let mut s = session();
        s.rotate(pos(2, 2)).unwrap();
        let layout = s.stage().layout_hash();
        s.run().unwrap();
        s.finish_playback();
        s.retry().unwrap();
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.report().is_none());
        assert_eq!(s.stage().layout_hash(), layout);
    }

    #[test]
    fn reset_restores_authored_layout_mid_playback() {
        let mut s = session();
        let authored = s.stage().layout_hash();
        s.rotate(pos(1, 2)).unwrap();
        s.run().unwrap();
        s.reset();
        assert_eq!(s.state(), SessionState::Idle);
        assert_eq!(s.stage().layout_hash(), authored);
    }

    #[test]
    fn empty_cells_do_not_record_commands() {
        let mut s = session();
        assert!(!s.rotate(pos(0, 0)).unwrap());
        assert_eq!(s.replay_log().command_count(), 0);
    }

    #[test]
    fn configuration_error_stays_idle() {
        let stage = line_stage(&[(Operator::Div, 0)], 1, 1);
        let mut s = Session::new(stage, SimConfig::default());
        assert!(matches!(s.run(), Err(SessionError::Simulation(_))));
        assert_eq!(s.state(), SessionState::Idle);
        assert_eq!(s.replay_log().command_count(), 1);
    }

    #[test]
    fn recorded_commands_replay_cleanly() {
        let mut s = session();
        s.rotate(pos(2, 2)).unwrap();
        s.run().unwrap();
        s.finish_playback();
        s.retry().unwrap();
        for _ in 0..3 {
            s.rotate(pos(2, 2)).unwrap();
        }
        s.run().unwrap();
        s.reset();

        let result = s.verify_replay().unwrap();
        assert!(result.is_verified, "{:?}", result.first_mismatch);
        assert_eq!(result.commands_executed, 7);
    }

    #[test]
    fn state_names() {
        assert_eq!(SessionState::Simulating.to_string(), "simulating");
        let err = SessionError::Busy {
            action: "rotate",
            state: SessionState::Success,
        };
        assert_eq!(err.to_string(), "cannot rotate while showing success");
    }
}
