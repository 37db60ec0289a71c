//! Report comparison, determinism checking and stage linting.
//!
//! [`diff_reports`] locates the first step where two logs diverge;
//! [`validate_determinism`] runs a stage twice and requires byte-identical
//! encodings. [`lint_definition`] flags pipes whose arithmetic would abort a
//! run before any player ever presses play.

use crate::direction::GridPosition;
use crate::engine::SimulationEngine;
use crate::error::SimulationError;
use crate::report::SimulationReport;
use crate::serialize::SerializeError;
use crate::stage::{Stage, StageDefinition};
use crate::tile::Operator;

// ---------------------------------------------------------------------------
// Report diff
// ---------------------------------------------------------------------------

/// Differences between two simulation reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDiff {
    pub is_identical: bool,
    pub status_matches: bool,
    pub failure_matches: bool,
    pub reached_matches: bool,
    /// Index of the first log step whose snapshots differ, or the length of
    /// the shorter log if one is a prefix of the other.
    pub first_divergent_step: Option<usize>,
}

pub fn diff_reports(a: &SimulationReport, b: &SimulationReport) -> ReportDiff {
    let status_matches = a.status == b.status;
    let failure_matches = a.failure == b.failure;
    let reached_matches = a.reached == b.reached;

    let first_divergent_step = a
        .log
        .iter()
        .zip(b.log.iter())
        .position(|(x, y)| x != y)
        .or_else(|| (a.log.len() != b.log.len()).then(|| a.log.len().min(b.log.len())));

    ReportDiff {
        is_identical: status_matches
            && failure_matches
            && reached_matches
            && first_divergent_step.is_none()
            && a.steps == b.steps,
        status_matches,
        failure_matches,
        reached_matches,
        first_divergent_step,
    }
}

// ---------------------------------------------------------------------------
// Determinism validation
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

#[derive(Debug)]
pub struct DeterminismResult {
    pub is_deterministic: bool,
    /// Report hashes of the two runs.
    pub hashes: (u64, u64),
    pub diff: ReportDiff,
}

/// Run `stage` twice and check both runs encode to the same bytes.
pub fn validate_determinism(
    engine: &SimulationEngine,
    stage: &Stage,
) -> Result<DeterminismResult, ValidationError> {
    let first = engine.run(stage)?;
    let second = engine.run(stage)?;

    let encodings_match = first.encode()? == second.encode()?;
    let diff = diff_reports(&first, &second);

    Ok(DeterminismResult {
        is_deterministic: encodings_match && diff.is_identical,
        hashes: (first.report_hash(), second.report_hash()),
        diff,
    })
}

// ---------------------------------------------------------------------------
// Stage lint
// ---------------------------------------------------------------------------

/// A pipe whose operator is undefined for every value it could receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArithmeticHazard {
    pub position: GridPosition,
    pub operator: Operator,
    pub operand: i64,
}

/// Pipes that divide or take a remainder by zero, or raise to a negative
/// power. Any signal reaching one of these aborts the run.
pub fn lint_definition(definition: &StageDefinition) -> Vec<ArithmeticHazard> {
    definition
        .tiles
        .iter()
        .filter(|t| match t.operator {
            Operator::Div | Operator::Mod => t.operand == 0,
            Operator::Pow => t.operand < 0,
            _ => false,
        })
        .map(|t| ArithmeticHazard {
            position: t.position,
            operator: t.operator,
            operand: t.operand,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn identical_runs_have_no_diff() {
        let stage = line_stage(&[(Operator::Add, 4), (Operator::Mod, 3)], 5, 0);
        let engine = SimulationEngine::default();
        let a = engine.run(&stage).unwrap();
        let b = engine.run(&stage).unwrap();
        let diff = diff_reports(&a, &b);
        assert!(diff.is_identical);
        assert_eq!(diff.first_divergent_step, None);
    }

    #[test]
    fn diff_finds_first_divergent_step() {
        let engine = SimulationEngine::default();
        let a = engine
            .run(&line_stage(&[(Operator::Add, 1), (Operator::Add, 1)], 0, 2))
            .unwrap();
        let b = engine
            .run(&line_stage(&[(Operator::Add, 1), (Operator::Add, 2)], 0, 2))
            .unwrap();
        let diff = diff_reports(&a, &b);
        assert!(!diff.is_identical);
        assert!(!diff.status_matches);
        assert_eq!(diff.first_divergent_step, Some(1));
    }

    #[test]
    fn diff_detects_truncated_log() {
        let engine = SimulationEngine::default();
        let full = engine.run(&line_stage(&[(Operator::None, 0); 3], 1, 1)).unwrap();
        let mut short = full.clone();
        short.log = crate::report::SimulationLog::new();
        for step in full.log.iter().take(2) {
            short.log.push(step.clone());
        }
        assert_eq!(diff_reports(&full, &short).first_divergent_step, Some(2));
    }

    #[test]
    fn engine_is_deterministic() {
        let stage = branching_stage();
        let result = validate_determinism(&SimulationEngine::default(), &stage).unwrap();
        assert!(result.is_deterministic);
        assert_eq!(result.hashes.0, result.hashes.1);
    }

    #[test]
    fn configuration_error_surfaces() {
        let stage = line_stage(&[(Operator::Div, 0)], 1, 1);
        assert!(matches!(
            validate_determinism(&SimulationEngine::default(), &stage),
            Err(ValidationError::Simulation(_))
        ));
    }

    #[test]
    fn lint_flags_undefined_arithmetic() {
        let stage = line_stage(
            &[
                (Operator::Div, 0),
                (Operator::Mod, 3),
                (Operator::Pow, -1),
                (Operator::Mod, 0),
                (Operator::Sub, 0),
            ],
            1,
            1,
        );
        let hazards = lint_definition(stage.definition());
        let positions: Vec<i32> = hazards.iter().map(|h| h.position.x).collect();
        assert_eq!(positions, vec![0, 2, 3]);
        assert_eq!(hazards[1].operator, Operator::Pow);
    }
}
