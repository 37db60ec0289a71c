//! Property-based tests for the Numflow core engine.
//!
//! Uses proptest to generate random stages and rotation sequences, then
//! verify the engine's structural invariants hold.

use numflow_core::direction::{GridPosition, Rotation};
use numflow_core::engine::SimulationEngine;
use numflow_core::report::SimulationStatus;
use numflow_core::sim::SimConfig;
use numflow_core::stage::{InputPort, OutputPort, Stage, StageDefinition, TilePlacement};
use numflow_core::tile::{Operator, TileShape};
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

const OPERATORS: [Operator; 8] = [
    Operator::Add,
    Operator::Sub,
    Operator::Mul,
    Operator::Div,
    Operator::Mod,
    Operator::Pow,
    Operator::Neg,
    Operator::None,
];

fn arb_cell() -> impl Strategy<Value = Option<(usize, u8, usize, i64, bool)>> {
    proptest::option::weighted(
        0.8,
        (0..4usize, 0..4u8, 0..OPERATORS.len(), -4..5i64, any::<bool>()),
    )
}

/// A position on the ring of cells just outside a `width` x `height` grid.
fn border_position(width: u32, height: u32, index: usize) -> GridPosition {
    let (w, h) = (width as i32, height as i32);
    let perimeter = (2 * w + 2 * h) as usize;
    let i = (index % perimeter) as i32;
    if i < w {
        GridPosition::new(i, -1)
    } else if i < 2 * w {
        GridPosition::new(i - w, h)
    } else if i < 2 * w + h {
        GridPosition::new(-1, i - 2 * w)
    } else {
        GridPosition::new(w, i - 2 * w - h)
    }
}

/// Random small stages. Definitions with clashing ports are discarded.
fn arb_stage() -> impl Strategy<Value = Stage> {
    (1..=4u32, 1..=4u32)
        .prop_flat_map(|(width, height)| {
            let cells = (width * height) as usize;
            (
                Just(width),
                Just(height),
                proptest::collection::vec(arb_cell(), cells),
                proptest::collection::vec((0..64usize, -20..20i64), 0..=2),
                proptest::collection::vec((0..64usize, -20..20i64), 0..=2),
            )
        })
        .prop_filter_map(
            "ports must not share a position",
            |(width, height, cells, inputs, outputs)| {
                let tiles = cells
                    .into_iter()
                    .enumerate()
                    .filter_map(|(i, cell)| {
                        cell.map(|(shape, rot, op, operand, fixed)| TilePlacement {
                            position: GridPosition::new(
                                (i as u32 % width) as i32,
                                (i as u32 / width) as i32,
                            ),
                            shape: TileShape::all()[shape],
                            rotation: Rotation::all()[rot as usize],
                            operator: OPERATORS[op],
                            operand,
                            fixed,
                        })
                    })
                    .collect();
                let def = StageDefinition {
                    name: "arb".to_string(),
                    width,
                    height,
                    inputs: inputs
                        .iter()
                        .map(|&(i, value)| InputPort {
                            position: border_position(width, height, i),
                            value,
                        })
                        .collect(),
                    outputs: outputs
                        .iter()
                        .map(|&(i, target)| OutputPort {
                            position: border_position(width, height, i),
                            target,
                        })
                        .collect(),
                    tiles,
                };
                Stage::new(def).ok()
            },
        )
}

fn arb_rotations() -> impl Strategy<Value = Vec<(i32, i32)>> {
    proptest::collection::vec((-1..5i32, -1..5i32), 0..12)
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Two runs of an unmodified stage produce identical outcomes.
    #[test]
    fn runs_are_deterministic(stage in arb_stage()) {
        let engine = SimulationEngine::default();
        let first = engine.run(&stage);
        let second = engine.run(&stage);
        prop_assert_eq!(&first, &second);
        if let (Ok(a), Ok(b)) = (first, second) {
            prop_assert_eq!(a.encode().unwrap(), b.encode().unwrap());
        }
    }

    /// The engine never mutates the stage it runs.
    #[test]
    fn run_leaves_stage_untouched(stage in arb_stage()) {
        let before = stage.clone();
        let _ = SimulationEngine::default().run(&stage);
        prop_assert_eq!(stage, before);
    }

    /// Every run terminates within the step ceiling, and the verdict agrees
    /// with the failure field.
    #[test]
    fn runs_are_bounded(stage in arb_stage(), max_steps in 0..40u32) {
        let engine = SimulationEngine::new(SimConfig::with_max_steps(max_steps));
        if let Ok(report) = engine.run(&stage) {
            prop_assert!(report.steps <= max_steps);
            prop_assert!(report.log.len() <= max_steps as usize);
            prop_assert_eq!(
                report.status == SimulationStatus::Clear,
                report.failure.is_none()
            );
        }
    }

    /// A clear report has delivered every target.
    #[test]
    fn clear_means_all_targets_met(stage in arb_stage()) {
        if let Ok(report) = SimulationEngine::default().run(&stage) {
            if report.is_clear() {
                for output in stage.outputs() {
                    prop_assert_eq!(report.reached.get(&output.position), Some(&output.target));
                }
            }
        }
    }

    /// Reset after any sequence of rotations restores the authored layout.
    #[test]
    fn reset_after_rotations(stage in arb_stage(), rotations in arb_rotations()) {
        let fresh = stage.clone();
        let mut stage = stage;
        for (x, y) in rotations {
            stage.rotate(GridPosition::new(x, y));
        }
        stage.reset();
        prop_assert_eq!(stage.layout_hash(), fresh.layout_hash());
        prop_assert_eq!(stage, fresh);
    }

    /// Four quarter turns of any cell leave the layout unchanged.
    #[test]
    fn four_turns_are_identity(stage in arb_stage(), x in 0..4i32, y in 0..4i32) {
        let mut stage = stage;
        let before = stage.layout_hash();
        for _ in 0..4 {
            stage.rotate(GridPosition::new(x, y));
        }
        prop_assert_eq!(stage.layout_hash(), before);
    }

    /// Division floors: the remainder has the divisor's sign.
    #[test]
    fn division_floors(value in -1000..1000i64, divisor in -50..50i64) {
        prop_assume!(divisor != 0);
        let q = Operator::Div.apply(value, divisor).unwrap();
        let r = value - q * divisor;
        prop_assert!(r == 0 || (r < 0) == (divisor < 0));
        prop_assert!(r.abs() < divisor.abs());
    }
}
