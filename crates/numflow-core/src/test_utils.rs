//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::direction::{GridPosition, Rotation};
use crate::stage::{InputPort, OutputPort, Stage, StageDefinition, TilePlacement};
use crate::tile::{Operator, TileShape};

// ===========================================================================
// Placements
// ===========================================================================

pub fn pos(x: i32, y: i32) -> GridPosition {
    GridPosition::new(x, y)
}

/// A pass-through pipe.
pub fn pipe(x: i32, y: i32, shape: TileShape, rotation: Rotation) -> TilePlacement {
    TilePlacement {
        position: pos(x, y),
        shape,
        rotation,
        operator: Operator::None,
        operand: 0,
        fixed: false,
    }
}

/// A pipe that applies `operator` with `operand`.
pub fn op_pipe(
    x: i32,
    y: i32,
    shape: TileShape,
    rotation: Rotation,
    operator: Operator,
    operand: i64,
) -> TilePlacement {
    TilePlacement {
        operator,
        operand,
        ..pipe(x, y, shape, rotation)
    }
}

pub fn input(x: i32, y: i32, value: i64) -> InputPort {
    InputPort {
        position: pos(x, y),
        value,
    }
}

pub fn output(x: i32, y: i32, target: i64) -> OutputPort {
    OutputPort {
        position: pos(x, y),
        target,
    }
}

pub fn definition(
    name: &str,
    width: u32,
    height: u32,
    inputs: Vec<InputPort>,
    outputs: Vec<OutputPort>,
    tiles: Vec<TilePlacement>,
) -> StageDefinition {
    StageDefinition {
        name: name.to_string(),
        width,
        height,
        inputs,
        outputs,
        tiles,
    }
}

/// Build a stage, panicking on structural errors.
pub fn stage(def: StageDefinition) -> Stage {
    match Stage::new(def) {
        Ok(stage) => stage,
        Err(e) => panic!("invalid test stage: {e}"),
    }
}

// ===========================================================================
// Stage builders
// ===========================================================================

/// A 1xN row of horizontal straight pipes, one per entry in `ops`, fed from
/// the west and drained to the east.
pub fn line_stage(ops: &[(Operator, i64)], input_value: i64, target: i64) -> Stage {
    let width = ops.len() as i32;
    let tiles = ops
        .iter()
        .enumerate()
        .map(|(x, &(operator, operand))| {
            op_pipe(x as i32, 0, TileShape::Straight, Rotation::Cw90, operator, operand)
        })
        .collect();
    stage(definition(
        "line",
        width as u32,
        1,
        vec![input(-1, 0, input_value)],
        vec![output(width, 0, target)],
        tiles,
    ))
}

/// The classic first stage: 10 -> SUB 3 -> DIV 2 -> ADD 1 -> 4, on row 2 of a
/// 5x5 grid with the ports just off the left and right edges.
pub fn arithmetic_chain_stage() -> Stage {
    let row = 2;
    stage(definition(
        "arithmetic chain",
        5,
        5,
        vec![input(-1, row, 10)],
        vec![output(5, row, 4)],
        vec![
            pipe(0, row, TileShape::Straight, Rotation::Cw90),
            op_pipe(1, row, TileShape::Straight, Rotation::Cw90, Operator::Sub, 3),
            op_pipe(2, row, TileShape::Straight, Rotation::Cw90, Operator::Div, 2),
            op_pipe(3, row, TileShape::Straight, Rotation::Cw90, Operator::Add, 1),
            pipe(4, row, TileShape::Straight, Rotation::Cw90),
        ],
    ))
}

/// One input split by a T into two outputs, each branch with its own
/// operator. Input 6 reaches the north output as 12 and the south as 3.
pub fn branching_stage() -> Stage {
    stage(definition(
        "branching",
        3,
        3,
        vec![input(-1, 1, 6)],
        vec![output(2, -1, 12), output(2, 3, 3)],
        vec![
            pipe(0, 1, TileShape::Straight, Rotation::Cw90),
            // West, North and South.
            pipe(1, 1, TileShape::TShape, Rotation::Cw270),
            // West and North, then up to the north output.
            op_pipe(2, 0, TileShape::LShape, Rotation::Cw270, Operator::Mul, 2),
            // Continues the north arm: South and East.
            pipe(1, 0, TileShape::LShape, Rotation::Cw90),
            // South arm: North and East.
            op_pipe(1, 2, TileShape::LShape, Rotation::None, Operator::Div, 2),
            // West and South, down to the south output.
            pipe(2, 2, TileShape::LShape, Rotation::Cw180),
        ],
    ))
}

/// A closed ring of four L pipes fed from the west. The signal floods both
/// ways round the ring and the two halves meet at (1, 1).
pub fn ring_stage() -> Stage {
    stage(definition(
        "ring",
        2,
        2,
        vec![input(-1, 0, 1)],
        vec![],
        vec![
            pipe(0, 0, TileShape::LShape, Rotation::Cw90),
            pipe(1, 0, TileShape::LShape, Rotation::Cw180),
            pipe(1, 1, TileShape::LShape, Rotation::Cw270),
            pipe(0, 1, TileShape::LShape, Rotation::None),
        ],
    ))
}

/// Two inputs on opposite sides of a 3x1 row meet in the middle cell.
pub fn head_on_stage() -> Stage {
    stage(definition(
        "head on",
        3,
        1,
        vec![input(-1, 0, 1), input(3, 0, 2)],
        vec![],
        vec![
            pipe(0, 0, TileShape::Straight, Rotation::Cw90),
            pipe(1, 0, TileShape::Straight, Rotation::Cw90),
            pipe(2, 0, TileShape::Straight, Rotation::Cw90),
        ],
    ))
}
