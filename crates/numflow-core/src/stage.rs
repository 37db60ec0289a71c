//! Stages: a grid plus its input and output ports.
//!
//! A [`Stage`] keeps the [`StageDefinition`] it was built from. Player
//! rotations only touch the live grid, so [`Stage::reset`] can rebuild the
//! authored layout exactly, fixed flags and starting rotations included.

use crate::direction::{Direction, GridPosition, Rotation};
use crate::grid::Grid;
use crate::sim::StateHash;
use crate::tile::{Operator, Tile, TileKind, TileShape};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// A signal source with a fixed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputPort {
    pub position: GridPosition,
    pub value: i64,
}

/// A signal sink that must receive `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputPort {
    pub position: GridPosition,
    pub target: i64,
}

/// An authored pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TilePlacement {
    pub position: GridPosition,
    pub shape: TileShape,
    pub rotation: Rotation,
    pub operator: Operator,
    pub operand: i64,
    pub fixed: bool,
}

impl TilePlacement {
    pub fn tile(&self) -> Tile {
        Tile {
            kind: TileKind::Pipe,
            shape: self.shape,
            rotation: self.rotation,
            operator: self.operator,
            operand: self.operand,
            fixed: self.fixed,
        }
    }
}

/// Everything needed to build (and later rebuild) a stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageDefinition {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub inputs: Vec<InputPort>,
    pub outputs: Vec<OutputPort>,
    pub tiles: Vec<TilePlacement>,
}

/// Largest grid, in cells, a stage may declare.
pub const MAX_GRID_CELLS: u64 = 1 << 16;

/// Structural problems that make a definition unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    #[error("stage '{name}' has an empty {width}x{height} grid")]
    EmptyGrid {
        name: String,
        width: u32,
        height: u32,
    },
    #[error("tile at {position} lies outside the grid")]
    PlacementOutOfBounds { position: GridPosition },
    #[error("more than one tile placed at {position}")]
    DuplicatePlacement { position: GridPosition },
    #[error("more than one port declared at {position}")]
    DuplicatePort { position: GridPosition },
    #[error("stage '{name}' grid of {width}x{height} exceeds {} cells", MAX_GRID_CELLS)]
    GridTooLarge {
        name: String,
        width: u32,
        height: u32,
    },
    /// Ports sit on the grid or on the ring of cells just outside it.
    #[error("port at {position} is neither on nor next to the grid")]
    PortOutOfRange { position: GridPosition },
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// A playable stage instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    definition: StageDefinition,
    grid: Grid,
}

impl Stage {
    /// Validate `definition` and lay out its grid.
    pub fn new(definition: StageDefinition) -> Result<Self, StageError> {
        validate_structure(&definition)?;
        let grid = build_grid(&definition);
        Ok(Self { definition, grid })
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// The authored definition this stage resets to.
    pub fn definition(&self) -> &StageDefinition {
        &self.definition
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn inputs(&self) -> &[InputPort] {
        &self.definition.inputs
    }

    pub fn outputs(&self) -> &[OutputPort] {
        &self.definition.outputs
    }

    pub fn output_at(&self, pos: GridPosition) -> Option<&OutputPort> {
        self.definition.outputs.iter().find(|o| o.position == pos)
    }

    pub fn is_output(&self, pos: GridPosition) -> bool {
        self.output_at(pos).is_some()
    }

    /// Player command: rotate the pipe at `pos`. No-op (returns `false`) for
    /// out-of-bounds cells, non-pipes and fixed tiles.
    pub fn rotate(&mut self, pos: GridPosition) -> bool {
        self.grid.rotate(pos)
    }

    /// Restore every tile to its authored state. Ports and grid size are
    /// untouched.
    pub fn reset(&mut self) {
        self.grid = build_grid(&self.definition);
    }

    /// Where a signal from `input` starts: the port cell itself when it lies
    /// on the grid, otherwise the grid cell the port faces. A port with no
    /// adjacent grid cell seeds at its own (off-grid) position.
    pub fn entry_cell(&self, input: &InputPort) -> GridPosition {
        if self.grid.in_bounds(input.position) {
            return input.position;
        }
        Direction::all()
            .into_iter()
            .map(|dir| input.position.step(dir))
            .find(|&pos| self.grid.in_bounds(pos))
            .unwrap_or(input.position)
    }

    /// Hash of every cell's kind and rotation, row by row.
    pub fn layout_hash(&self) -> u64 {
        let mut hasher = StateHash::new();
        hasher.write_u32(self.grid.width());
        hasher.write_u32(self.grid.height());
        for (_, tile) in self.grid.iter() {
            hasher.write_u8(tile.kind as u8);
            hasher.write_u8(tile.rotation.quarter_turns());
        }
        hasher.finish()
    }
}

fn validate_structure(def: &StageDefinition) -> Result<(), StageError> {
    if def.width == 0 || def.height == 0 {
        return Err(StageError::EmptyGrid {
            name: def.name.clone(),
            width: def.width,
            height: def.height,
        });
    }

    let cells = u64::from(def.width) * u64::from(def.height);
    if cells > MAX_GRID_CELLS {
        return Err(StageError::GridTooLarge {
            name: def.name.clone(),
            width: def.width,
            height: def.height,
        });
    }

    let (width, height) = (i64::from(def.width), i64::from(def.height));
    let within = |pos: GridPosition, margin: i64| {
        let (x, y) = (i64::from(pos.x), i64::from(pos.y));
        (-margin..width + margin).contains(&x) && (-margin..height + margin).contains(&y)
    };

    let mut placed = BTreeSet::new();
    for placement in &def.tiles {
        if !within(placement.position, 0) {
            return Err(StageError::PlacementOutOfBounds {
                position: placement.position,
            });
        }
        if !placed.insert(placement.position) {
            return Err(StageError::DuplicatePlacement {
                position: placement.position,
            });
        }
    }

    let mut ports = BTreeSet::new();
    let port_positions = def
        .inputs
        .iter()
        .map(|i| i.position)
        .chain(def.outputs.iter().map(|o| o.position));
    for position in port_positions {
        if !within(position, 1) {
            return Err(StageError::PortOutOfRange { position });
        }
        if !ports.insert(position) {
            return Err(StageError::DuplicatePort { position });
        }
    }

    Ok(())
}

fn build_grid(def: &StageDefinition) -> Grid {
    let mut grid = Grid::new(def.width, def.height);
    for placement in &def.tiles {
        grid.set(placement.position, placement.tile());
    }

    // Bare in-grid port cells get a marker so they are not mistaken for holes.
    let markers = def
        .inputs
        .iter()
        .map(|i| (i.position, TileKind::Input))
        .chain(def.outputs.iter().map(|o| (o.position, TileKind::Output)));
    for (position, kind) in markers {
        if grid.get(position).is_some_and(Tile::is_empty) {
            grid.set(position, Tile::marker(kind));
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipe_at(x: i32, y: i32, rotation: Rotation) -> TilePlacement {
        TilePlacement {
            position: GridPosition::new(x, y),
            shape: TileShape::Straight,
            rotation,
            operator: Operator::None,
            operand: 0,
            fixed: false,
        }
    }

    fn definition() -> StageDefinition {
        StageDefinition {
            name: "test".to_string(),
            width: 3,
            height: 1,
            inputs: vec![InputPort {
                position: GridPosition::new(-1, 0),
                value: 1,
            }],
            outputs: vec![OutputPort {
                position: GridPosition::new(3, 0),
                target: 1,
            }],
            tiles: vec![
                pipe_at(0, 0, Rotation::Cw90),
                pipe_at(1, 0, Rotation::Cw270),
                pipe_at(2, 0, Rotation::Cw90),
            ],
        }
    }

    #[test]
    fn builds_grid_from_placements() {
        let stage = Stage::new(definition()).unwrap();
        assert_eq!(stage.grid().pipe_count(), 3);
        assert_eq!(
            stage.grid().get(GridPosition::new(1, 0)).unwrap().rotation,
            Rotation::Cw270
        );
        assert_eq!(stage.name(), "test");
    }

    #[test]
    fn output_lookup() {
        let stage = Stage::new(definition()).unwrap();
        assert_eq!(stage.output_at(GridPosition::new(3, 0)).unwrap().target, 1);
        assert!(stage.output_at(GridPosition::new(0, 0)).is_none());
    }

    #[test]
    fn entry_cell_faces_the_grid() {
        let stage = Stage::new(definition()).unwrap();
        let input = stage.inputs()[0];
        assert_eq!(stage.entry_cell(&input), GridPosition::new(0, 0));

        let inside = InputPort {
            position: GridPosition::new(2, 0),
            value: 0,
        };
        assert_eq!(stage.entry_cell(&inside), GridPosition::new(2, 0));

        let corner = InputPort {
            position: GridPosition::new(-1, -1),
            value: 0,
        };
        assert_eq!(stage.entry_cell(&corner), GridPosition::new(-1, -1));

        let extreme = InputPort {
            position: GridPosition::new(i32::MAX, i32::MIN),
            value: 0,
        };
        assert_eq!(stage.entry_cell(&extreme), extreme.position);
    }

    #[test]
    fn reset_restores_authored_rotations() {
        let mut stage = Stage::new(definition()).unwrap();
        let authored = stage.grid().clone();
        let authored_hash = stage.layout_hash();

        assert!(stage.rotate(GridPosition::new(0, 0)));
        assert!(stage.rotate(GridPosition::new(1, 0)));
        assert!(stage.rotate(GridPosition::new(1, 0)));
        assert_ne!(stage.layout_hash(), authored_hash);

        stage.reset();
        assert_eq!(stage.grid(), &authored);
        assert_eq!(stage.layout_hash(), authored_hash);
        assert_eq!(stage.inputs().len(), 1);
        assert_eq!(stage.outputs().len(), 1);
    }

    #[test]
    fn in_grid_ports_get_markers() {
        let mut def = definition();
        def.tiles.clear();
        def.inputs[0].position = GridPosition::new(0, 0);
        def.outputs[0].position = GridPosition::new(2, 0);
        let stage = Stage::new(def).unwrap();
        assert_eq!(
            stage.grid().get(GridPosition::new(0, 0)).unwrap().kind,
            TileKind::Input
        );
        assert_eq!(
            stage.grid().get(GridPosition::new(2, 0)).unwrap().kind,
            TileKind::Output
        );
        assert!(stage.grid().get(GridPosition::new(1, 0)).unwrap().is_empty());
    }

    #[test]
    fn rejects_empty_grid() {
        let mut def = definition();
        def.width = 0;
        assert!(matches!(Stage::new(def), Err(StageError::EmptyGrid { .. })));
    }

    #[test]
    fn rejects_out_of_bounds_placement() {
        let mut def = definition();
        def.tiles.push(pipe_at(7, 0, Rotation::None));
        assert_eq!(
            Stage::new(def),
            Err(StageError::PlacementOutOfBounds {
                position: GridPosition::new(7, 0)
            })
        );
    }

    #[test]
    fn rejects_duplicate_placement() {
        let mut def = definition();
        def.tiles.push(pipe_at(1, 0, Rotation::None));
        assert!(matches!(
            Stage::new(def),
            Err(StageError::DuplicatePlacement { .. })
        ));
    }

    #[test]
    fn rejects_port_sharing_a_position() {
        let mut def = definition();
        def.outputs[0].position = def.inputs[0].position;
        assert!(matches!(
            Stage::new(def),
            Err(StageError::DuplicatePort { .. })
        ));
    }

    #[test]
    fn rejects_ports_away_from_the_grid() {
        let mut def = definition();
        def.inputs[0].position = GridPosition::new(i32::MAX, 0);
        assert_eq!(
            Stage::new(def),
            Err(StageError::PortOutOfRange {
                position: GridPosition::new(i32::MAX, 0)
            })
        );

        let mut def = definition();
        def.outputs[0].position = GridPosition::new(4, 0);
        assert!(matches!(
            Stage::new(def),
            Err(StageError::PortOutOfRange { .. })
        ));
    }

    #[test]
    fn accepts_ports_on_the_outer_ring() {
        let mut def = definition();
        def.inputs[0].position = GridPosition::new(-1, -1);
        def.outputs[0].position = GridPosition::new(3, 1);
        assert!(Stage::new(def).is_ok());
    }

    #[test]
    fn rejects_oversized_grid_without_allocating() {
        let mut def = definition();
        def.width = u32::MAX;
        def.height = u32::MAX;
        assert!(matches!(
            Stage::new(def),
            Err(StageError::GridTooLarge { .. })
        ));

        let mut def = definition();
        def.width = 256;
        def.height = 256;
        assert!(Stage::new(def).is_ok());
        def = definition();
        def.width = 256;
        def.height = 257;
        assert!(matches!(
            Stage::new(def),
            Err(StageError::GridTooLarge { .. })
        ));
    }
}
