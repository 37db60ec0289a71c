//! Fixed-size, y-major grid of tiles.

use crate::direction::GridPosition;
use crate::tile::Tile;
use serde::{Deserialize, Serialize};

/// Rectangular tile storage. Every cell always holds exactly one [`Tile`]
/// (an empty tile if nothing was placed); dimensions never change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

impl Grid {
    /// Create a grid filled with empty tiles. Stages cap the size at
    /// [`MAX_GRID_CELLS`](crate::stage::MAX_GRID_CELLS).
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tiles: vec![Tile::empty(); width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn in_bounds(&self, pos: GridPosition) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    fn index(&self, pos: GridPosition) -> Option<usize> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some(pos.y as usize * self.width as usize + pos.x as usize)
    }

    /// The tile at `pos`, or `None` if out of bounds.
    pub fn get(&self, pos: GridPosition) -> Option<&Tile> {
        self.index(pos).map(|i| &self.tiles[i])
    }

    pub fn get_mut(&mut self, pos: GridPosition) -> Option<&mut Tile> {
        let i = self.index(pos)?;
        Some(&mut self.tiles[i])
    }

    /// Replace the tile at `pos`. Out-of-bounds writes are ignored.
    pub fn set(&mut self, pos: GridPosition, tile: Tile) {
        if let Some(slot) = self.get_mut(pos) {
            *slot = tile;
        }
    }

    /// Rotate the pipe at `pos` a quarter turn clockwise. Returns `false`
    /// (and changes nothing) for out-of-bounds cells, non-pipes and fixed
    /// tiles.
    pub fn rotate(&mut self, pos: GridPosition) -> bool {
        self.get_mut(pos).is_some_and(Tile::rotate_clockwise)
    }

    /// All cells with their positions, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (GridPosition, &Tile)> {
        let w = self.width as usize;
        self.tiles.iter().enumerate().map(move |(i, tile)| {
            let pos = GridPosition::new((i % w) as i32, (i / w) as i32);
            (pos, tile)
        })
    }

    pub fn pipe_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_pipe()).count()
    }
}
