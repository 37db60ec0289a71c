//! Grid positions, cardinal directions, and quarter-turn rotations.
//!
//! Directions form the cycle North -> East -> South -> West -> North.
//! Rotating by a quarter turn clockwise moves every direction one place
//! forward in that cycle. Tiles use this to rotate their connector sets and
//! the engine uses it for neighbour and reciprocal-edge lookups, so both
//! always agree on what "connected" means.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GridPosition
// ---------------------------------------------------------------------------

/// A cell coordinate. `y` grows downward, so North is `y - 1`.
///
/// Coordinates are signed because ports may sit just outside the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The adjacent position one cell away in `dir`. Saturates at the edge
    /// of the coordinate space, which no grid reaches.
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.offset();
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }
}

impl std::fmt::Display for GridPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Cardinal directions, declared in clockwise order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// All four cardinal directions, clockwise from North.
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }

    /// Position of this direction in the clockwise cycle (North = 0).
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Inverse of [`Direction::index`], taken modulo 4.
    pub fn from_index(index: u8) -> Self {
        match index % 4 {
            0 => Direction::North,
            1 => Direction::East,
            2 => Direction::South,
            _ => Direction::West,
        }
    }

    /// The direction on the other side of the cell.
    pub fn opposite(self) -> Self {
        self.rotated(Rotation::Cw180)
    }

    /// This direction turned clockwise by `rotation`.
    pub fn rotated(self, rotation: Rotation) -> Self {
        Self::from_index(self.index() + rotation.quarter_turns())
    }

    /// Offset for this direction.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    /// Single-letter label (`N`, `E`, `S`, `W`).
    pub fn letter(self) -> char {
        match self {
            Direction::North => 'N',
            Direction::East => 'E',
            Direction::South => 'S',
            Direction::West => 'W',
        }
    }
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

/// Clockwise rotation applied to a tile. Always a multiple of 90 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    /// No rotation.
    #[default]
    None,
    /// 90 degrees clockwise.
    Cw90,
    /// 180 degrees.
    Cw180,
    /// 270 degrees clockwise (90 degrees counter-clockwise).
    Cw270,
}

impl Rotation {
    /// All four rotation values.
    pub fn all() -> [Rotation; 4] {
        [
            Rotation::None,
            Rotation::Cw90,
            Rotation::Cw180,
            Rotation::Cw270,
        ]
    }

    /// Rotate 90 degrees clockwise.
    pub fn rotate_cw(self) -> Self {
        match self {
            Rotation::None => Rotation::Cw90,
            Rotation::Cw90 => Rotation::Cw180,
            Rotation::Cw180 => Rotation::Cw270,
            Rotation::Cw270 => Rotation::None,
        }
    }

    /// Rotate 90 degrees counter-clockwise.
    pub fn rotate_ccw(self) -> Self {
        match self {
            Rotation::None => Rotation::Cw270,
            Rotation::Cw90 => Rotation::None,
            Rotation::Cw180 => Rotation::Cw90,
            Rotation::Cw270 => Rotation::Cw180,
        }
    }

    /// Number of clockwise quarter turns (0..=3).
    pub fn quarter_turns(self) -> u8 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 1,
            Rotation::Cw180 => 2,
            Rotation::Cw270 => 3,
        }
    }

    /// Rotation angle in degrees.
    pub fn degrees(self) -> u32 {
        u32::from(self.quarter_turns()) * 90
    }

    /// Parse an authored angle. Only exact multiples of 90 below 360 are valid.
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Cw90),
            180 => Some(Rotation::Cw180),
            270 => Some(Rotation::Cw270),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// DirectionSet
// ---------------------------------------------------------------------------

/// A set of cardinal directions packed into the low four bits of a byte.
///
/// Iteration always yields members in clockwise order from North, which keeps
/// branching order (and therefore the step log) deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DirectionSet(u8);

impl DirectionSet {
    pub const EMPTY: DirectionSet = DirectionSet(0);
    pub const ALL: DirectionSet = DirectionSet(0b1111);

    pub fn from_slice(dirs: &[Direction]) -> Self {
        dirs.iter().fold(Self::EMPTY, |set, &d| set.with(d))
    }

    fn bit(dir: Direction) -> u8 {
        1 << dir.index()
    }

    pub fn contains(self, dir: Direction) -> bool {
        self.0 & Self::bit(dir) != 0
    }

    /// A copy of this set with `dir` added.
    pub fn with(self, dir: Direction) -> Self {
        Self(self.0 | Self::bit(dir))
    }

    /// A copy of this set with `dir` removed.
    pub fn without(self, dir: Direction) -> Self {
        Self(self.0 & !Self::bit(dir))
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Every member turned clockwise by `rotation`.
    pub fn rotated(self, rotation: Rotation) -> Self {
        let k = rotation.quarter_turns();
        // 4-bit rotate-left: bit i moves to bit (i + k) mod 4.
        let bits = ((self.0 << k) | (self.0 >> (4 - k))) & 0b1111;
        Self(bits)
    }

    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::all().into_iter().filter(move |&d| self.contains(d))
    }
}

impl FromIterator<Direction> for DirectionSet {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, |set, d| set.with(d))
    }
}

impl std::fmt::Display for DirectionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for dir in self.iter() {
            write!(f, "{}", dir.letter())?;
        }
        Ok(())
    }
}
