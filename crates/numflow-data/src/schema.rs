//! Serde data file structs for stage definitions.
//!
//! These structs define the on-disk format for stages and stage catalogs.
//! Field names follow the authoring format (`gridSize`, `targetValue`), and
//! shapes, operators and rotations are kept as written until the loader
//! resolves them into engine types.

use serde::{Deserialize, Serialize};

// ===========================================================================
// Positions
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosData {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSizeData {
    pub width: u32,
    pub height: u32,
}

// ===========================================================================
// Ports
// ===========================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputData {
    pub pos: PosData,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputData {
    pub pos: PosData,
    pub target_value: i64,
}

// ===========================================================================
// Tiles
// ===========================================================================

/// A pipe placement. Only `pos` and `shape` are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileData {
    pub pos: PosData,
    /// `I`, `L`, `T` or `+`.
    pub shape: String,
    /// `ADD`, `SUB`, `MUL`, `DIV`, `MOD`, `POW`, `NEG` or `NONE`.
    #[serde(default = "default_operator")]
    pub operator: String,
    #[serde(default)]
    pub operand: i64,
    /// Clockwise degrees: 0, 90, 180 or 270.
    #[serde(default)]
    pub rotation: u32,
    #[serde(default)]
    pub fixed: bool,
}

fn default_operator() -> String {
    "NONE".to_string()
}

// ===========================================================================
// Stages
// ===========================================================================

/// One stage as authored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageData {
    pub name: String,
    pub grid_size: GridSizeData,
    #[serde(default)]
    pub inputs: Vec<InputData>,
    #[serde(default)]
    pub outputs: Vec<OutputData>,
    #[serde(default)]
    pub tiles: Vec<TileData>,
}
