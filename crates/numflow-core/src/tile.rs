//! Tiles: shape, rotation, and the arithmetic operator a pipe applies.

use crate::direction::{Direction, DirectionSet, Rotation};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

/// Pipe shapes. Connectivity is given at rotation 0 and rotated at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileShape {
    /// `I`: North and South.
    #[default]
    Straight,
    /// `L`: North and East.
    LShape,
    /// `T`: North, East and West.
    TShape,
    /// `+`: all four sides.
    Cross,
}

impl TileShape {
    pub fn all() -> [TileShape; 4] {
        [
            TileShape::Straight,
            TileShape::LShape,
            TileShape::TShape,
            TileShape::Cross,
        ]
    }

    /// Connected edges at rotation 0.
    pub fn base_connections(self) -> DirectionSet {
        use Direction::*;
        match self {
            TileShape::Straight => DirectionSet::from_slice(&[North, South]),
            TileShape::LShape => DirectionSet::from_slice(&[North, East]),
            TileShape::TShape => DirectionSet::from_slice(&[North, East, West]),
            TileShape::Cross => DirectionSet::ALL,
        }
    }

    /// The one-character symbol used by stage data files.
    pub fn symbol(self) -> char {
        match self {
            TileShape::Straight => 'I',
            TileShape::LShape => 'L',
            TileShape::TShape => 'T',
            TileShape::Cross => '+',
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "I" => Some(TileShape::Straight),
            "L" => Some(TileShape::LShape),
            "T" => Some(TileShape::TShape),
            "+" => Some(TileShape::Cross),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Operator
// ---------------------------------------------------------------------------

/// Arithmetic applied to a signal passing through a pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    /// Floor division (rounds toward negative infinity).
    Div,
    /// Remainder with the sign of the dividend.
    Mod,
    Pow,
    /// Negation. The operand is ignored.
    Neg,
    #[default]
    None,
}

impl Operator {
    /// Upper-case name as written in stage data (`ADD`, `DIV`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Operator::Add => "ADD",
            Operator::Sub => "SUB",
            Operator::Mul => "MUL",
            Operator::Div => "DIV",
            Operator::Mod => "MOD",
            Operator::Pow => "POW",
            Operator::Neg => "NEG",
            Operator::None => "NONE",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ADD" => Some(Operator::Add),
            "SUB" => Some(Operator::Sub),
            "MUL" => Some(Operator::Mul),
            "DIV" => Some(Operator::Div),
            "MOD" => Some(Operator::Mod),
            "POW" => Some(Operator::Pow),
            "NEG" => Some(Operator::Neg),
            "NONE" => Some(Operator::None),
            _ => None,
        }
    }

    /// Compact label for display, e.g. `+3`, `÷2`, `±`. Empty for `None`.
    pub fn label(self, operand: i64) -> String {
        match self {
            Operator::Add => format!("+{operand}"),
            Operator::Sub => format!("-{operand}"),
            Operator::Mul => format!("×{operand}"),
            Operator::Div => format!("÷{operand}"),
            Operator::Mod => format!("%{operand}"),
            Operator::Pow => format!("^{operand}"),
            Operator::Neg => "±".to_string(),
            Operator::None => String::new(),
        }
    }

    /// Apply the operator to `value`.
    ///
    /// Every case that has no well-defined integer result is reported instead
    /// of producing a wrapped or truncated value.
    pub fn apply(self, value: i64, operand: i64) -> Result<i64, ArithmeticFault> {
        match self {
            Operator::Add => value.checked_add(operand).ok_or(ArithmeticFault::Overflow),
            Operator::Sub => value.checked_sub(operand).ok_or(ArithmeticFault::Overflow),
            Operator::Mul => value.checked_mul(operand).ok_or(ArithmeticFault::Overflow),
            Operator::Div => floor_div(value, operand),
            Operator::Mod => {
                if operand == 0 {
                    return Err(ArithmeticFault::ModuloByZero);
                }
                value.checked_rem(operand).ok_or(ArithmeticFault::Overflow)
            }
            Operator::Pow => {
                if operand < 0 {
                    return Err(ArithmeticFault::NegativeExponent);
                }
                let exp = u32::try_from(operand).map_err(|_| ArithmeticFault::Overflow)?;
                value.checked_pow(exp).ok_or(ArithmeticFault::Overflow)
            }
            Operator::Neg => value.checked_neg().ok_or(ArithmeticFault::Overflow),
            Operator::None => Ok(value),
        }
    }
}

fn floor_div(value: i64, divisor: i64) -> Result<i64, ArithmeticFault> {
    if divisor == 0 {
        return Err(ArithmeticFault::DivisionByZero);
    }
    let quotient = value.checked_div(divisor).ok_or(ArithmeticFault::Overflow)?;
    if value % divisor != 0 && ((value < 0) != (divisor < 0)) {
        Ok(quotient - 1)
    } else {
        Ok(quotient)
    }
}

/// Arithmetic a malformed stage can ask a pipe to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ArithmeticFault {
    #[error("division by zero")]
    DivisionByZero,
    #[error("modulo by zero")]
    ModuloByZero,
    #[error("negative exponent")]
    NegativeExponent,
    #[error("integer overflow")]
    Overflow,
}

// ---------------------------------------------------------------------------
// Tile
// ---------------------------------------------------------------------------

/// What a grid cell holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileKind {
    #[default]
    Empty,
    Pipe,
    /// Marks an in-grid input port. Never rotates or accepts connectors.
    Input,
    /// Marks an in-grid output port. Never rotates or accepts connectors.
    Output,
}

/// A single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Tile {
    pub kind: TileKind,
    pub shape: TileShape,
    pub rotation: Rotation,
    pub operator: Operator,
    pub operand: i64,
    /// Rotation-locked.
    pub fixed: bool,
}

impl Tile {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A pass-through pipe.
    pub fn pipe(shape: TileShape, rotation: Rotation) -> Self {
        Self {
            kind: TileKind::Pipe,
            shape,
            rotation,
            ..Self::default()
        }
    }

    pub fn marker(kind: TileKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn with_operator(mut self, operator: Operator, operand: i64) -> Self {
        self.operator = operator;
        self.operand = operand;
        self
    }

    pub fn locked(mut self) -> Self {
        self.fixed = true;
        self
    }

    pub fn is_pipe(&self) -> bool {
        self.kind == TileKind::Pipe
    }

    pub fn is_empty(&self) -> bool {
        self.kind == TileKind::Empty
    }

    /// Turn 90 degrees clockwise. Returns whether the tile actually moved:
    /// fixed tiles and non-pipes stay put.
    pub fn rotate_clockwise(&mut self) -> bool {
        if self.fixed || !self.is_pipe() {
            return false;
        }
        self.rotation = self.rotation.rotate_cw();
        true
    }

    /// Edges this tile connects to at its current rotation.
    pub fn connection_directions(&self) -> DirectionSet {
        if !self.is_pipe() {
            return DirectionSet::EMPTY;
        }
        self.shape.base_connections().rotated(self.rotation)
    }

    /// A signal entering through edge `dir` needs a connector on that edge.
    pub fn can_accept_from(&self, dir: Direction) -> bool {
        self.connection_directions().contains(dir)
    }

    /// Exits for a signal that entered through `entered_from`. The entry edge
    /// is never an exit.
    pub fn output_directions(&self, entered_from: Direction) -> DirectionSet {
        self.connection_directions().without(entered_from)
    }

    pub fn apply(&self, value: i64) -> Result<i64, ArithmeticFault> {
        self.operator.apply(value, self.operand)
    }

    pub fn operator_label(&self) -> String {
        self.operator.label(self.operand)
    }
}
