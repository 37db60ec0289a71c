//! Engine-fatal errors.
//!
//! These are distinct from [`Failure`](crate::report::Failure): a failure is
//! a verdict on the player's layout, while a [`SimulationError`] means the
//! stage itself is malformed and the run cannot produce a meaningful result.

use crate::direction::GridPosition;
use crate::tile::{ArithmeticFault, Operator};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    /// A pipe's operator has no defined integer result for the value it
    /// received.
    #[error("configuration error at {position}: {operator:?} {operand} on {value}: {fault}")]
    Configuration {
        position: GridPosition,
        operator: Operator,
        operand: i64,
        value: i64,
        fault: ArithmeticFault,
    },
}
