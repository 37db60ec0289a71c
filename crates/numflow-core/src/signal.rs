//! Signals: values travelling across the grid.

use crate::direction::{Direction, GridPosition};
use std::collections::BTreeSet;

/// A (position, entry edge) pair. Seeing the same key twice on one signal's
/// path means it is going around in circles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey {
    pub position: GridPosition,
    /// `None` for a signal that has just been emitted by an input port.
    pub entered_from: Option<Direction>,
}

/// A travelling value.
///
/// Branching copies the whole signal, visited set included, so every branch
/// accumulates its own loop history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub position: GridPosition,
    pub value: i64,
    /// Edge of the current cell the signal came in through.
    pub entered_from: Option<Direction>,
    visited: BTreeSet<StateKey>,
}

impl Signal {
    /// A freshly emitted signal with no entry direction.
    pub fn emitted(position: GridPosition, value: i64) -> Self {
        Self {
            position,
            value,
            entered_from: None,
            visited: BTreeSet::new(),
        }
    }

    pub fn state_key(&self) -> StateKey {
        StateKey {
            position: self.position,
            entered_from: self.entered_from,
        }
    }

    pub fn has_visited_current_state(&self) -> bool {
        self.visited.contains(&self.state_key())
    }

    /// Record the current state. Returns `false` if it was already recorded.
    pub fn record_current_state(&mut self) -> bool {
        let key = self.state_key();
        self.visited.insert(key)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn move_to(&mut self, position: GridPosition, entered_from: Direction) {
        self.position = position;
        self.entered_from = Some(entered_from);
    }

    /// A copy of this signal that has left through `exit` and now sits in the
    /// neighbouring cell, having entered it through the opposite edge.
    pub fn branch(&self, exit: Direction) -> Signal {
        let mut next = self.clone();
        next.move_to(self.position.step(exit), exit.opposite());
        next
    }
}
