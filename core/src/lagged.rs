//! One-turn-lag values.
//!
//! A `Lagged<T>` holds the value the pipeline reads this turn
//! (`current`) and the value staged for next turn (`next`). Policy and
//! growth code may only `stage`; the orchestrator's carryover phase is
//! the only caller of `apply_pending`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lagged<T> {
    current: T,
    next: T,
}

impl<T: Copy + PartialEq> Lagged<T> {
    pub fn new(value: T) -> Self {
        Self { current: value, next: value }
    }

    pub fn current(&self) -> T {
        self.current
    }

    pub fn next(&self) -> T {
        self.next
    }

    pub fn stage(&mut self, value: T) {
        self.next = value;
    }

    pub fn is_pending(&self) -> bool {
        self.current != self.next
    }

    /// Promote the staged value. Returns the previous current value if
    /// it changed.
    pub fn apply_pending(&mut self) -> Option<T> {
        if self.is_pending() {
            let previous = self.current;
            self.current = self.next;
            Some(previous)
        } else {
            None
        }
    }
}
