//! Snapshot serialization: the fully resolved post-turn state as JSON.
//!
//! A snapshot is only ever taken between turns, so the broadcaster never
//! observes a half-applied gate. Two runs with the same seed, rules and
//! plans must produce byte-identical snapshot JSON.

use crate::{
    error::{SimError, SimResult},
    state::EconomyState,
    types::Turn,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomySnapshot {
    pub turn: Turn,
    pub state: EconomyState,
}

impl EconomySnapshot {
    pub fn of(state: &EconomyState) -> Self {
        Self {
            turn: state.turn,
            state: state.clone(),
        }
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> SimResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Compare two snapshots byte for byte.
pub fn verify_identical(a: &EconomySnapshot, b: &EconomySnapshot) -> SimResult<()> {
    if a.to_json()? != b.to_json()? {
        return Err(SimError::DeterminismViolation { turn: a.turn.max(b.turn) });
    }
    Ok(())
}
