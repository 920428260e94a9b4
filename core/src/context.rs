//! Read-only context supplied by collaborators outside the core.
//!
//! The map service owns topology; the session layer owns crisis flags
//! such as sieges. Both are handed to `advance_turn` each turn and never
//! stored on the economy state.

use crate::types::{CantonId, TileType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Straight-line distance between two port cantons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDistance {
    pub a: CantonId,
    pub b: CantonId,
    pub distance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapContext {
    pub port_distances: Vec<PortDistance>,
    /// Land adjacency between cantons; treated as undirected.
    pub rail_adjacency: BTreeMap<CantonId, Vec<CantonId>>,
    /// Terrain override per canton. Cantons absent here use the
    /// dominant tile of their geography mix.
    pub terrain: BTreeMap<CantonId, TileType>,
}

impl MapContext {
    pub fn port_distance(&self, a: &str, b: &str) -> Option<f64> {
        self.port_distances
            .iter()
            .find(|d| (d.a == a && d.b == b) || (d.a == b && d.b == a))
            .map(|d| d.distance)
    }
}

/// Externally raised crises for one canton.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrisisFlags {
    pub siege: bool,
    pub catastrophe: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalContext {
    pub map: MapContext,
    pub crises: BTreeMap<CantonId, CrisisFlags>,
}

impl ExternalContext {
    pub fn crisis(&self, canton: &str) -> CrisisFlags {
        self.crises.get(canton).copied().unwrap_or_default()
    }
}
