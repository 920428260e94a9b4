//! Suitability engine: geography mix and urbanization level to a
//! per-sector output multiplier.
//!
//! The result is cached on the canton behind an `Arc`. The cache key is
//! the structural pair (urbanization level, geography shares); as long
//! as neither changes, lookups hand back the same `Arc`. A staged
//! (next-turn) urbanization level never touches the key, only the
//! lag-applied current level does.
//!
//! Execution: gate 5, plan turns only. The labor gate also reads the
//! cache for its tie-break and refreshes it on demand.

use crate::{
    config::{SimConfig, SuitabilityConfig},
    error::SimResult,
    gate::{TurnContext, TurnGate},
    rng::GateRng,
    state::{CantonEconomy, EconomyState},
    types::{Sector, TileType},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectorSuitability {
    /// Clamped whole percent.
    pub percent: i32,
    /// `1 + percent / 100`.
    pub multiplier: f64,
}

impl SectorSuitability {
    fn from_percent(percent: i32) -> Self {
        Self {
            percent,
            multiplier: 1.0 + f64::from(percent) / 100.0,
        }
    }
}

/// Inputs the cached profile was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuitabilityKey {
    pub urbanization_level: u8,
    pub geography: Vec<(TileType, f64)>,
}

impl SuitabilityKey {
    pub fn of(canton: &CantonEconomy) -> Self {
        Self {
            urbanization_level: canton.urbanization_level(),
            geography: canton.geography.iter().map(|(t, s)| (*t, *s)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuitabilityProfile {
    pub key: SuitabilityKey,
    pub sectors: BTreeMap<Sector, SectorSuitability>,
}

impl SuitabilityProfile {
    pub fn percent(&self, sector: Sector) -> i32 {
        self.sectors.get(&sector).map(|s| s.percent).unwrap_or(0)
    }

    pub fn multiplier(&self, sector: Sector) -> f64 {
        self.sectors.get(&sector).map(|s| s.multiplier).unwrap_or(1.0)
    }
}

/// Suitability percent for one sector before caching.
///
/// Shares are normalised when they do not sum to one; negative shares
/// count as zero. An empty mix contributes nothing.
pub fn sector_percent(
    config: &SuitabilityConfig,
    urbanization_level: u8,
    geography: &[(TileType, f64)],
    sector: Sector,
) -> i32 {
    let total: f64 = geography.iter().map(|(_, s)| s.max(0.0)).sum();
    let geo_modifier = match config.geography.get(&sector) {
        Some(table) if total > 0.0 => geography
            .iter()
            .map(|(tile, share)| {
                let weight = share.max(0.0) / total;
                weight * table.get(tile).copied().unwrap_or(0.0)
            })
            .sum(),
        _ => 0.0,
    };

    let ul_index = usize::from(urbanization_level.clamp(1, 12) - 1);
    let ul_modifier = config
        .urbanization
        .get(&sector)
        .and_then(|row| row.get(ul_index))
        .copied()
        .unwrap_or(0.0);

    let rounded = (geo_modifier + ul_modifier).round() as i32;
    rounded.clamp(config.min_percent, config.max_percent)
}

pub fn compute_profile(config: &SuitabilityConfig, key: SuitabilityKey) -> SuitabilityProfile {
    let sectors = Sector::ALL
        .into_iter()
        .map(|sector| {
            let percent = sector_percent(config, key.urbanization_level, &key.geography, sector);
            (sector, SectorSuitability::from_percent(percent))
        })
        .collect();
    SuitabilityProfile { key, sectors }
}

/// Return the canton's cached profile, recomputing it only when the
/// urbanization level or geography shares have changed.
pub fn cached_profile(config: &SuitabilityConfig, canton: &mut CantonEconomy) -> Arc<SuitabilityProfile> {
    let key = SuitabilityKey::of(canton);
    if let Some(profile) = &canton.suitability {
        if profile.key == key {
            return Arc::clone(profile);
        }
    }
    let profile = Arc::new(compute_profile(config, key));
    canton.suitability = Some(Arc::clone(&profile));
    profile
}

pub struct SuitabilityGate {
    config: Arc<SimConfig>,
}

impl SuitabilityGate {
    pub fn new(config: Arc<SimConfig>) -> Self {
        Self { config }
    }
}

impl TurnGate for SuitabilityGate {
    fn name(&self) -> &'static str {
        "suitability"
    }

    fn requires_plan(&self) -> bool {
        true
    }

    fn resolve(
        &mut self,
        state: &mut EconomyState,
        _turn: &mut TurnContext<'_>,
        _rng: &mut GateRng,
    ) -> SimResult<()> {
        let mut recomputed = 0usize;
        for canton in state.cantons.values_mut() {
            let before = canton.suitability.clone();
            let profile = cached_profile(&self.config.suitability, canton);
            if !before.is_some_and(|b| Arc::ptr_eq(&b, &profile)) {
                recomputed += 1;
            }
        }
        log::debug!(
            "turn={} suitability: {} of {} cantons recomputed",
            state.turn,
            recomputed,
            state.cantons.len()
        );
        Ok(())
    }
}
