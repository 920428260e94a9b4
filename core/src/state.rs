//! Economy state: the value one turn transforms into the next.
//!
//! RULE: Everything here is plain data. Engines mutate it only through
//! the orchestrator's stage sequence; nothing holds a reference to it
//! between turns.

use crate::{
    budget::RetoolOrder,
    config::SimConfig,
    energy::EnergyState,
    error::{SimError, SimResult},
    event::TurnSummary,
    finance::FinanceState,
    infrastructure::InfrastructureState,
    lagged::Lagged,
    logistics::LogisticsState,
    plan::TurnPlan,
    projects::ProjectsState,
    suitability::SuitabilityProfile,
    trade::TradeState,
    types::{CantonId, EntityId, LaborClass, NationId, Resource, Sector, TileType, Turn},
    welfare::WelfareState,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// ── Stockpile ──────────────────────────────────────────────────────

/// National stockpile. Gold doubles as the treasury and may go
/// negative while the nation is in default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stockpile {
    amounts: BTreeMap<Resource, f64>,
}

impl Stockpile {
    pub fn get(&self, resource: Resource) -> f64 {
        self.amounts.get(&resource).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, resource: Resource, amount: f64) {
        self.amounts.insert(resource, amount);
    }

    pub fn add(&mut self, resource: Resource, amount: f64) {
        *self.amounts.entry(resource).or_insert(0.0) += amount;
    }

    /// Remove as much of `amount` as is on hand. Returns what was taken.
    pub fn take_up_to(&mut self, resource: Resource, amount: f64) -> f64 {
        let available = self.get(resource).max(0.0);
        let taken = amount.max(0.0).min(available);
        self.add(resource, -taken);
        taken
    }

    pub fn has(&self, resource: Resource, amount: f64) -> bool {
        self.get(resource) >= amount
    }

    /// Spend exactly `amount` or fail without touching the stockpile.
    pub fn try_spend(&mut self, resource: Resource, amount: f64) -> SimResult<()> {
        let available = self.get(resource);
        if available < amount {
            return Err(SimError::InsufficientResources {
                resource,
                needed: amount,
                available,
            });
        }
        self.add(resource, -amount);
        Ok(())
    }

    /// Spend a whole bill atomically.
    pub fn try_spend_all(&mut self, bill: &BTreeMap<Resource, f64>) -> SimResult<()> {
        for (&resource, &amount) in bill {
            let available = self.get(resource);
            if available < amount {
                return Err(SimError::InsufficientResources {
                    resource,
                    needed: amount,
                    available,
                });
            }
        }
        for (&resource, &amount) in bill {
            self.add(resource, -amount);
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Resource, f64)> + '_ {
        self.amounts.iter().map(|(r, a)| (*r, *a))
    }
}

// ── Sectors and labor ──────────────────────────────────────────────

/// Slot accounting for one sector in one canton.
///
/// After the budget gate `funded <= capacity` and
/// `idle == capacity - funded`; after every gate `utilization <= funded`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorState {
    pub capacity: u32,
    pub funded: u32,
    pub idle: u32,
    pub utilization: u32,
}

impl SectorState {
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            capacity,
            funded: 0,
            idle: capacity,
            utilization: 0,
        }
    }

    /// Set the funded count, keeping idle and utilization consistent.
    pub fn set_funded(&mut self, funded: u32) {
        self.funded = funded.min(self.capacity);
        self.idle = self.capacity - self.funded;
        self.utilization = self.utilization.min(self.funded);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaborPool {
    pub general: u32,
    pub skilled: u32,
    pub specialist: u32,
}

impl LaborPool {
    pub fn total(&self) -> u32 {
        self.general + self.skilled + self.specialist
    }

    pub fn get(&self, class: LaborClass) -> u32 {
        match class {
            LaborClass::General => self.general,
            LaborClass::Skilled => self.skilled,
            LaborClass::Specialist => self.specialist,
        }
    }

    pub fn get_mut(&mut self, class: LaborClass) -> &mut u32 {
        match class {
            LaborClass::General => &mut self.general,
            LaborClass::Skilled => &mut self.skilled,
            LaborClass::Specialist => &mut self.specialist,
        }
    }
}

/// Labor demand and assignment for one sector this turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorLabor {
    pub demand: u32,
    pub assigned: u32,
    /// Assigned labor after the access index.
    pub effective: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortageFlags {
    pub food: bool,
    pub luxury: bool,
}

/// Crisis flags that force development decay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecayFlags {
    pub siege: bool,
    pub energy: bool,
    pub food: bool,
    pub catastrophe: bool,
}

impl DecayFlags {
    pub fn any(&self) -> bool {
        self.siege || self.energy || self.food || self.catastrophe
    }
}

// ── Canton ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CantonEconomy {
    pub id: CantonId,
    pub sectors: BTreeMap<Sector, SectorState>,
    pub labor_pool: LaborPool,
    pub labor: BTreeMap<Sector, SectorLabor>,
    /// Labor access index in [0, 1].
    pub labor_access_index: f64,
    /// Development meter in [0, 4).
    pub development: f64,
    pub urbanization: Lagged<u8>,
    /// Tile type -> share. Need not sum to one.
    pub geography: BTreeMap<TileType, f64>,
    /// Cached suitability; refreshed when UL or geography change.
    #[serde(default)]
    pub suitability: Option<Arc<SuitabilityProfile>>,
    pub shortages: ShortageFlags,
    /// Set when any sector browned out this turn.
    pub brownout: bool,
}

impl CantonEconomy {
    pub fn new(id: impl Into<CantonId>, urbanization_level: u8) -> Self {
        Self {
            id: id.into(),
            sectors: Sector::ALL
                .into_iter()
                .map(|s| (s, SectorState::default()))
                .collect(),
            labor_pool: LaborPool::default(),
            labor: BTreeMap::new(),
            labor_access_index: 1.0,
            development: 0.0,
            urbanization: Lagged::new(urbanization_level.clamp(1, 12)),
            geography: BTreeMap::new(),
            suitability: None,
            shortages: ShortageFlags::default(),
            brownout: false,
        }
    }

    pub fn with_capacity(mut self, sector: Sector, slots: u32) -> Self {
        self.sectors.insert(sector, SectorState::with_capacity(slots));
        self
    }

    pub fn with_geography(mut self, tile: TileType, share: f64) -> Self {
        self.geography.insert(tile, share);
        self
    }

    pub fn with_labor_access(mut self, lai: f64) -> Self {
        self.labor_access_index = lai.clamp(0.0, 1.0);
        self
    }

    pub fn urbanization_level(&self) -> u8 {
        self.urbanization.current()
    }

    pub fn next_urbanization_level(&self) -> u8 {
        self.urbanization.next()
    }

    pub fn sector(&self, sector: Sector) -> SectorState {
        self.sectors.get(&sector).copied().unwrap_or_default()
    }

    pub fn sector_mut(&mut self, sector: Sector) -> &mut SectorState {
        self.sectors.entry(sector).or_default()
    }

    pub fn is_coastal(&self) -> bool {
        self.geography.get(&TileType::Coast).copied().unwrap_or(0.0) > 0.0
    }

    /// The tile type with the largest share; ties resolve to the
    /// earlier tile type.
    pub fn dominant_terrain(&self) -> Option<TileType> {
        self.geography
            .iter()
            .filter(|(_, share)| **share > 0.0)
            .fold(None, |best: Option<(TileType, f64)>, (tile, share)| match best {
                Some((_, best_share)) if best_share >= *share => best,
                _ => Some((*tile, *share)),
            })
            .map(|(tile, _)| tile)
    }

    pub fn effective_labor(&self) -> u32 {
        self.labor.values().map(|l| l.effective).sum()
    }
}

// ── Root ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomyState {
    pub nation_id: NationId,
    pub turn: Turn,
    pub stockpile: Stockpile,
    pub cantons: BTreeMap<CantonId, CantonEconomy>,
    pub retool_queue: Vec<RetoolOrder>,
    pub energy: EnergyState,
    pub logistics: LogisticsState,
    pub infrastructure: InfrastructureState,
    pub projects: ProjectsState,
    pub finance: FinanceState,
    pub welfare: WelfareState,
    pub trade: TradeState,
    pub current_plan: Option<TurnPlan>,
    pub next_plan: Option<TurnPlan>,
    pub last_summary: Option<TurnSummary>,
    entity_seq: u64,
}

impl EconomyState {
    pub fn new(nation_id: impl Into<NationId>, config: &SimConfig) -> Self {
        Self {
            nation_id: nation_id.into(),
            turn: 0,
            stockpile: Stockpile::default(),
            cantons: BTreeMap::new(),
            retool_queue: Vec::new(),
            energy: EnergyState::default(),
            logistics: LogisticsState::default(),
            infrastructure: InfrastructureState::default(),
            projects: ProjectsState::default(),
            finance: FinanceState::from_config(&config.finance),
            welfare: WelfareState::default(),
            trade: TradeState::default(),
            current_plan: None,
            next_plan: None,
            last_summary: None,
            entity_seq: 0,
        }
    }

    pub fn add_canton(&mut self, canton: CantonEconomy) {
        self.cantons.insert(canton.id.clone(), canton);
    }

    pub fn canton(&self, id: &str) -> SimResult<&CantonEconomy> {
        self.cantons
            .get(id)
            .ok_or_else(|| SimError::UnknownCanton { canton: id.to_string() })
    }

    pub fn canton_mut(&mut self, id: &str) -> SimResult<&mut CantonEconomy> {
        self.cantons
            .get_mut(id)
            .ok_or_else(|| SimError::UnknownCanton { canton: id.to_string() })
    }

    pub fn treasury(&self) -> f64 {
        self.stockpile.get(Resource::Gold)
    }

    /// Total generated labor across cantons (from the last labor gate).
    pub fn total_labor(&self) -> u32 {
        self.cantons.values().map(|c| c.labor_pool.total()).sum()
    }

    /// Allocate a deterministic id such as `fac-3`.
    pub fn next_entity_id(&mut self, prefix: &str) -> EntityId {
        self.entity_seq += 1;
        format!("{prefix}-{}", self.entity_seq)
    }
}
