//! Player turn plans.
//!
//! A plan submitted during turn N is stored as `next_plan` and becomes
//! the `current_plan` that gates 1–5 execute in turn N+1.

use crate::{
    budget::RetoolRequest,
    projects::ProjectOrder,
    trade::TradeOrder,
    types::{CantonId, RationingMode, Sector},
    welfare::WelfarePolicy,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Budgets {
    pub military: f64,
    pub welfare: f64,
    /// National gold per sector, spread across cantons by capacity.
    pub sector_om: BTreeMap<Sector, f64>,
    /// Per-canton allocations; replace the national share for that
    /// canton and sector when present.
    pub canton_om: BTreeMap<CantonId, BTreeMap<Sector, f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policies {
    pub welfare: Option<WelfarePolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeOrders {
    pub imports: Vec<TradeOrder>,
    pub exports: Vec<TradeOrder>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RationingPolicy {
    pub energy: RationingMode,
    pub logistics: RationingMode,
    /// Overrides the configured essentials list for both gates.
    pub essentials: Option<Vec<Sector>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnPlan {
    pub budgets: Budgets,
    pub policies: Policies,
    /// Lower rank is served first by the labor gate.
    pub slot_priorities: BTreeMap<Sector, i32>,
    pub trade_orders: TradeOrders,
    pub projects: Vec<ProjectOrder>,
    pub retools: Vec<RetoolRequest>,
    pub rationing: RationingPolicy,
}

impl TurnPlan {
    pub fn priority_of(&self, sector: Sector) -> i32 {
        self.slot_priorities.get(&sector).copied().unwrap_or(i32::MAX)
    }

    pub fn with_sector_budget(mut self, sector: Sector, gold: f64) -> Self {
        self.budgets.sector_om.insert(sector, gold);
        self
    }

    pub fn with_priority(mut self, sector: Sector, rank: i32) -> Self {
        self.slot_priorities.insert(sector, rank);
        self
    }
}
