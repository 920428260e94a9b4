//! Labor gate: generates pools, assigns them to funded slots, feeds
//! the workforce.
//!
//! Generation: each canton's pool is the table row for its urbanization
//! level, with the active welfare labor-mix shift moving a percentage
//! of the pool out of general labor, two parts to skilled for every one
//! to specialist. No class may exceed the configured share of the pool.
//!
//! Assignment is computed as a plan before any sector is touched. Funded
//! sectors are served in order of plan priority rank, then higher
//! suitability percent, then sector name. Each draws its labor class
//! from the canton's single pool; what it cannot fill is defunded.
//! Effective labor is the assigned count scaled down by the Labor
//! Access Index (floored).
//!
//! Consumption: one food and one luxury per effective worker. Shortfalls
//! set the canton's shortage flags; they never block operation.
//!
//! Execution: gate 4, plan turns only.

use crate::{
    config::{LaborConfig, SimConfig},
    error::SimResult,
    event::TurnEvent,
    gate::{TurnContext, TurnGate},
    plan::TurnPlan,
    rng::GateRng,
    state::{CantonEconomy, EconomyState, LaborPool, SectorLabor},
    suitability::{self, SuitabilityProfile},
    types::{LaborClass, Resource, Sector},
    welfare,
};
use std::cmp::Reverse;
use std::sync::Arc;

/// Pool for one canton at `urbanization_level` after a labor-mix shift
/// of `shift_pp` percentage points.
pub fn generate_pool(config: &LaborConfig, urbanization_level: u8, shift_pp: f64) -> LaborPool {
    let index = usize::from(urbanization_level.clamp(1, 12) - 1);
    let Some(row) = config.pools_by_ul.get(index).or(config.pools_by_ul.last()) else {
        return LaborPool::default();
    };
    let total = row.general + row.skilled + row.specialist;
    let transfer = ((f64::from(total) * shift_pp.max(0.0) / 100.0).floor() as u32).min(row.general);
    let to_skilled = ((f64::from(transfer) * config.skilled_transfer_share.clamp(0.0, 1.0)).round() as u32).min(transfer);
    let to_specialist = transfer - to_skilled;

    let cap = (f64::from(total) * config.max_class_share).floor() as u32;
    let skilled = (row.skilled + to_skilled).min(cap);
    let specialist = (row.specialist + to_specialist).min(cap);
    LaborPool {
        general: total - skilled - specialist,
        skilled,
        specialist,
    }
}

/// Workers the nation will field next turn: every canton's pool at its
/// staged urbanization level. A labor-mix shift moves workers between
/// classes without changing the total.
pub fn projected_workforce(config: &LaborConfig, state: &EconomyState, shift_pp: f64) -> u32 {
    state
        .cantons
        .values()
        .map(|c| generate_pool(config, c.next_urbanization_level(), shift_pp).total())
        .sum()
}

/// One line of the assignment plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub sector: Sector,
    pub class: LaborClass,
    pub demand: u32,
    pub assigned: u32,
}

impl Assignment {
    pub fn unmet(&self) -> u32 {
        self.demand - self.assigned
    }
}

/// Serving order for a canton's funded sectors.
pub fn assignment_order(canton: &CantonEconomy, plan: &TurnPlan, profile: &SuitabilityProfile) -> Vec<Sector> {
    let mut sectors: Vec<Sector> = canton
        .sectors
        .iter()
        .filter(|(_, s)| s.funded > 0)
        .map(|(sector, _)| *sector)
        .collect();
    sectors.sort_by_key(|s| (plan.priority_of(*s), Reverse(profile.percent(*s)), s.as_str()));
    sectors
}

/// Draw from a copy of the pool in serving order. Nothing is mutated.
pub fn plan_assignment(canton: &CantonEconomy, pool: LaborPool, order: &[Sector]) -> Vec<Assignment> {
    let mut remaining = pool;
    order
        .iter()
        .map(|&sector| {
            let class = sector.labor_class();
            let demand = canton.sector(sector).funded;
            let free = remaining.get_mut(class);
            let assigned = demand.min(*free);
            *free -= assigned;
            Assignment {
                sector,
                class,
                demand,
                assigned,
            }
        })
        .collect()
}

pub fn effective(assigned: u32, labor_access_index: f64) -> u32 {
    (f64::from(assigned) * labor_access_index.clamp(0.0, 1.0)).floor() as u32
}

pub struct LaborGate {
    config: Arc<SimConfig>,
}

impl LaborGate {
    pub fn new(config: Arc<SimConfig>) -> Self {
        Self { config }
    }
}

impl TurnGate for LaborGate {
    fn name(&self) -> &'static str {
        "labor"
    }

    fn requires_plan(&self) -> bool {
        true
    }

    fn resolve(
        &mut self,
        state: &mut EconomyState,
        turn: &mut TurnContext<'_>,
        _rng: &mut GateRng,
    ) -> SimResult<()> {
        let plan = turn.plan.clone().unwrap_or_default();
        let shift = welfare::modifiers(&self.config.welfare, &state.welfare.current()).labor_shift_pp;

        let mut pooled = 0u32;
        let mut consumers: Vec<(String, u32)> = Vec::new();
        for canton in state.cantons.values_mut() {
            let pool = generate_pool(&self.config.labor, canton.urbanization_level(), shift);
            let profile = suitability::cached_profile(&self.config.suitability, canton);
            let order = assignment_order(canton, &plan, &profile);
            let assignments = plan_assignment(canton, pool, &order);

            canton.labor_pool = pool;
            canton.labor.clear();
            for a in &assignments {
                let worked = effective(a.assigned, canton.labor_access_index);
                if a.unmet() > 0 {
                    turn.events.push(TurnEvent::LaborShortfall {
                        turn: turn.turn,
                        canton: canton.id.clone(),
                        sector: a.sector,
                        unmet: a.unmet(),
                    });
                }
                let slots = canton.sector_mut(a.sector);
                if a.unmet() > 0 {
                    slots.set_funded(a.assigned);
                }
                slots.utilization = worked.min(slots.funded);
                canton.labor.insert(
                    a.sector,
                    SectorLabor {
                        demand: a.demand,
                        assigned: a.assigned,
                        effective: worked,
                    },
                );
            }
            pooled += pool.total();
            consumers.push((canton.id.clone(), canton.effective_labor()));
        }

        for (id, workers) in consumers {
            let need = f64::from(workers);
            let food = state.stockpile.take_up_to(Resource::Food, need);
            let luxury = state.stockpile.take_up_to(Resource::Luxury, need);
            let Some(canton) = state.cantons.get_mut(&id) else {
                continue;
            };
            canton.shortages.food = food < need;
            canton.shortages.luxury = luxury < need;
            for (resource, got) in [(Resource::Food, food), (Resource::Luxury, luxury)] {
                if got < need {
                    turn.emit(TurnEvent::ResourceShortage {
                        turn: turn.turn,
                        canton: id.clone(),
                        resource,
                        shortfall: need - got,
                    });
                }
            }
        }

        state.stockpile.set(Resource::Labor, f64::from(pooled));
        log::debug!(
            "turn={} labor: pool={} effective={} shift_pp={:.1}",
            turn.turn,
            pooled,
            state.cantons.values().map(CantonEconomy::effective_labor).sum::<u32>(),
            shift
        );
        Ok(())
    }
}
