//! Energy gate: plant supply against funded-slot demand.
//!
//! Supply is the summed base output of every active plant that can both
//! draw its fuel and pay its O&M this turn; wind and solar are scaled by
//! the renewable capacity factor. A plant that cannot run contributes
//! nothing and consumes nothing. Demand is the per-sector coefficient
//! times funded slots; idle slots draw nothing.
//!
//! When demand exceeds supply, funded counts are cut (brownouts):
//!   - uniform: every sector scaled by `min(1, supply / demand)`
//!   - essentials-first: the priority list first, then the rest uniformly
//!
//! Execution: gate 2, plan turns only.

use crate::{
    config::SimConfig,
    error::{SimError, SimResult},
    event::TurnEvent,
    finance::TurnLedger,
    gate::{TurnContext, TurnGate},
    rationing::{self, SlotDemand, SlotGrant},
    rng::GateRng,
    state::EconomyState,
    types::{CantonId, EntityId, RationingMode, Resource, Sector, Turn},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantKind {
    Coal,
    Oil,
    Gas,
    Nuclear,
    Hydro,
    Wind,
    Solar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlantStatus {
    Building { turns_remaining: u32 },
    Active,
    Idle,
}

impl fmt::Display for PlantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlantStatus::Building { .. } => f.write_str("building"),
            PlantStatus::Active => f.write_str("active"),
            PlantStatus::Idle => f.write_str("idle"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerPlant {
    pub id: EntityId,
    pub canton: CantonId,
    pub kind: PlantKind,
    pub status: PlantStatus,
}

/// A forced cut to one sector's funded slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brownout {
    pub canton: CantonId,
    pub sector: Sector,
    pub before: u32,
    pub after: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyReport {
    pub supply: f64,
    pub demand: f64,
    pub ratio: f64,
    pub plants_running: u32,
    pub brownouts: Vec<Brownout>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyState {
    pub plants: BTreeMap<EntityId, PowerPlant>,
    pub last: EnergyReport,
}

/// Run every eligible plant. Fuel is drawn from the stockpile and O&M
/// booked to the ledger only for plants that actually run.
pub fn run_plants(
    config: &SimConfig,
    state: &mut EconomyState,
    ledger: &mut TurnLedger,
) -> (f64, u32) {
    let mut supply = 0.0;
    let mut running = 0u32;
    let plant_ids: Vec<EntityId> = state
        .energy
        .plants
        .values()
        .filter(|p| p.status == PlantStatus::Active)
        .map(|p| p.id.clone())
        .collect();

    for id in plant_ids {
        let kind = state.energy.plants[&id].kind;
        let Some(spec) = config.energy.plants.get(&kind) else {
            continue;
        };
        if ledger.spendable_gold(state.treasury()) < spec.om_cost {
            continue;
        }
        if let Some(fuel) = spec.fuel {
            if !state.stockpile.has(fuel, spec.fuel_per_turn) {
                continue;
            }
            state.stockpile.add(fuel, -spec.fuel_per_turn);
        }
        ledger.book_expense("plant_om", spec.om_cost);

        let factor = if spec.renewable {
            config.energy.renewable_capacity_factor
        } else {
            1.0
        };
        supply += spec.base_output * factor;
        running += 1;
    }
    (supply, running)
}

/// Energy demand of every funded slot.
pub fn slot_demands(config: &SimConfig, state: &EconomyState) -> Vec<SlotDemand> {
    state
        .cantons
        .values()
        .flat_map(|canton| {
            canton
                .sectors
                .iter()
                .filter(|(_, s)| s.funded > 0)
                .map(|(sector, s)| SlotDemand {
                    canton: canton.id.clone(),
                    sector: *sector,
                    slots: s.funded,
                    per_slot: config.energy.demand_per_slot(*sector),
                })
        })
        .collect()
}

/// Scale funded slots under scarcity and return the grants.
pub fn ration(
    demands: &[SlotDemand],
    supply: f64,
    mode: RationingMode,
    essentials: &[Sector],
) -> Vec<SlotGrant> {
    let total: f64 = demands.iter().map(SlotDemand::total).sum();
    match mode {
        RationingMode::Uniform => rationing::uniform(demands, rationing::ratio(supply, total)),
        RationingMode::EssentialsFirst => {
            let (mut grants, remaining) = rationing::essentials_first(demands, supply, essentials);
            let rest = rationing::outside_priority(demands, essentials);
            let rest_total: f64 = rest.iter().map(SlotDemand::total).sum();
            grants.extend(rationing::uniform(&rest, rationing::ratio(remaining, rest_total)));
            grants
        }
    }
}

pub fn build_plant(
    state: &mut EconomyState,
    config: &SimConfig,
    canton: &str,
    kind: PlantKind,
) -> SimResult<EntityId> {
    state.canton(canton)?;
    let spec = config
        .energy
        .plants
        .get(&kind)
        .ok_or_else(|| anyhow::anyhow!("no plant spec for {kind:?}"))?;
    state.stockpile.try_spend(Resource::Production, spec.build_production)?;

    let id = state.next_entity_id("plt");
    state.energy.plants.insert(
        id.clone(),
        PowerPlant {
            id: id.clone(),
            canton: canton.to_string(),
            kind,
            status: PlantStatus::Building {
                turns_remaining: spec.build_turns,
            },
        },
    );
    Ok(id)
}

pub fn set_plant_idle(state: &mut EconomyState, id: &str, idle: bool) -> SimResult<()> {
    let plant = state
        .energy
        .plants
        .get_mut(id)
        .ok_or_else(|| SimError::UnknownPlant { id: id.to_string() })?;
    if let PlantStatus::Building { .. } = plant.status {
        return Err(SimError::InvalidTransition {
            id: id.to_string(),
            status: plant.status.to_string(),
            action: if idle { "idle" } else { "activate" },
        });
    }
    plant.status = if idle { PlantStatus::Idle } else { PlantStatus::Active };
    Ok(())
}

/// Cleanup step: count construction down; finished plants come online.
pub fn advance_plants(state: &mut EconomyState, turn: Turn) -> Vec<TurnEvent> {
    let mut events = Vec::new();
    for plant in state.energy.plants.values_mut() {
        if let PlantStatus::Building { turns_remaining } = plant.status {
            let left = turns_remaining.saturating_sub(1);
            plant.status = if left == 0 {
                events.push(TurnEvent::PlantOnline {
                    turn,
                    id: plant.id.clone(),
                    canton: plant.canton.clone(),
                });
                PlantStatus::Active
            } else {
                PlantStatus::Building { turns_remaining: left }
            };
        }
    }
    events
}

pub struct EnergyGate {
    config: Arc<SimConfig>,
}

impl EnergyGate {
    pub fn new(config: Arc<SimConfig>) -> Self {
        Self { config }
    }
}

impl TurnGate for EnergyGate {
    fn name(&self) -> &'static str {
        "energy"
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
        let (mode, essentials) = match &turn.plan {
            Some(plan) => (
                plan.rationing.energy,
                plan.rationing
                    .essentials
                    .clone()
                    .unwrap_or_else(|| self.config.energy.essentials.clone()),
            ),
            None => (RationingMode::Uniform, self.config.energy.essentials.clone()),
        };

        let (supply, plants_running) = run_plants(&self.config, state, &mut turn.ledger);
        let demands = slot_demands(&self.config, state);
        let demand: f64 = demands.iter().map(SlotDemand::total).sum();
        let ratio = rationing::ratio(supply, demand);

        let mut brownouts = Vec::new();
        if demand > supply {
            for grant in ration(&demands, supply, mode, &essentials) {
                if !grant.was_cut() {
                    continue;
                }
                if let Some(canton) = state.cantons.get_mut(&grant.canton) {
                    canton.sector_mut(grant.sector).set_funded(grant.after);
                    canton.brownout = true;
                }
                turn.emit(TurnEvent::Brownout {
                    turn: turn.turn,
                    canton: grant.canton.clone(),
                    sector: grant.sector,
                    before: grant.before,
                    after: grant.after,
                });
                brownouts.push(Brownout {
                    canton: grant.canton,
                    sector: grant.sector,
                    before: grant.before,
                    after: grant.after,
                });
            }
            log::warn!(
                "turn={} energy: shortage supply={:.1} demand={:.1} ratio={:.3} brownouts={}",
                turn.turn,
                supply,
                demand,
                ratio,
                brownouts.len()
            );
            turn.emit(TurnEvent::EnergyShortage {
                turn: turn.turn,
                supply,
                demand,
                ratio,
            });
        } else {
            log::debug!(
                "turn={} energy: supply={:.1} demand={:.1} plants={}",
                turn.turn,
                supply,
                demand,
                plants_running
            );
        }

        state.stockpile.set(Resource::Energy, (supply - demand).max(0.0));
        state.energy.last = EnergyReport {
            supply,
            demand,
            ratio,
            plants_running,
            brownouts,
        };
        Ok(())
    }
}
