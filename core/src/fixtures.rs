//! Starting positions for tests and the headless runner.
//!
//! `demo_state` is a three-canton nation with running plants and
//! finished national gateways, so every gate has something to do from
//! the first plan turn.

use crate::{
    config::SimConfig,
    context::{CrisisFlags, ExternalContext},
    energy::{PlantKind, PlantStatus, PowerPlant},
    infrastructure::{Facility, FacilityKind},
    lifecycle::Lifecycle,
    plan::{Policies, TradeOrders, TurnPlan},
    state::{CantonEconomy, EconomyState},
    trade::TradeOrder,
    types::{Resource, Sector, TileType},
    welfare::WelfarePolicy,
};

pub const DEMO_NATION: &str = "northmark";

fn add_plant(state: &mut EconomyState, canton: &str, kind: PlantKind) {
    let id = state.next_entity_id("plt");
    state.energy.plants.insert(
        id.clone(),
        PowerPlant {
            id,
            canton: canton.to_string(),
            kind,
            status: PlantStatus::Active,
        },
    );
}

fn add_facility(state: &mut EconomyState, config: &SimConfig, canton: &str, kind: FacilityKind) {
    let max_hp = config
        .infrastructure
        .facilities
        .get(&kind)
        .map(|s| s.max_hp)
        .unwrap_or(100.0);
    let id = state.next_entity_id("fac");
    state.infrastructure.facilities.insert(
        id.clone(),
        Facility {
            id,
            kind,
            canton: canton.to_string(),
            national: true,
            lifecycle: Lifecycle::active(DEMO_NATION, max_hp),
        },
    );
}

pub fn demo_state(config: &SimConfig) -> EconomyState {
    let mut state = EconomyState::new(DEMO_NATION, config);

    state.add_canton(
        CantonEconomy::new("alder", 3)
            .with_geography(TileType::Plains, 0.6)
            .with_geography(TileType::Coast, 0.4)
            .with_capacity(Sector::Agriculture, 6)
            .with_capacity(Sector::Extraction, 2)
            .with_capacity(Sector::Industry, 4)
            .with_capacity(Sector::Luxury, 1)
            .with_capacity(Sector::Research, 1)
            .with_capacity(Sector::Logistics, 3),
    );
    state.add_canton(
        CantonEconomy::new("brook", 2)
            .with_geography(TileType::Forest, 0.7)
            .with_geography(TileType::Hills, 0.3)
            .with_capacity(Sector::Agriculture, 3)
            .with_capacity(Sector::Extraction, 4)
            .with_capacity(Sector::Industry, 2)
            .with_capacity(Sector::Luxury, 2)
            .with_capacity(Sector::Logistics, 2)
            .with_labor_access(0.9),
    );
    state.add_canton(
        CantonEconomy::new("cairn", 1)
            .with_geography(TileType::Mountains, 0.8)
            .with_geography(TileType::Tundra, 0.2)
            .with_capacity(Sector::Agriculture, 1)
            .with_capacity(Sector::Extraction, 5)
            .with_capacity(Sector::Industry, 1)
            .with_capacity(Sector::Logistics, 1)
            .with_labor_access(0.8),
    );

    for (resource, amount) in [
        (Resource::Gold, 2_000.0),
        (Resource::ForeignExchange, 300.0),
        (Resource::Food, 200.0),
        (Resource::Materials, 120.0),
        (Resource::Production, 200.0),
        (Resource::Luxury, 60.0),
        (Resource::Coal, 60.0),
        (Resource::Oil, 20.0),
        (Resource::Gas, 20.0),
    ] {
        state.stockpile.set(resource, amount);
    }

    add_plant(&mut state, "alder", PlantKind::Coal);
    add_plant(&mut state, "brook", PlantKind::Wind);
    add_plant(&mut state, "cairn", PlantKind::Hydro);

    add_facility(&mut state, config, "alder", FacilityKind::Port);
    add_facility(&mut state, config, "alder", FacilityKind::RailHub);
    add_facility(&mut state, config, "brook", FacilityKind::Airport);

    state
}

/// Rail line alder – brook – cairn. Cairn's mountains would block rail,
/// so the map service reports the pass as hills.
pub fn demo_external() -> ExternalContext {
    let mut external = ExternalContext::default();
    external
        .map
        .rail_adjacency
        .insert("alder".into(), vec!["brook".into()]);
    external
        .map
        .rail_adjacency
        .insert("brook".into(), vec!["cairn".into()]);
    external.map.terrain.insert("cairn".into(), TileType::Hills);
    external
}

/// `demo_external` with a siege on `canton`.
pub fn besieged_external(canton: &str) -> ExternalContext {
    let mut external = demo_external();
    external.crises.insert(
        canton.to_string(),
        CrisisFlags {
            siege: true,
            catastrophe: false,
        },
    );
    external
}

/// A plan that funds every demo slot, imports coal and exports food
/// through the national port.
pub fn demo_plan() -> TurnPlan {
    let mut plan = TurnPlan::default()
        .with_sector_budget(Sector::Agriculture, 40.0)
        .with_sector_budget(Sector::Extraction, 55.0)
        .with_sector_budget(Sector::Industry, 56.0)
        .with_sector_budget(Sector::Luxury, 18.0)
        .with_sector_budget(Sector::Research, 12.0)
        .with_sector_budget(Sector::Logistics, 30.0)
        .with_priority(Sector::Agriculture, 0)
        .with_priority(Sector::Logistics, 1);
    plan.budgets.military = 10.0;
    plan.budgets.welfare = 20.0;
    plan.policies = Policies {
        welfare: Some(WelfarePolicy {
            education: 1,
            healthcare: 1,
            social_support: 0,
        }),
    };
    plan.trade_orders = TradeOrders {
        imports: vec![TradeOrder {
            good: Resource::Coal,
            quantity: 10.0,
            price: 2.0,
            tariff: 0.1,
            gateway: FacilityKind::Port,
            canton: "alder".into(),
        }],
        exports: vec![TradeOrder {
            good: Resource::Food,
            quantity: 10.0,
            price: 3.0,
            tariff: 0.0,
            gateway: FacilityKind::Port,
            canton: "alder".into(),
        }],
    };
    plan
}
