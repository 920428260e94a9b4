//! Infrastructure engine: airports, ports and rail hubs.
//!
//! Each nation designates at most one national facility per kind. The
//! national flag carries the cost multipliers (build ×1.5, O&M ×2) and
//! anchors the connectivity graph the logistics gate reads:
//!   - air:  0 hops at the national airport, 1 at any other airport
//!   - sea:  BFS from the national port over nearest-neighbour port links
//!   - rail: BFS from the national rail hub over passable land adjacency
//!
//! Only operational facilities owned by the nation count. Captured
//! facilities stay in the registry under their new owner and drop out
//! of connectivity and upkeep.

use crate::{
    config::{InfrastructureConfig, SimConfig},
    context::ExternalContext,
    error::{SimError, SimResult},
    event::TurnEvent,
    lifecycle::{Lifecycle, Status, Transition},
    state::EconomyState,
    types::{CantonId, EntityId, NationId, Resource, TransportMode, Turn},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityKind {
    Airport,
    Port,
    RailHub,
}

impl fmt::Display for FacilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FacilityKind::Airport => "airport",
            FacilityKind::Port => "port",
            FacilityKind::RailHub => "rail_hub",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: EntityId,
    pub kind: FacilityKind,
    pub canton: CantonId,
    pub national: bool,
    pub lifecycle: Lifecycle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfrastructureState {
    pub facilities: BTreeMap<EntityId, Facility>,
}

impl InfrastructureState {
    pub fn national(&self, kind: FacilityKind) -> Option<&Facility> {
        self.facilities.values().find(|f| f.kind == kind && f.national)
    }

    pub fn get(&self, id: &str) -> SimResult<&Facility> {
        self.facilities
            .get(id)
            .ok_or_else(|| SimError::UnknownFacility { id: id.to_string() })
    }

    pub fn get_mut(&mut self, id: &str) -> SimResult<&mut Facility> {
        self.facilities
            .get_mut(id)
            .ok_or_else(|| SimError::UnknownFacility { id: id.to_string() })
    }

    /// Operational facilities of `kind` owned by `nation`.
    pub fn operational<'a>(&'a self, nation: &'a str, kind: FacilityKind) -> impl Iterator<Item = &'a Facility> + 'a {
        self.facilities
            .values()
            .filter(move |f| f.kind == kind && f.lifecycle.is_owned_by(nation) && f.lifecycle.is_operational())
    }

    /// The national facility of `kind`, if the nation owns it and it runs.
    pub fn operational_national(&self, nation: &str, kind: FacilityKind) -> Option<&Facility> {
        self.national(kind)
            .filter(|f| f.lifecycle.is_owned_by(nation) && f.lifecycle.is_operational())
    }
}

// ── Commands ───────────────────────────────────────────────────────

fn national_multiplier(config: &InfrastructureConfig, national: bool) -> f64 {
    if national {
        config.national_build_multiplier
    } else {
        1.0
    }
}

pub fn build_facility(
    state: &mut EconomyState,
    config: &SimConfig,
    canton: &str,
    kind: FacilityKind,
    national: bool,
) -> SimResult<EntityId> {
    let infra = &config.infrastructure;
    let coastal = state.canton(canton)?.is_coastal();
    if kind == FacilityKind::Port && !coastal {
        return Err(SimError::NotCoastal { canton: canton.to_string() });
    }

    let nation = state.nation_id.clone();
    if state
        .infrastructure
        .facilities
        .values()
        .any(|f| f.kind == kind && f.canton == canton && f.lifecycle.is_owned_by(&nation))
    {
        return Err(SimError::FacilityExists {
            kind: kind.to_string(),
            canton: canton.to_string(),
        });
    }
    if national {
        if let Some(existing) = state.infrastructure.national(kind) {
            return Err(SimError::DuplicateNational {
                kind: kind.to_string(),
                existing: existing.id.clone(),
            });
        }
    }

    let spec = infra
        .facilities
        .get(&kind)
        .ok_or_else(|| anyhow::anyhow!("no facility spec for {kind}"))?;
    let multiplier = national_multiplier(infra, national);
    let bill: BTreeMap<Resource, f64> = [
        (Resource::Production, spec.build_production * multiplier),
        (Resource::Gold, spec.build_gold * multiplier),
    ]
    .into();
    state.stockpile.try_spend_all(&bill)?;

    let id = state.next_entity_id("fac");
    state.infrastructure.facilities.insert(
        id.clone(),
        Facility {
            id: id.clone(),
            kind,
            canton: canton.to_string(),
            national,
            lifecycle: Lifecycle::building(nation, spec.build_turns, spec.max_hp),
        },
    );
    log::debug!(
        "turn={} infrastructure: {id} {kind} started in {canton} national={national}",
        state.turn
    );
    Ok(id)
}

/// Move the national flag for the facility's kind onto `id`.
pub fn redesignate(state: &mut EconomyState, id: &str) -> SimResult<()> {
    let nation = state.nation_id.clone();
    let facility = state.infrastructure.get(id)?;
    if !facility.lifecycle.is_owned_by(&nation) {
        return Err(SimError::InvalidTransition {
            id: id.to_string(),
            status: format!("owned by {}", facility.lifecycle.owner),
            action: "redesignate",
        });
    }
    let kind = facility.kind;
    for f in state.infrastructure.facilities.values_mut() {
        if f.kind == kind {
            f.national = f.id == id;
        }
    }
    Ok(())
}

pub fn toggle_facility(state: &mut EconomyState, id: &str, target: Status) -> SimResult<()> {
    state.infrastructure.get_mut(id)?.lifecycle.request_toggle(id, target)
}

pub fn pillage_facility(state: &mut EconomyState, id: &str) -> SimResult<()> {
    state.infrastructure.get_mut(id)?.lifecycle.pillage();
    Ok(())
}

pub fn repair_facility(state: &mut EconomyState, config: &SimConfig, id: &str) -> SimResult<()> {
    let facility = state
        .infrastructure
        .facilities
        .get_mut(id)
        .ok_or_else(|| SimError::UnknownFacility { id: id.to_string() })?;
    facility
        .lifecycle
        .repair(id, &mut state.stockpile, config.infrastructure.repair_production)
}

/// Hand the facility to `owner`. A captured national facility loses
/// its designation.
pub fn capture_facility(state: &mut EconomyState, id: &str, owner: impl Into<NationId>) -> SimResult<()> {
    let owner = owner.into();
    let nation = state.nation_id.clone();
    let facility = state.infrastructure.get_mut(id)?;
    facility.lifecycle.capture(owner.clone());
    if owner != nation {
        facility.national = false;
    }
    Ok(())
}

pub fn resume_facility(state: &mut EconomyState, id: &str) -> SimResult<()> {
    state.infrastructure.get_mut(id)?.lifecycle.resume(id)
}

/// Gold O&M for every active facility the nation owns.
pub fn upkeep(state: &EconomyState, config: &InfrastructureConfig) -> f64 {
    state
        .infrastructure
        .facilities
        .values()
        .filter(|f| f.lifecycle.is_owned_by(&state.nation_id) && f.lifecycle.status == Status::Active)
        .map(|f| {
            let om = config.facilities.get(&f.kind).map(|s| s.om_cost).unwrap_or(0.0);
            if f.national {
                om * config.national_om_multiplier
            } else {
                om
            }
        })
        .sum()
}

/// Cleanup step for every facility.
pub fn advance_facilities(state: &mut EconomyState, turn: Turn) -> Vec<TurnEvent> {
    let mut events = Vec::new();
    for facility in state.infrastructure.facilities.values_mut() {
        match facility.lifecycle.advance() {
            Some(Transition::Completed) => events.push(TurnEvent::InfrastructureComplete {
                turn,
                id: facility.id.clone(),
                canton: facility.canton.clone(),
            }),
            Some(Transition::Toggled(status)) => events.push(TurnEvent::StatusChanged {
                turn,
                id: facility.id.clone(),
                status: status.to_string(),
            }),
            None => {}
        }
    }
    events
}

// ── Connectivity ───────────────────────────────────────────────────

/// Hop counts per mode per reachable canton. Absent means unreachable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Connectivity {
    pub hops: BTreeMap<TransportMode, BTreeMap<CantonId, u32>>,
}

impl Connectivity {
    pub fn hops(&self, mode: TransportMode, canton: &str) -> Option<u32> {
        self.hops.get(&mode).and_then(|m| m.get(canton)).copied()
    }

    pub fn reachable(&self, mode: TransportMode) -> usize {
        self.hops.get(&mode).map(BTreeMap::len).unwrap_or(0)
    }
}

fn bfs(origin: &str, edges: &BTreeMap<CantonId, BTreeSet<CantonId>>) -> BTreeMap<CantonId, u32> {
    let mut hops = BTreeMap::from([(origin.to_string(), 0u32)]);
    let mut queue = VecDeque::from([origin.to_string()]);
    while let Some(current) = queue.pop_front() {
        let depth = hops[&current];
        for next in edges.get(&current).into_iter().flatten() {
            if !hops.contains_key(next) {
                hops.insert(next.clone(), depth + 1);
                queue.push_back(next.clone());
            }
        }
    }
    hops
}

fn air_hops(state: &EconomyState) -> BTreeMap<CantonId, u32> {
    let nation = state.nation_id.as_str();
    let Some(hub) = state.infrastructure.operational_national(nation, FacilityKind::Airport) else {
        return BTreeMap::new();
    };
    let mut hops: BTreeMap<CantonId, u32> = state
        .infrastructure
        .operational(nation, FacilityKind::Airport)
        .map(|f| (f.canton.clone(), 1))
        .collect();
    hops.insert(hub.canton.clone(), 0);
    hops
}

/// Each port links to its nearest `port_neighbours` ports within the
/// edge cap; ties go to the lower canton id. Links are undirected.
pub fn port_graph(
    ports: &BTreeSet<CantonId>,
    external: &ExternalContext,
    config: &InfrastructureConfig,
) -> BTreeMap<CantonId, BTreeSet<CantonId>> {
    let mut edges: BTreeMap<CantonId, BTreeSet<CantonId>> = BTreeMap::new();
    for port in ports {
        let mut candidates: Vec<(f64, &CantonId)> = ports
            .iter()
            .filter(|other| *other != port)
            .filter_map(|other| {
                external
                    .map
                    .port_distance(port, other)
                    .filter(|d| *d <= config.port_max_edge_distance)
                    .map(|d| (d, other))
            })
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));
        for (_, other) in candidates.into_iter().take(config.port_neighbours) {
            edges.entry(port.clone()).or_default().insert(other.clone());
            edges.entry(other.clone()).or_default().insert(port.clone());
        }
    }
    edges
}

fn sea_hops(state: &EconomyState, config: &InfrastructureConfig, external: &ExternalContext) -> BTreeMap<CantonId, u32> {
    let nation = state.nation_id.as_str();
    let Some(hub) = state.infrastructure.operational_national(nation, FacilityKind::Port) else {
        return BTreeMap::new();
    };
    let ports: BTreeSet<CantonId> = state
        .infrastructure
        .operational(nation, FacilityKind::Port)
        .map(|f| f.canton.clone())
        .collect();
    bfs(&hub.canton, &port_graph(&ports, external, config))
}

fn rail_hops(state: &EconomyState, config: &InfrastructureConfig, external: &ExternalContext) -> BTreeMap<CantonId, u32> {
    let nation = state.nation_id.as_str();
    let Some(hub) = state.infrastructure.operational_national(nation, FacilityKind::RailHub) else {
        return BTreeMap::new();
    };
    let passable = |id: &str| -> bool {
        let Some(canton) = state.cantons.get(id) else {
            return false;
        };
        let terrain = external
            .map
            .terrain
            .get(id)
            .copied()
            .or_else(|| canton.dominant_terrain());
        !terrain.is_some_and(|t| config.rail_impassable.contains(&t))
    };

    let mut edges: BTreeMap<CantonId, BTreeSet<CantonId>> = BTreeMap::new();
    for (from, neighbours) in &external.map.rail_adjacency {
        for to in neighbours {
            let from_ok = from == &hub.canton || passable(from);
            let to_ok = to == &hub.canton || passable(to);
            if from_ok && to_ok && state.cantons.contains_key(from) && state.cantons.contains_key(to) {
                edges.entry(from.clone()).or_default().insert(to.clone());
                edges.entry(to.clone()).or_default().insert(from.clone());
            }
        }
    }
    bfs(&hub.canton, &edges)
}

/// Connectivity for this turn, computed before the gates run.
pub fn compute_connectivity(state: &EconomyState, config: &SimConfig, external: &ExternalContext) -> Connectivity {
    let infra = &config.infrastructure;
    let connectivity = Connectivity {
        hops: [
            (TransportMode::Rail, rail_hops(state, infra, external)),
            (TransportMode::Sea, sea_hops(state, infra, external)),
            (TransportMode::Air, air_hops(state)),
        ]
        .into(),
    };
    log::debug!(
        "turn={} connectivity: rail={} sea={} air={}",
        state.turn,
        connectivity.reachable(TransportMode::Rail),
        connectivity.reachable(TransportMode::Sea),
        connectivity.reachable(TransportMode::Air)
    );
    connectivity
}
