//! Capital projects: catalogue builds with the shared lifecycle.
//!
//! Starting a project pays its whole catalogue cost up front. Cancelling
//! refunds a quarter of the production and half of any strategic fuel
//! it consumed, then removes the record. Active projects cost O&M and
//! yield their catalogue resources every turn.

use crate::{
    config::{ProjectCatalog, SimConfig},
    error::{SimError, SimResult},
    event::TurnEvent,
    lifecycle::{Lifecycle, Status, Transition},
    state::EconomyState,
    types::{CantonId, EntityId, NationId, Resource, Turn},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Project command carried in a plan or issued directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "order", rename_all = "snake_case")]
pub enum ProjectOrder {
    Start { kind: String, canton: CantonId },
    Suspend { id: EntityId },
    Resume { id: EntityId },
    Cancel { id: EntityId },
    Toggle { id: EntityId, target: Status },
}

impl ProjectOrder {
    pub fn name(&self) -> &'static str {
        match self {
            ProjectOrder::Start { .. } => "project_start",
            ProjectOrder::Suspend { .. } => "project_suspend",
            ProjectOrder::Resume { .. } => "project_resume",
            ProjectOrder::Cancel { .. } => "project_cancel",
            ProjectOrder::Toggle { .. } => "project_toggle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: EntityId,
    pub kind: String,
    pub canton: CantonId,
    pub lifecycle: Lifecycle,
    /// What was paid to start it; the basis for cancel refunds.
    pub cost: BTreeMap<Resource, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectsState {
    pub projects: BTreeMap<EntityId, Project>,
}

impl ProjectsState {
    pub fn get(&self, id: &str) -> SimResult<&Project> {
        self.projects
            .get(id)
            .ok_or_else(|| SimError::UnknownProject { id: id.to_string() })
    }

    pub fn get_mut(&mut self, id: &str) -> SimResult<&mut Project> {
        self.projects
            .get_mut(id)
            .ok_or_else(|| SimError::UnknownProject { id: id.to_string() })
    }
}

/// Check an order against the current registry without applying it.
pub fn validate(state: &EconomyState, catalog: &ProjectCatalog, order: &ProjectOrder) -> SimResult<()> {
    match order {
        ProjectOrder::Start { kind, canton } => {
            if !catalog.kinds.contains_key(kind) {
                return Err(SimError::UnknownProjectKind { kind: kind.clone() });
            }
            state.canton(canton).map(|_| ())
        }
        ProjectOrder::Suspend { id }
        | ProjectOrder::Resume { id }
        | ProjectOrder::Cancel { id }
        | ProjectOrder::Toggle { id, .. } => state.projects.get(id).map(|_| ()),
    }
}

pub fn start_project(state: &mut EconomyState, catalog: &ProjectCatalog, kind: &str, canton: &str) -> SimResult<EntityId> {
    state.canton(canton)?;
    let spec = catalog
        .kinds
        .get(kind)
        .ok_or_else(|| SimError::UnknownProjectKind { kind: kind.to_string() })?;
    state.stockpile.try_spend_all(&spec.cost)?;

    let id = state.next_entity_id("prj");
    let owner = state.nation_id.clone();
    state.projects.projects.insert(
        id.clone(),
        Project {
            id: id.clone(),
            kind: kind.to_string(),
            canton: canton.to_string(),
            lifecycle: Lifecycle::building(owner, spec.build_turns, spec.max_hp),
            cost: spec.cost.clone(),
        },
    );
    Ok(id)
}

/// Remove the project and return the refund that was credited.
pub fn cancel_project(state: &mut EconomyState, catalog: &ProjectCatalog, id: &str) -> SimResult<BTreeMap<Resource, f64>> {
    let project = state
        .projects
        .projects
        .remove(id)
        .ok_or_else(|| SimError::UnknownProject { id: id.to_string() })?;

    let mut refund = BTreeMap::new();
    for (&resource, &paid) in &project.cost {
        let fraction = if resource == Resource::Production {
            catalog.cancel_production_refund
        } else if resource.is_strategic() {
            catalog.cancel_strategic_refund
        } else {
            0.0
        };
        if fraction > 0.0 {
            state.stockpile.add(resource, paid * fraction);
            refund.insert(resource, paid * fraction);
        }
    }
    Ok(refund)
}

/// Apply one order. Returns the new id for `Start`.
pub fn apply_order(state: &mut EconomyState, config: &SimConfig, order: &ProjectOrder) -> SimResult<Option<EntityId>> {
    let catalog = &config.projects;
    match order {
        ProjectOrder::Start { kind, canton } => start_project(state, catalog, kind, canton).map(Some),
        ProjectOrder::Suspend { id } => state.projects.get_mut(id)?.lifecycle.suspend(id).map(|_| None),
        ProjectOrder::Resume { id } => state.projects.get_mut(id)?.lifecycle.resume(id).map(|_| None),
        ProjectOrder::Cancel { id } => cancel_project(state, catalog, id).map(|_| None),
        ProjectOrder::Toggle { id, target } => state
            .projects
            .get_mut(id)?
            .lifecycle
            .request_toggle(id, *target)
            .map(|_| None),
    }
}

pub fn pillage_project(state: &mut EconomyState, id: &str) -> SimResult<()> {
    state.projects.get_mut(id)?.lifecycle.pillage();
    Ok(())
}

pub fn repair_project(state: &mut EconomyState, catalog: &ProjectCatalog, id: &str) -> SimResult<()> {
    let project = state
        .projects
        .projects
        .get_mut(id)
        .ok_or_else(|| SimError::UnknownProject { id: id.to_string() })?;
    project
        .lifecycle
        .repair(id, &mut state.stockpile, catalog.repair_production)
}

pub fn capture_project(state: &mut EconomyState, id: &str, owner: impl Into<NationId>) -> SimResult<()> {
    state.projects.get_mut(id)?.lifecycle.capture(owner);
    Ok(())
}

fn running<'a>(state: &'a EconomyState) -> impl Iterator<Item = &'a Project> + 'a {
    state
        .projects
        .projects
        .values()
        .filter(move |p| p.lifecycle.is_owned_by(&state.nation_id) && p.lifecycle.is_operational())
}

pub fn upkeep(state: &EconomyState, catalog: &ProjectCatalog) -> f64 {
    running(state)
        .filter_map(|p| catalog.kinds.get(&p.kind))
        .map(|spec| spec.om_cost)
        .sum()
}

/// Summed per-turn yields of every running project.
pub fn yields(state: &EconomyState, catalog: &ProjectCatalog) -> BTreeMap<Resource, f64> {
    let mut total = BTreeMap::new();
    for spec in running(state).filter_map(|p| catalog.kinds.get(&p.kind)) {
        for (&resource, &amount) in &spec.yields {
            *total.entry(resource).or_insert(0.0) += amount;
        }
    }
    total
}

pub fn advance_projects(state: &mut EconomyState, turn: Turn) -> Vec<TurnEvent> {
    let mut events = Vec::new();
    for project in state.projects.projects.values_mut() {
        match project.lifecycle.advance() {
            Some(Transition::Completed) => events.push(TurnEvent::ProjectComplete {
                turn,
                id: project.id.clone(),
                canton: project.canton.clone(),
            }),
            Some(Transition::Toggled(status)) => events.push(TurnEvent::StatusChanged {
                turn,
                id: project.id.clone(),
                status: status.to_string(),
            }),
            None => {}
        }
    }
    events
}
