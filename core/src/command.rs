use crate::{
    budget::{self, RetoolRequest},
    config::SimConfig,
    energy::{self, PlantKind},
    error::SimResult,
    infrastructure::{self, FacilityKind},
    lifecycle::Status,
    projects::{self, ProjectOrder},
    state::EconomyState,
    types::{CantonId, EntityId, NationId},
};
use serde::{Deserialize, Serialize};

/// Immediate commands issued by the session layer between turns.
/// Variants are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum EconomyCommand {
    // ── Infrastructure ────────────────────────────
    BuildFacility {
        canton: CantonId,
        kind: FacilityKind,
        #[serde(default)]
        national: bool,
    },
    Redesignate {
        id: EntityId,
    },
    ToggleFacility {
        id: EntityId,
        target: Status,
    },
    PillageFacility {
        id: EntityId,
    },
    RepairFacility {
        id: EntityId,
    },
    CaptureFacility {
        id: EntityId,
        owner: NationId,
    },
    ResumeFacility {
        id: EntityId,
    },

    // ── Energy and slots ──────────────────────────
    BuildPlant {
        canton: CantonId,
        kind: PlantKind,
    },
    SetPlantIdle {
        id: EntityId,
        idle: bool,
    },
    QueueRetool(RetoolRequest),

    // ── Projects ──────────────────────────────────
    Project(ProjectOrder),
    PillageProject {
        id: EntityId,
    },
    RepairProject {
        id: EntityId,
    },
    CaptureProject {
        id: EntityId,
        owner: NationId,
    },
}

/// What a successful command produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    /// Id of a facility, plant or project the command created.
    pub created: Option<EntityId>,
}

impl CommandOutcome {
    fn created(id: EntityId) -> Self {
        Self { created: Some(id) }
    }
}

impl EconomyCommand {
    pub fn name(&self) -> &'static str {
        match self {
            EconomyCommand::BuildFacility { .. } => "build_facility",
            EconomyCommand::Redesignate { .. } => "redesignate",
            EconomyCommand::ToggleFacility { .. } => "toggle_facility",
            EconomyCommand::PillageFacility { .. } => "pillage_facility",
            EconomyCommand::RepairFacility { .. } => "repair_facility",
            EconomyCommand::CaptureFacility { .. } => "capture_facility",
            EconomyCommand::ResumeFacility { .. } => "resume_facility",
            EconomyCommand::BuildPlant { .. } => "build_plant",
            EconomyCommand::SetPlantIdle { .. } => "set_plant_idle",
            EconomyCommand::QueueRetool(_) => "queue_retool",
            EconomyCommand::Project(order) => order.name(),
            EconomyCommand::PillageProject { .. } => "pillage_project",
            EconomyCommand::RepairProject { .. } => "repair_project",
            EconomyCommand::CaptureProject { .. } => "capture_project",
        }
    }

    /// Apply to `state`. Fails without side effects on invalid requests.
    pub fn apply(&self, state: &mut EconomyState, config: &SimConfig) -> SimResult<CommandOutcome> {
        let outcome = match self {
            EconomyCommand::BuildFacility {
                canton,
                kind,
                national,
            } => CommandOutcome::created(infrastructure::build_facility(state, config, canton, *kind, *national)?),
            EconomyCommand::Redesignate { id } => {
                infrastructure::redesignate(state, id)?;
                CommandOutcome::default()
            }
            EconomyCommand::ToggleFacility { id, target } => {
                infrastructure::toggle_facility(state, id, *target)?;
                CommandOutcome::default()
            }
            EconomyCommand::PillageFacility { id } => {
                infrastructure::pillage_facility(state, id)?;
                CommandOutcome::default()
            }
            EconomyCommand::RepairFacility { id } => {
                infrastructure::repair_facility(state, config, id)?;
                CommandOutcome::default()
            }
            EconomyCommand::CaptureFacility { id, owner } => {
                infrastructure::capture_facility(state, id, owner.clone())?;
                CommandOutcome::default()
            }
            EconomyCommand::ResumeFacility { id } => {
                infrastructure::resume_facility(state, id)?;
                CommandOutcome::default()
            }
            EconomyCommand::BuildPlant { canton, kind } => {
                CommandOutcome::created(energy::build_plant(state, config, canton, *kind)?)
            }
            EconomyCommand::SetPlantIdle { id, idle } => {
                energy::set_plant_idle(state, id, *idle)?;
                CommandOutcome::default()
            }
            EconomyCommand::QueueRetool(request) => {
                budget::queue_retool(state, config, request)?;
                CommandOutcome::default()
            }
            EconomyCommand::Project(order) => CommandOutcome {
                created: projects::apply_order(state, config, order)?,
            },
            EconomyCommand::PillageProject { id } => {
                projects::pillage_project(state, id)?;
                CommandOutcome::default()
            }
            EconomyCommand::RepairProject { id } => {
                projects::repair_project(state, &config.projects, id)?;
                CommandOutcome::default()
            }
            EconomyCommand::CaptureProject { id, owner } => {
                projects::capture_project(state, id, owner.clone())?;
                CommandOutcome::default()
            }
        };
        Ok(outcome)
    }
}
