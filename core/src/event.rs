//! Turn events: the record of what each stage did.
//!
//! RULE: Stages report through events; the orchestrator collects them
//! in stage order. The external broadcaster diffs snapshots on its own,
//! so events are for observability and tests, never for control flow
//! between stages.

use crate::types::{CantonId, EntityId, Resource, Sector, TransportMode, Turn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    // ── Orchestrator ───────────────────────────────
    TurnStarted {
        turn: Turn,
    },
    TurnCompleted {
        turn: Turn,
    },
    PlanMissing {
        turn: Turn,
    },
    CommandRejected {
        turn: Turn,
        command: String,
        reason: String,
    },

    // ── Carryover ──────────────────────────────────
    RetoolCompleted {
        turn: Turn,
        canton: CantonId,
        from: Sector,
        to: Sector,
        slots: u32,
    },
    ShipmentArrived {
        turn: Turn,
        good: Resource,
        quantity: f64,
        import: bool,
    },

    // ── Gates ──────────────────────────────────────
    Brownout {
        turn: Turn,
        canton: CantonId,
        sector: Sector,
        before: u32,
        after: u32,
    },
    EnergyShortage {
        turn: Turn,
        supply: f64,
        demand: f64,
        ratio: f64,
    },
    LogisticsRationed {
        turn: Turn,
        supply: f64,
        demand: f64,
        ratio: f64,
    },
    ShipmentQueued {
        turn: Turn,
        good: Resource,
        quantity: f64,
        mode: TransportMode,
        hops: u32,
    },
    ShipmentStranded {
        turn: Turn,
        canton: CantonId,
        good: Resource,
    },
    LaborShortfall {
        turn: Turn,
        canton: CantonId,
        sector: Sector,
        unmet: u32,
    },
    ResourceShortage {
        turn: Turn,
        canton: CantonId,
        resource: Resource,
        shortfall: f64,
    },

    // ── Finance / development ──────────────────────
    Borrowed {
        turn: Turn,
        amount: f64,
    },
    Defaulted {
        turn: Turn,
        debt: f64,
        treasury: f64,
    },
    UrbanizationChanged {
        turn: Turn,
        canton: CantonId,
        from: u8,
        to: u8,
    },

    // ── Lifecycle ──────────────────────────────────
    InfrastructureComplete {
        turn: Turn,
        id: EntityId,
        canton: CantonId,
    },
    ProjectComplete {
        turn: Turn,
        id: EntityId,
        canton: CantonId,
    },
    PlantOnline {
        turn: Turn,
        id: EntityId,
        canton: CantonId,
    },
    StatusChanged {
        turn: Turn,
        id: EntityId,
        status: String,
    },
}

impl TurnEvent {
    /// Stable name used in logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            TurnEvent::TurnStarted { .. } => "turn_started",
            TurnEvent::TurnCompleted { .. } => "turn_completed",
            TurnEvent::PlanMissing { .. } => "plan_missing",
            TurnEvent::CommandRejected { .. } => "command_rejected",
            TurnEvent::RetoolCompleted { .. } => "retool_completed",
            TurnEvent::ShipmentArrived { .. } => "shipment_arrived",
            TurnEvent::Brownout { .. } => "brownout",
            TurnEvent::EnergyShortage { .. } => "energy_shortage",
            TurnEvent::LogisticsRationed { .. } => "logistics_rationed",
            TurnEvent::ShipmentQueued { .. } => "shipment_queued",
            TurnEvent::ShipmentStranded { .. } => "shipment_stranded",
            TurnEvent::LaborShortfall { .. } => "labor_shortfall",
            TurnEvent::ResourceShortage { .. } => "resource_shortage",
            TurnEvent::Borrowed { .. } => "borrowed",
            TurnEvent::Defaulted { .. } => "resource_default",
            TurnEvent::UrbanizationChanged { .. } => "ul_change",
            TurnEvent::InfrastructureComplete { .. } => "infrastructure_complete",
            TurnEvent::ProjectComplete { .. } => "project_complete",
            TurnEvent::PlantOnline { .. } => "plant_online",
            TurnEvent::StatusChanged { .. } => "status_changed",
        }
    }
}

/// Compact per-turn outcome, kept on the state as `last_summary`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnSummary {
    pub turn: Turn,
    pub plan_executed: bool,
    pub energy_ratio: f64,
    pub lp_ratio: f64,
    pub brownouts: usize,
    pub shortages: usize,
    pub revenues: f64,
    pub expenditures: f64,
    pub net_borrowing: f64,
    pub interest: f64,
    pub defaulted: bool,
    pub ul_changes: usize,
    pub treasury: f64,
    pub debt: f64,
}
