use crate::types::{CantonId, EntityId, Resource, Sector};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown canton '{canton}'")]
    UnknownCanton { canton: CantonId },

    #[error("Unknown facility '{id}'")]
    UnknownFacility { id: EntityId },

    #[error("Unknown project '{id}'")]
    UnknownProject { id: EntityId },

    #[error("Unknown power plant '{id}'")]
    UnknownPlant { id: EntityId },

    #[error("Unknown project kind '{kind}'")]
    UnknownProjectKind { kind: String },

    #[error("A national {kind} already exists ({existing})")]
    DuplicateNational { kind: String, existing: EntityId },

    #[error("Canton '{canton}' already has a {kind}")]
    FacilityExists { kind: String, canton: CantonId },

    #[error("Canton '{canton}' has no coastline for a port")]
    NotCoastal { canton: CantonId },

    #[error("Cannot {action} '{id}' while {status}")]
    InvalidTransition {
        id: EntityId,
        status: String,
        action: &'static str,
    },

    #[error("Insufficient {resource}: need {needed:.2}, have {available:.2}")]
    InsufficientResources {
        resource: Resource,
        needed: f64,
        available: f64,
    },

    #[error("Invalid retool in '{canton}' from {from} to {to}: {reason}")]
    InvalidRetool {
        canton: CantonId,
        from: Sector,
        to: Sector,
        reason: String,
    },

    #[error("Invalid plan: {reason}")]
    InvalidPlan { reason: String },

    #[error("Determinism violation: state diverged at turn {turn}")]
    DeterminismViolation { turn: u64 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
