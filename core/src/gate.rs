//! Stage trait and per-turn working context.
//!
//! RULE: Every pipeline stage implements TurnGate.
//! The orchestrator calls resolve() on each registered stage
//! in registration order, once per turn.
//! Execution order is fixed and documented in engine.rs.

use crate::{
    context::ExternalContext,
    error::SimResult,
    event::TurnEvent,
    finance::TurnLedger,
    infrastructure::Connectivity,
    logistics::TradeGrant,
    plan::TurnPlan,
    rng::GateRng,
    state::EconomyState,
    types::Turn,
};

/// Scratch values that flow between stages within one turn. Dropped
/// when the turn ends; nothing here is persisted.
pub struct TurnContext<'a> {
    pub turn: Turn,
    /// The plan executing this turn, if any was submitted.
    pub plan: Option<TurnPlan>,
    pub external: &'a ExternalContext,
    pub connectivity: Connectivity,
    pub ledger: TurnLedger,
    /// Trade quantities cleared by the logistics gate.
    pub trade_grants: Vec<TradeGrant>,
    pub events: Vec<TurnEvent>,
}

impl<'a> TurnContext<'a> {
    pub fn new(turn: Turn, plan: Option<TurnPlan>, external: &'a ExternalContext) -> Self {
        Self {
            turn,
            plan,
            external,
            connectivity: Connectivity::default(),
            ledger: TurnLedger::default(),
            trade_grants: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: TurnEvent) {
        self.events.push(event);
    }
}

/// The contract every pipeline stage must fulfill.
pub trait TurnGate: Send {
    /// Unique stable name for this stage.
    fn name(&self) -> &'static str;

    /// Stages that only make sense with a player plan (gates 1–5) are
    /// skipped on turns without one.
    fn requires_plan(&self) -> bool {
        false
    }

    /// Called once per turn by the orchestrator.
    ///
    /// - `state`: the working copy of the economy for this turn
    /// - `turn`:  plan, external context and outputs of earlier stages
    /// - `rng`:   this stage's deterministic RNG for this turn
    fn resolve(
        &mut self,
        state: &mut EconomyState,
        turn: &mut TurnContext<'_>,
        rng: &mut GateRng,
    ) -> SimResult<()>;
}
