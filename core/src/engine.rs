//! The turn orchestrator: resolves one turn of a nation's economy.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   0. Carryover      trade arrivals, UL and welfare lag-apply, retools
//!   1. Budget gate    (plan turns only)
//!   2. Energy gate    (plan turns only)
//!   3. Logistics gate (plan turns only)
//!   4. Labor gate     (plan turns only)
//!   5. Suitability    (plan turns only)
//!   6. Production
//!   7. Upkeep
//!   8. Trade
//!   9. Finance
//!  10. Development
//!  11. Cleanup        zero LP and labor, lifecycle and retool timers
//!
//! RULES:
//!   - Gates execute in registration order, once per turn.
//!   - A gate reads only what earlier gates left on the working state
//!     and the turn context.
//!   - The development roll is the only randomness; it flows through
//!     the RngBank.
//!   - A turn runs on a working copy; the live state is replaced only
//!     when every gate succeeded.
//!   - The plan submitted during turn N executes in turn N+1.

use crate::{
    budget::{self, BudgetGate},
    command::{CommandOutcome, EconomyCommand},
    config::SimConfig,
    context::ExternalContext,
    development::DevelopmentGate,
    energy::{self, EnergyGate},
    error::{SimError, SimResult},
    event::{TurnEvent, TurnSummary},
    finance::FinanceGate,
    fixtures,
    gate::{TurnContext, TurnGate},
    infrastructure,
    labor::LaborGate,
    logistics::LogisticsGate,
    plan::TurnPlan,
    production::{ProductionGate, UpkeepGate},
    projects,
    rng::{GateSlot, RngBank},
    snapshot::EconomySnapshot,
    state::{EconomyState, ShortageFlags},
    suitability::SuitabilityGate,
    trade::{self, TradeGate},
    types::{Resource, Turn},
    welfare,
};
use std::sync::Arc;

pub struct TurnEngine {
    state: EconomyState,
    config: Arc<SimConfig>,
    rng_bank: RngBank,
    gates: Vec<(GateSlot, Box<dyn TurnGate>)>,
    last_events: Vec<TurnEvent>,
}

impl TurnEngine {
    pub fn new(state: EconomyState, config: Arc<SimConfig>, seed: u64) -> Self {
        Self {
            state,
            config,
            rng_bank: RngBank::new(seed),
            gates: Vec::new(),
            last_events: Vec::new(),
        }
    }

    /// Build a fully wired engine with every gate registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(state: EconomyState, config: Arc<SimConfig>, seed: u64) -> Self {
        let mut engine = TurnEngine::new(state, Arc::clone(&config), seed);

        // EXECUTION ORDER: fixed, documented, never reordered.
        engine.register(GateSlot::Budget, Box::new(BudgetGate::new(Arc::clone(&config))));
        engine.register(GateSlot::Energy, Box::new(EnergyGate::new(Arc::clone(&config))));
        engine.register(GateSlot::Logistics, Box::new(LogisticsGate::new(Arc::clone(&config))));
        engine.register(GateSlot::Labor, Box::new(LaborGate::new(Arc::clone(&config))));
        engine.register(GateSlot::Suitability, Box::new(SuitabilityGate::new(Arc::clone(&config))));
        engine.register(GateSlot::Production, Box::new(ProductionGate::new(Arc::clone(&config))));
        engine.register(GateSlot::Upkeep, Box::new(UpkeepGate::new(Arc::clone(&config))));
        engine.register(GateSlot::Trade, Box::new(TradeGate::new()));
        engine.register(GateSlot::Finance, Box::new(FinanceGate::new(Arc::clone(&config))));
        engine.register(GateSlot::Development, Box::new(DevelopmentGate::new(config)));
        engine
    }

    /// The demo nation under the built-in rules.
    pub fn build_test(seed: u64) -> Self {
        let config = Arc::new(SimConfig::default_rules());
        let state = fixtures::demo_state(&config);
        Self::build(state, config, seed)
    }

    /// Register a gate. Call in the documented execution order.
    pub fn register(&mut self, slot: GateSlot, gate: Box<dyn TurnGate>) {
        self.gates.push((slot, gate));
    }

    pub fn state(&self) -> &EconomyState {
        &self.state
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.rng_bank.seed()
    }

    pub fn turn(&self) -> Turn {
        self.state.turn
    }

    /// Events emitted by the most recent `advance_turn`.
    pub fn last_events(&self) -> &[TurnEvent] {
        &self.last_events
    }

    pub fn snapshot(&self) -> EconomySnapshot {
        EconomySnapshot::of(&self.state)
    }

    // ── Player input ──────────────────────────────────────────────

    /// Store `plan` for the next turn, replacing any earlier submission.
    ///
    /// Welfare sliders are staged and charged now. A plan without
    /// welfare sliders withdraws a previously staged change.
    pub fn submit_plan(&mut self, plan: TurnPlan) -> SimResult<()> {
        self.validate_plan(&plan)?;

        match plan.policies.welfare {
            Some(desired) => {
                welfare::submit_policy(&mut self.state, &self.config, desired);
            }
            None => {
                welfare::withdraw_policy(&mut self.state);
            }
        }

        log::debug!(
            "turn={} plan submitted: {} project orders, {} imports, {} exports, {} retools",
            self.state.turn,
            plan.projects.len(),
            plan.trade_orders.imports.len(),
            plan.trade_orders.exports.len(),
            plan.retools.len()
        );
        self.state.next_plan = Some(plan);
        Ok(())
    }

    fn validate_plan(&self, plan: &TurnPlan) -> SimResult<()> {
        for order in &plan.projects {
            projects::validate(&self.state, &self.config.projects, order)?;
        }
        for request in &plan.retools {
            self.state.canton(&request.canton)?;
        }
        let orders = plan.trade_orders.imports.iter().chain(&plan.trade_orders.exports);
        for order in orders {
            self.state.canton(&order.canton)?;
            if order.quantity < 0.0 || order.price < 0.0 || order.tariff < 0.0 {
                return Err(SimError::InvalidPlan {
                    reason: format!("negative quantity, price or tariff on {} order", order.good),
                });
            }
        }
        for canton in plan.budgets.canton_om.keys() {
            self.state.canton(canton)?;
        }
        Ok(())
    }

    /// Apply an immediate command between turns.
    pub fn command(&mut self, command: EconomyCommand) -> SimResult<CommandOutcome> {
        let outcome = command.apply(&mut self.state, &self.config)?;
        log::debug!(
            "turn={} command {} ok created={:?}",
            self.state.turn,
            command.name(),
            outcome.created
        );
        Ok(outcome)
    }

    // ── Turn resolution ───────────────────────────────────────────

    /// Advance one turn. This is the core state transition.
    pub fn advance_turn(&mut self, external: &ExternalContext) -> SimResult<TurnSummary> {
        let mut working = self.state.clone();
        working.turn += 1;
        let current = working.turn;
        let plan = working.current_plan.clone();
        let plan_executed = plan.is_some();

        let mut turn = TurnContext::new(current, plan, external);
        turn.emit(TurnEvent::TurnStarted { turn: current });

        carryover(&mut working, &mut turn);
        match turn.plan.clone() {
            Some(plan) => self.apply_project_orders(&mut working, &mut turn, &plan),
            None => {
                log::info!("turn={current} no plan: budget through suitability skipped");
                turn.emit(TurnEvent::PlanMissing { turn: current });
            }
        }

        turn.connectivity = infrastructure::compute_connectivity(&working, &self.config, external);

        for (slot, gate) in &mut self.gates {
            if gate.requires_plan() && turn.plan.is_none() {
                continue;
            }
            let mut rng = self.rng_bank.for_gate(*slot, current);
            log::debug!("turn={current} gate {} (rng stream {})", gate.name(), rng.name);
            if let Err(e) = gate.resolve(&mut working, &mut turn, &mut rng) {
                log::warn!("turn={current} gate {} failed, turn discarded: {e}", gate.name());
                return Err(e);
            }
        }

        cleanup(&mut working, &mut turn);

        let summary = summarize(&working, &turn.events, plan_executed);
        log::info!(
            "turn={} done: energy={:.2} lp={:.2} brownouts={} shortages={} rev={:.1} exp={:.1} treasury={:.1} debt={:.1}{}",
            summary.turn,
            summary.energy_ratio,
            summary.lp_ratio,
            summary.brownouts,
            summary.shortages,
            summary.revenues,
            summary.expenditures,
            summary.treasury,
            summary.debt,
            if summary.defaulted { " DEFAULTED" } else { "" }
        );

        working.last_summary = Some(summary.clone());
        working.current_plan = working.next_plan.take();
        self.last_events = std::mem::take(&mut turn.events);
        self.state = working;
        Ok(summary)
    }

    /// Advance `n` turns with whatever plans are already queued.
    pub fn run_turns(&mut self, n: u64, external: &ExternalContext) -> SimResult<Vec<TurnSummary>> {
        (0..n).map(|_| self.advance_turn(external)).collect()
    }

    fn apply_project_orders(&self, state: &mut EconomyState, turn: &mut TurnContext<'_>, plan: &TurnPlan) {
        for order in &plan.projects {
            if let Err(e) = projects::apply_order(state, &self.config, order) {
                log::warn!("turn={} {} rejected: {e}", turn.turn, order.name());
                turn.emit(TurnEvent::CommandRejected {
                    turn: turn.turn,
                    command: order.name().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// Phase 0: land what the previous turn set in motion and clear the
/// per-turn scratch values on the state.
fn carryover(state: &mut EconomyState, turn: &mut TurnContext<'_>) {
    let current = turn.turn;
    turn.events.extend(trade::deliver_arrivals(state, current));

    for canton in state.cantons.values_mut() {
        if let Some(from) = canton.urbanization.apply_pending() {
            turn.events.push(TurnEvent::UrbanizationChanged {
                turn: current,
                canton: canton.id.clone(),
                from,
                to: canton.urbanization_level(),
            });
        }
    }
    if let Some(previous) = state.welfare.apply_pending() {
        log::debug!(
            "turn={current} welfare: {:?} -> {:?}",
            previous,
            state.welfare.current()
        );
    }
    turn.events.extend(budget::complete_retools(state, current));

    for canton in state.cantons.values_mut() {
        for slots in canton.sectors.values_mut() {
            slots.set_funded(0);
            slots.utilization = 0;
        }
        canton.labor.clear();
        canton.brownout = false;
        canton.shortages = ShortageFlags::default();
    }
    state.stockpile.set(Resource::Energy, 0.0);
    state.energy.last = Default::default();
    state.logistics.last = Default::default();
    state.trade.last = Default::default();
}

/// Phase 11: non-stockpiling resources expire, timers tick.
fn cleanup(state: &mut EconomyState, turn: &mut TurnContext<'_>) {
    let current = turn.turn;
    state.stockpile.set(Resource::Logistics, 0.0);
    state.stockpile.set(Resource::Labor, 0.0);

    budget::advance_retools(state);
    turn.events.extend(infrastructure::advance_facilities(state, current));
    turn.events.extend(projects::advance_projects(state, current));
    turn.events.extend(energy::advance_plants(state, current));
    turn.emit(TurnEvent::TurnCompleted { turn: current });
}

fn summarize(state: &EconomyState, events: &[TurnEvent], plan_executed: bool) -> TurnSummary {
    let count = |pred: fn(&TurnEvent) -> bool| events.iter().filter(|e| pred(e)).count();
    let finance = &state.finance;
    TurnSummary {
        turn: state.turn,
        plan_executed,
        energy_ratio: if plan_executed { state.energy.last.ratio } else { 1.0 },
        lp_ratio: if plan_executed { state.logistics.last.ratio } else { 1.0 },
        brownouts: count(|e| matches!(e, TurnEvent::Brownout { .. })),
        shortages: count(|e| matches!(e, TurnEvent::ResourceShortage { .. })),
        revenues: finance.summary.revenues,
        expenditures: finance.summary.expenditures,
        net_borrowing: finance.summary.net_borrowing,
        interest: finance.summary.interest,
        defaulted: finance.defaulted,
        ul_changes: state
            .cantons
            .values()
            .filter(|c| c.urbanization.is_pending())
            .count(),
        treasury: state.treasury(),
        debt: finance.debt,
    }
}
