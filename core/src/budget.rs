//! Budget gate: gold allocations to funded and idle slots.
//!
//! For every canton and sector:
//!   funded = min(capacity, floor(allocation / cost_per_slot))
//!   idle   = capacity − funded
//! Slots leave the source sector's capacity when a retool is queued and
//! join the destination when it completes, so a retool in progress is
//! neither funded nor idle. Funded slots are paid for in full; each idle
//! slot is charged an idle tax of a quarter of one slot's O&M.
//!
//! National sector budgets are spread across cantons in proportion to
//! capacity; per-canton allocations in the plan replace the national
//! share for that canton.
//!
//! Execution: gate 1, plan turns only.

use crate::{
    config::SimConfig,
    error::{SimError, SimResult},
    event::TurnEvent,
    gate::{TurnContext, TurnGate},
    rng::GateRng,
    state::EconomyState,
    types::{CantonId, Sector, Turn},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Player request to convert slots between sectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetoolRequest {
    pub canton: CantonId,
    pub from: Sector,
    pub to: Sector,
    pub slots: u32,
}

/// A retool in progress. Its slots belong to neither sector until the
/// timer elapses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetoolOrder {
    pub canton: CantonId,
    pub from: Sector,
    pub to: Sector,
    pub slots: u32,
    pub turns_remaining: u32,
}

pub fn queue_retool(state: &mut EconomyState, config: &SimConfig, request: &RetoolRequest) -> SimResult<()> {
    let invalid = |reason: &str| SimError::InvalidRetool {
        canton: request.canton.clone(),
        from: request.from,
        to: request.to,
        reason: reason.to_string(),
    };
    if request.from == request.to {
        return Err(invalid("source and destination are the same sector"));
    }
    if request.slots == 0 {
        return Err(invalid("no slots requested"));
    }
    let free = state.canton(&request.canton)?.sector(request.from).capacity;
    if request.slots > free {
        return Err(invalid(&format!("only {free} slots free to retool")));
    }

    if let Some(canton) = state.cantons.get_mut(&request.canton) {
        let source = canton.sector_mut(request.from);
        source.capacity -= request.slots;
        source.set_funded(source.funded);
    }
    state.retool_queue.push(RetoolOrder {
        canton: request.canton.clone(),
        from: request.from,
        to: request.to,
        slots: request.slots,
        turns_remaining: config.budget.retool_turns,
    });
    Ok(())
}

/// Carryover step: hand the slots of every elapsed retool to the
/// destination sector.
pub fn complete_retools(state: &mut EconomyState, turn: Turn) -> Vec<TurnEvent> {
    let (done, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut state.retool_queue)
        .into_iter()
        .partition(|r| r.turns_remaining == 0);
    state.retool_queue = pending;

    let mut events = Vec::new();
    for order in done {
        let Some(canton) = state.cantons.get_mut(&order.canton) else {
            continue;
        };
        let dest = canton.sector_mut(order.to);
        dest.capacity += order.slots;
        dest.set_funded(dest.funded);

        events.push(TurnEvent::RetoolCompleted {
            turn,
            canton: order.canton,
            from: order.from,
            to: order.to,
            slots: order.slots,
        });
    }
    events
}

/// Cleanup step: count every pending retool down by one turn.
pub fn advance_retools(state: &mut EconomyState) {
    for order in &mut state.retool_queue {
        order.turns_remaining = order.turns_remaining.saturating_sub(1);
    }
}

/// Gold each canton receives for `sector` this turn.
fn canton_allocations(
    state: &EconomyState,
    budgets: &crate::plan::Budgets,
    sector: Sector,
) -> BTreeMap<CantonId, f64> {
    let national = budgets.sector_om.get(&sector).copied().unwrap_or(0.0).max(0.0);
    let overridden = |id: &str| {
        budgets
            .canton_om
            .get(id)
            .and_then(|m| m.get(&sector))
            .copied()
    };

    let shared_capacity: u32 = state
        .cantons
        .values()
        .filter(|c| overridden(&c.id).is_none())
        .map(|c| c.sector(sector).capacity)
        .sum();

    state
        .cantons
        .values()
        .map(|c| {
            let gold = match overridden(&c.id) {
                Some(gold) => gold.max(0.0),
                None if shared_capacity > 0 => {
                    let share = f64::from(c.sector(sector).capacity) / f64::from(shared_capacity);
                    national * share
                }
                None => 0.0,
            };
            (c.id.clone(), gold)
        })
        .collect()
}

pub struct BudgetGate {
    config: Arc<SimConfig>,
}

impl BudgetGate {
    pub fn new(config: Arc<SimConfig>) -> Self {
        Self { config }
    }
}

impl TurnGate for BudgetGate {
    fn name(&self) -> &'static str {
        "budget"
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
        let Some(plan) = turn.plan.clone() else {
            return Ok(());
        };

        for request in &plan.retools {
            if let Err(e) = queue_retool(state, &self.config, request) {
                log::warn!("turn={} budget: retool rejected: {e}", turn.turn);
                turn.emit(TurnEvent::CommandRejected {
                    turn: turn.turn,
                    command: "retool".into(),
                    reason: e.to_string(),
                });
            }
        }

        turn.ledger.book_expense("military", plan.budgets.military.max(0.0));
        turn.ledger.book_expense("welfare", plan.budgets.welfare.max(0.0));

        let budget = &self.config.budget;
        let mut slot_spend = 0.0;
        let mut idle_tax = 0.0;

        for sector in Sector::ALL {
            let cost = budget.cost_per_slot(sector);
            let allocations = canton_allocations(state, &plan.budgets, sector);

            for (id, gold) in allocations {
                let Some(canton) = state.cantons.get(&id) else {
                    continue;
                };
                let capacity = canton.sector(sector).capacity;
                let affordable = if cost > 0.0 {
                    (gold / cost).floor().max(0.0) as u32
                } else {
                    capacity
                };
                let funded = capacity.min(affordable);

                slot_spend += f64::from(funded) * cost;
                idle_tax += f64::from(capacity - funded) * cost * budget.idle_tax_rate;

                if let Some(canton) = state.cantons.get_mut(&id) {
                    let slots = canton.sector_mut(sector);
                    slots.set_funded(funded);
                    slots.utilization = 0;
                }
            }
        }

        turn.ledger.book_expense("slot_om", slot_spend);
        turn.ledger.book_expense("idle_tax", idle_tax);

        log::debug!(
            "turn={} budget: slot_om={:.2} idle_tax={:.2} retools_pending={}",
            turn.turn,
            slot_spend,
            idle_tax,
            state.retool_queue.len()
        );
        Ok(())
    }
}
