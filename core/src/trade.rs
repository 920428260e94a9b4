//! Trade engine: settles the quantities logistics cleared.
//!
//! Imports are paid in foreign exchange at the declared price plus the
//! gateway's per-unit FX fee, and earn the treasury `value × tariff` in
//! gold. Exports leave the stockpile when they ship and earn FX at the
//! declared price. FX flows are booked on the turn ledger and applied by
//! the finance stage; tariffs are booked as gold revenue.
//!
//! Queued shipments are held in transit and delivered during the next
//! carryover: import goods land then, and export FX is credited then.

use crate::{
    error::SimResult,
    event::TurnEvent,
    gate::{TurnContext, TurnGate},
    infrastructure::FacilityKind,
    rng::GateRng,
    state::EconomyState,
    types::{CantonId, Resource, Turn},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOrder {
    pub good: Resource,
    pub quantity: f64,
    /// FX per unit.
    pub price: f64,
    /// Import tariff rate, e.g. 0.1 for 10%.
    #[serde(default)]
    pub tariff: f64,
    pub gateway: FacilityKind,
    /// Canton the goods are delivered to or shipped from.
    pub canton: CantonId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InTransit {
    pub good: Resource,
    pub quantity: f64,
    pub import: bool,
    /// FX credited on arrival (exports only).
    pub fx_on_arrival: f64,
    pub dispatched: Turn,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeSummary {
    pub tariff_revenue: f64,
    pub fx_spent: f64,
    pub fx_earned: f64,
    pub imported: f64,
    pub exported: f64,
    pub in_transit: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeState {
    pub in_transit: Vec<InTransit>,
    pub last: TradeSummary,
}

/// Carryover step: land everything dispatched last turn.
pub fn deliver_arrivals(state: &mut EconomyState, turn: Turn) -> Vec<TurnEvent> {
    let arrivals = std::mem::take(&mut state.trade.in_transit);
    arrivals
        .into_iter()
        .map(|shipment| {
            if shipment.import {
                state.stockpile.add(shipment.good, shipment.quantity);
            } else {
                state.stockpile.add(Resource::ForeignExchange, shipment.fx_on_arrival);
            }
            TurnEvent::ShipmentArrived {
                turn,
                good: shipment.good,
                quantity: shipment.quantity,
                import: shipment.import,
            }
        })
        .collect()
}

#[derive(Default)]
pub struct TradeGate;

impl TradeGate {
    pub fn new() -> Self {
        Self
    }
}

impl TurnGate for TradeGate {
    fn name(&self) -> &'static str {
        "trade"
    }

    fn resolve(
        &mut self,
        state: &mut EconomyState,
        turn: &mut TurnContext<'_>,
        _rng: &mut GateRng,
    ) -> SimResult<()> {
        let grants = std::mem::take(&mut turn.trade_grants);
        let mut summary = TradeSummary::default();
        let mut fx_available = state.stockpile.get(Resource::ForeignExchange);

        for grant in grants.iter().filter(|g| g.import && g.quantity > 0.0) {
            let order = &grant.order;
            let unit_fx = order.price.max(0.0) + grant.fx_per_unit;
            let affordable = if unit_fx > 0.0 {
                (fx_available.max(0.0) / unit_fx).min(grant.quantity)
            } else {
                grant.quantity
            };
            if affordable < grant.quantity {
                turn.emit(TurnEvent::ResourceShortage {
                    turn: turn.turn,
                    canton: order.canton.clone(),
                    resource: Resource::ForeignExchange,
                    shortfall: (grant.quantity - affordable) * unit_fx,
                });
            }
            if affordable <= 0.0 {
                continue;
            }

            let value = affordable * order.price.max(0.0);
            let fx = affordable * unit_fx;
            fx_available -= fx;
            summary.fx_spent += fx;
            summary.tariff_revenue += value * order.tariff.max(0.0);
            summary.imported += affordable;

            if grant.queued {
                state.trade.in_transit.push(InTransit {
                    good: order.good,
                    quantity: affordable,
                    import: true,
                    fx_on_arrival: 0.0,
                    dispatched: turn.turn,
                });
            } else {
                state.stockpile.add(order.good, affordable);
            }
        }

        for grant in grants.iter().filter(|g| !g.import && g.quantity > 0.0) {
            let order = &grant.order;
            let fee = grant.fx_per_unit.max(0.0);
            let price = order.price.max(0.0);
            // Same-turn proceeds cover the gateway fee; queued exports
            // pay it before any FX comes back.
            let net_unit_fx = if grant.queued { fee } else { fee - price };
            let on_hand = grant.quantity.min(state.stockpile.get(order.good).max(0.0));
            let payable = if net_unit_fx > 0.0 {
                (fx_available.max(0.0) / net_unit_fx).min(on_hand)
            } else {
                on_hand
            };
            if payable < on_hand {
                turn.emit(TurnEvent::ResourceShortage {
                    turn: turn.turn,
                    canton: order.canton.clone(),
                    resource: Resource::ForeignExchange,
                    shortfall: (on_hand - payable) * net_unit_fx,
                });
            }

            let shipped = state.stockpile.take_up_to(order.good, payable);
            if shipped <= 0.0 {
                continue;
            }
            let earned = shipped * price;
            fx_available -= shipped * fee;
            summary.fx_spent += shipped * fee;
            summary.exported += shipped;

            if grant.queued {
                state.trade.in_transit.push(InTransit {
                    good: order.good,
                    quantity: shipped,
                    import: false,
                    fx_on_arrival: earned,
                    dispatched: turn.turn,
                });
            } else {
                fx_available += earned;
                summary.fx_earned += earned;
            }
        }

        summary.in_transit = state.trade.in_transit.len();
        turn.ledger.book_revenue("tariffs", summary.tariff_revenue);
        turn.ledger.fx_spent += summary.fx_spent;
        turn.ledger.fx_earned += summary.fx_earned;

        log::debug!(
            "turn={} trade: imported={:.1} exported={:.1} tariffs={:.2} fx_spent={:.2} fx_earned={:.2} in_transit={}",
            turn.turn,
            summary.imported,
            summary.exported,
            summary.tariff_revenue,
            summary.fx_spent,
            summary.fx_earned,
            summary.in_transit
        );
        state.trade.last = summary;
        turn.trade_grants = grants;
        Ok(())
    }
}
