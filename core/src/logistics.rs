//! Logistics gate: lP supply against operating and shipping demand.
//!
//! Supply is `lp_per_slot` for every funded logistics slot that
//! survived the energy gate. Demand has three parts:
//!   - operating: a per-sector LP cost for every funded slot
//!   - domestic:  each trade order's goods moved between the national
//!                gateway and its canton by the cheapest connected mode
//!   - international: gateway handling per unit cleared
//!
//! Gateways clear imports before exports; when declared quantities
//! exceed capacity each side is pro-rated by declared quantity.
//! Shipments whose route needs more hops than the mode's threshold are
//! queued and land during the next turn's carryover.
//!
//! Connectivity is computed before the gates run and is read-only here.
//!
//! LP does not stockpile. Whatever is left after this gate is recorded
//! for the turn and zeroed in cleanup.
//!
//! Execution: gate 3, plan turns only.

use crate::{
    config::{LogisticsConfig, SimConfig},
    error::SimResult,
    event::TurnEvent,
    gate::{TurnContext, TurnGate},
    infrastructure::{Connectivity, FacilityKind},
    rationing::{self, SlotDemand, SlotGrant},
    rng::GateRng,
    state::EconomyState,
    trade::TradeOrder,
    types::{RationingMode, Resource, Sector, TransportMode},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Domestic leg chosen for one canton.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub mode: TransportMode,
    pub hops: u32,
    /// LP per unit shipped along the whole route.
    pub cost_per_unit: f64,
}

/// Route costs closer than this are equal.
const ROUTE_COST_EPSILON: f64 = 1e-9;

/// Lowest `cost_per_hop × hops` among connected modes. Equal costs keep
/// the earlier mode, so rail beats sea beats air.
pub fn cheapest_route(config: &LogisticsConfig, connectivity: &Connectivity, canton: &str) -> Option<Route> {
    let mut best: Option<Route> = None;
    for mode in TransportMode::ALL {
        let (Some(hops), Some(spec)) = (connectivity.hops(mode, canton), config.modes.get(&mode)) else {
            continue;
        };
        let cost = spec.cost_per_hop * f64::from(hops);
        if best.map_or(true, |b| cost < b.cost_per_unit - ROUTE_COST_EPSILON) {
            best = Some(Route {
                mode,
                hops,
                cost_per_unit: cost,
            });
        }
    }
    best
}

/// Split `capacity` between imports and exports. Each slice holds the
/// declared quantities of one side; returns the cleared quantities.
pub fn clear_gateway(imports: &[f64], exports: &[f64], capacity: f64) -> (Vec<f64>, Vec<f64>) {
    fn pro_rate(declared: &[f64], capacity: f64) -> (Vec<f64>, f64) {
        let total: f64 = declared.iter().map(|q| q.max(0.0)).sum();
        if total <= capacity {
            return (declared.iter().map(|q| q.max(0.0)).collect(), capacity - total);
        }
        let factor = if total > 0.0 { capacity.max(0.0) / total } else { 0.0 };
        (declared.iter().map(|q| q.max(0.0) * factor).collect(), 0.0)
    }
    let (cleared_imports, left) = pro_rate(imports, capacity.max(0.0));
    let (cleared_exports, _) = pro_rate(exports, left);
    (cleared_imports, cleared_exports)
}

/// A trade order after gateway clearing and LP rationing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeGrant {
    pub order: TradeOrder,
    pub import: bool,
    pub requested: f64,
    pub quantity: f64,
    /// Delivered during the next carryover instead of this turn.
    pub queued: bool,
    pub mode: Option<TransportMode>,
    pub hops: u32,
    pub fx_per_unit: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogisticsReport {
    pub supply: f64,
    pub demand: f64,
    pub ratio: f64,
    pub operating_requested: f64,
    pub operating_granted: f64,
    pub domestic_requested: f64,
    pub domestic_granted: f64,
    pub international_requested: f64,
    pub international_granted: f64,
    pub queued: usize,
    pub stranded: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogisticsState {
    pub last: LogisticsReport,
}

/// One cleared order waiting for LP.
struct Shipment {
    order: TradeOrder,
    import: bool,
    requested: f64,
    cleared: f64,
    route: Option<Route>,
    domestic_per_unit: f64,
    international_per_unit: f64,
    fx_per_unit: f64,
    queued: bool,
}

impl Shipment {
    fn domestic(&self) -> f64 {
        self.cleared * self.domestic_per_unit
    }

    fn international(&self) -> f64 {
        self.cleared * self.international_per_unit
    }
}

pub fn lp_supply(config: &LogisticsConfig, state: &EconomyState) -> f64 {
    let slots: u32 = state
        .cantons
        .values()
        .map(|c| c.sector(Sector::Logistics).funded)
        .sum();
    config.lp_per_slot * f64::from(slots)
}

pub fn operating_demands(config: &LogisticsConfig, state: &EconomyState) -> Vec<SlotDemand> {
    state
        .cantons
        .values()
        .flat_map(|canton| {
            canton
                .sectors
                .iter()
                .filter(|(sector, s)| s.funded > 0 && config.operating_per_slot(**sector) > 0.0)
                .map(|(sector, s)| SlotDemand {
                    canton: canton.id.clone(),
                    sector: *sector,
                    slots: s.funded,
                    per_slot: config.operating_per_slot(*sector),
                })
        })
        .collect()
}

pub struct LogisticsGate {
    config: Arc<SimConfig>,
}

impl LogisticsGate {
    pub fn new(config: Arc<SimConfig>) -> Self {
        Self { config }
    }

    /// Clear every order through its gateway and price its LP.
    fn shipments(&self, state: &EconomyState, turn: &mut TurnContext<'_>) -> Vec<Shipment> {
        let Some(plan) = turn.plan.clone() else {
            return Vec::new();
        };
        let config = &self.config.logistics;
        let nation = state.nation_id.as_str();

        // Exports cannot ship goods the nation does not hold.
        let mut on_hand: BTreeMap<Resource, f64> = BTreeMap::new();
        let exports: Vec<(TradeOrder, f64)> = plan
            .trade_orders
            .exports
            .iter()
            .map(|o| {
                let left = on_hand
                    .entry(o.good)
                    .or_insert_with(|| state.stockpile.get(o.good).max(0.0));
                let quantity = o.quantity.max(0.0).min(*left);
                *left -= quantity;
                (o.clone(), quantity)
            })
            .collect();
        let imports: Vec<(TradeOrder, f64)> = plan
            .trade_orders
            .imports
            .iter()
            .map(|o| (o.clone(), o.quantity.max(0.0)))
            .collect();

        let mut shipments = Vec::new();
        for kind in [FacilityKind::Airport, FacilityKind::Port, FacilityKind::RailHub] {
            let side = |orders: &[(TradeOrder, f64)]| -> Vec<(TradeOrder, f64)> {
                orders.iter().filter(|(o, _)| o.gateway == kind).cloned().collect()
            };
            let (kind_imports, kind_exports) = (side(&imports), side(&exports));
            if kind_imports.is_empty() && kind_exports.is_empty() {
                continue;
            }

            let gateway = config.gateways.get(&kind).copied();
            let open = state.infrastructure.operational_national(nation, kind).is_some();
            let Some(gateway) = gateway.filter(|_| open) else {
                log::warn!("turn={} logistics: no operational national {kind}; orders dropped", turn.turn);
                turn.emit(TurnEvent::CommandRejected {
                    turn: turn.turn,
                    command: "trade".into(),
                    reason: format!("no operational national {kind}"),
                });
                continue;
            };

            let declared = |orders: &[(TradeOrder, f64)]| orders.iter().map(|(_, q)| *q).collect::<Vec<_>>();
            let (cleared_imports, cleared_exports) =
                clear_gateway(&declared(&kind_imports), &declared(&kind_exports), gateway.capacity);

            let sides = [(true, kind_imports, cleared_imports), (false, kind_exports, cleared_exports)];
            for (import, orders, cleared) in sides {
                for ((order, _), cleared) in orders.into_iter().zip(cleared) {
                    let route = cheapest_route(config, &turn.connectivity, &order.canton);
                    if route.is_none() && cleared > 0.0 {
                        turn.emit(TurnEvent::ShipmentStranded {
                            turn: turn.turn,
                            canton: order.canton.clone(),
                            good: order.good,
                        });
                    }
                    let queued = route.is_some_and(|r| {
                        config
                            .modes
                            .get(&r.mode)
                            .is_some_and(|m| r.hops > m.hop_threshold)
                    });
                    shipments.push(Shipment {
                        requested: order.quantity,
                        cleared: if route.is_some() { cleared } else { 0.0 },
                        route,
                        domestic_per_unit: route.map_or(0.0, |r| r.cost_per_unit),
                        international_per_unit: gateway.lp_per_unit,
                        fx_per_unit: gateway.fx_per_unit,
                        queued,
                        import,
                        order,
                    });
                }
            }
        }
        shipments
    }
}

impl TurnGate for LogisticsGate {
    fn name(&self) -> &'static str {
        "logistics"
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
        let config = &self.config.logistics;
        let (mode, essentials) = match &turn.plan {
            Some(plan) => (
                plan.rationing.logistics,
                plan.rationing
                    .essentials
                    .clone()
                    .unwrap_or_else(|| config.essentials.clone()),
            ),
            None => (RationingMode::Uniform, config.essentials.clone()),
        };

        let supply = lp_supply(config, state);
        let operating = operating_demands(config, state);
        let shipments = self.shipments(state, turn);

        let operating_requested: f64 = operating.iter().map(SlotDemand::total).sum();
        let domestic_requested: f64 = shipments.iter().map(Shipment::domestic).sum();
        let international_requested: f64 = shipments.iter().map(Shipment::international).sum();
        let demand = operating_requested + domestic_requested + international_requested;
        let ratio = rationing::ratio(supply, demand);

        // Grants for operating demand, and the ratio applied to everything
        // outside the essentials list.
        let (grants, operating_granted, shipment_ratio): (Vec<SlotGrant>, f64, f64) = match mode {
            RationingMode::Uniform => (
                rationing::uniform(&operating, ratio),
                operating_requested * ratio,
                ratio,
            ),
            RationingMode::EssentialsFirst => {
                let (mut grants, remaining) = rationing::essentials_first(&operating, supply, &essentials);
                let priority_granted: f64 = grants.iter().map(|g| g.granted).sum();
                let rest = rationing::outside_priority(&operating, &essentials);
                let rest_requested: f64 = rest.iter().map(SlotDemand::total).sum();
                let rest_ratio = rationing::ratio(remaining, rest_requested + domestic_requested + international_requested);
                grants.extend(rationing::uniform(&rest, rest_ratio));
                (grants, priority_granted + rest_requested * rest_ratio, rest_ratio)
            }
        };

        for grant in grants.iter().filter(|g| g.was_cut()) {
            if let Some(canton) = state.cantons.get_mut(&grant.canton) {
                canton.sector_mut(grant.sector).set_funded(grant.after);
            }
        }

        let mut report = LogisticsReport {
            supply,
            demand,
            ratio,
            operating_requested,
            operating_granted,
            domestic_requested,
            domestic_granted: domestic_requested * shipment_ratio,
            international_requested,
            international_granted: international_requested * shipment_ratio,
            ..LogisticsReport::default()
        };

        turn.trade_grants.clear();
        for shipment in shipments {
            let quantity = shipment.cleared * shipment_ratio;
            if shipment.route.is_none() {
                report.stranded += 1;
            }
            if shipment.queued && quantity > 0.0 {
                report.queued += 1;
                if let Some(route) = shipment.route {
                    turn.emit(TurnEvent::ShipmentQueued {
                        turn: turn.turn,
                        good: shipment.order.good,
                        quantity,
                        mode: route.mode,
                        hops: route.hops,
                    });
                }
            }
            turn.trade_grants.push(TradeGrant {
                import: shipment.import,
                requested: shipment.requested,
                quantity,
                queued: shipment.queued,
                mode: shipment.route.map(|r| r.mode),
                hops: shipment.route.map_or(0, |r| r.hops),
                fx_per_unit: shipment.fx_per_unit,
                order: shipment.order,
            });
        }

        if demand > supply {
            log::warn!(
                "turn={} logistics: rationed supply={:.1} demand={:.1} ratio={:.3} mode={:?}",
                turn.turn,
                supply,
                demand,
                ratio,
                mode
            );
            turn.emit(TurnEvent::LogisticsRationed {
                turn: turn.turn,
                supply,
                demand,
                ratio,
            });
        } else {
            log::debug!(
                "turn={} logistics: supply={:.1} demand={:.1} shipments={}",
                turn.turn,
                supply,
                demand,
                turn.trade_grants.len()
            );
        }

        state.stockpile.set(Resource::Logistics, (supply - demand).max(0.0));
        state.logistics.last = report;
        Ok(())
    }
}
