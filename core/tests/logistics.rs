use canton_core::{
    config::SimConfig,
    context::ExternalContext,
    event::TurnEvent,
    gate::{TurnContext, TurnGate},
    infrastructure::{Connectivity, Facility, FacilityKind},
    lifecycle::Lifecycle,
    logistics::LogisticsGate,
    plan::TurnPlan,
    rng::{GateSlot, RngBank},
    state::{CantonEconomy, EconomyState},
    trade::TradeOrder,
    types::{RationingMode, Resource, Sector, TransportMode},
};
use std::sync::Arc;

const EPS: f64 = 1e-9;

/// Canton `a` runs 12 funded agriculture slots and one logistics slot
/// and hosts the national port; `b` is the import destination.
fn scenario() -> EconomyState {
    let config = SimConfig::default_rules();
    let mut state = EconomyState::new("n", &config);
    let mut a = CantonEconomy::new("a", 2)
        .with_capacity(Sector::Agriculture, 12)
        .with_capacity(Sector::Logistics, 1)
        .with_geography(canton_core::types::TileType::Coast, 1.0);
    a.sector_mut(Sector::Agriculture).set_funded(12);
    a.sector_mut(Sector::Logistics).set_funded(1);
    state.add_canton(a);
    state.add_canton(CantonEconomy::new("b", 1));
    add_port(&mut state, "a");
    state
}

fn add_port(state: &mut EconomyState, canton: &str) {
    let id = state.next_entity_id("fac");
    state.infrastructure.facilities.insert(
        id.clone(),
        Facility {
            id,
            kind: FacilityKind::Port,
            canton: canton.into(),
            national: true,
            lifecycle: Lifecycle::active("n", 100.0),
        },
    );
}

fn import(good: Resource, quantity: f64, canton: &str) -> TradeOrder {
    TradeOrder {
        good,
        quantity,
        price: 1.0,
        tariff: 0.0,
        gateway: FacilityKind::Port,
        canton: canton.into(),
    }
}

fn rail_to(canton: &str, hops: u32) -> Connectivity {
    let mut connectivity = Connectivity::default();
    connectivity
        .hops
        .entry(TransportMode::Rail)
        .or_default()
        .insert(canton.into(), hops);
    connectivity
}

fn run_logistics<'a>(
    state: &mut EconomyState,
    plan: TurnPlan,
    connectivity: Connectivity,
    external: &'a ExternalContext,
) -> TurnContext<'a> {
    let mut turn = TurnContext::new(1, Some(plan), external);
    turn.connectivity = connectivity;
    let mut rng = RngBank::new(1).for_gate(GateSlot::Logistics, 1);
    LogisticsGate::new(Arc::new(SimConfig::default_rules()))
        .resolve(state, &mut turn, &mut rng)
        .unwrap();
    turn
}

#[test]
fn shortage_scales_operations_and_trade_together() {
    let mut state = scenario();
    let external = ExternalContext::default();
    let mut plan = TurnPlan::default();
    plan.trade_orders.imports.push(import(Resource::Coal, 10.0, "b"));

    let turn = run_logistics(&mut state, plan, rail_to("b", 2), &external);

    // Supply 10; demand = 6 operating + 2 domestic + 5 international.
    let report = &state.logistics.last;
    assert_eq!(report.supply, 10.0);
    assert!((report.operating_requested - 6.0).abs() < EPS);
    assert!((report.domestic_requested - 2.0).abs() < EPS);
    assert!((report.international_requested - 5.0).abs() < EPS);
    assert!((report.ratio - 10.0 / 13.0).abs() < EPS);

    assert_eq!(state.cantons["a"].sector(Sector::Agriculture).funded, 9);
    assert_eq!(state.cantons["a"].sector(Sector::Logistics).funded, 1);

    assert_eq!(turn.trade_grants.len(), 1);
    let grant = &turn.trade_grants[0];
    assert!((grant.quantity - 10.0 * 10.0 / 13.0).abs() < EPS);
    assert_eq!(grant.mode, Some(TransportMode::Rail));
    assert!(!grant.queued);
    assert!(turn
        .events
        .iter()
        .any(|e| matches!(e, TurnEvent::LogisticsRationed { .. })));
    assert_eq!(state.stockpile.get(Resource::Logistics), 0.0);
}

#[test]
fn essentials_first_keeps_operating_demand_whole() {
    let mut state = scenario();
    let external = ExternalContext::default();
    let mut plan = TurnPlan::default();
    plan.rationing.logistics = RationingMode::EssentialsFirst;
    plan.trade_orders.imports.push(import(Resource::Coal, 10.0, "b"));

    let turn = run_logistics(&mut state, plan, rail_to("b", 2), &external);

    // Agriculture is essential and takes 6; 4 LP remain for 7 of trade.
    assert_eq!(state.cantons["a"].sector(Sector::Agriculture).funded, 12);
    assert!((turn.trade_grants[0].quantity - 10.0 * 4.0 / 7.0).abs() < EPS);
}

#[test]
fn essentials_shortfall_is_served_down_the_priority_list() {
    let mut state = scenario();
    {
        let a = state.cantons.get_mut("a").unwrap();
        for (sector, slots) in [(Sector::Extraction, 8), (Sector::Industry, 4), (Sector::Luxury, 10)] {
            let s = a.sector_mut(sector);
            s.capacity = slots;
            s.set_funded(slots);
        }
    }
    let external = ExternalContext::default();
    let mut plan = TurnPlan::default();
    plan.rationing.logistics = RationingMode::EssentialsFirst;
    plan.trade_orders.imports.push(import(Resource::Coal, 10.0, "b"));

    let turn = run_logistics(&mut state, plan, rail_to("b", 2), &external);

    // 10 LP: agriculture takes 6, extraction the 4 left, nothing after.
    let a = &state.cantons["a"];
    assert_eq!(a.sector(Sector::Agriculture).funded, 12);
    assert_eq!(a.sector(Sector::Extraction).funded, 4);
    assert_eq!(a.sector(Sector::Industry).funded, 0);
    assert_eq!(a.sector(Sector::Luxury).funded, 0);
    assert_eq!(turn.trade_grants[0].quantity, 0.0);
}

#[test]
fn long_routes_are_queued() {
    let mut state = scenario();
    state.cantons.get_mut("a").unwrap().sector_mut(Sector::Agriculture).set_funded(0);
    state
        .cantons
        .get_mut("a")
        .unwrap()
        .sector_mut(Sector::Logistics)
        .set_funded(1);
    let external = ExternalContext::default();
    let mut plan = TurnPlan::default();
    plan.trade_orders.imports.push(import(Resource::Oil, 2.0, "b"));

    // Rail threshold is 6 hops.
    let turn = run_logistics(&mut state, plan, rail_to("b", 7), &external);

    let grant = &turn.trade_grants[0];
    assert!(grant.queued);
    assert_eq!(grant.hops, 7);
    assert_eq!(grant.quantity, 2.0);
    assert_eq!(state.logistics.last.queued, 1);
    assert!(turn
        .events
        .iter()
        .any(|e| matches!(e, TurnEvent::ShipmentQueued { hops: 7, .. })));
}

#[test]
fn orders_without_an_operational_gateway_are_dropped() {
    let mut state = scenario();
    let external = ExternalContext::default();
    let mut plan = TurnPlan::default();
    let mut order = import(Resource::Coal, 5.0, "b");
    order.gateway = FacilityKind::Airport;
    plan.trade_orders.imports.push(order);

    let turn = run_logistics(&mut state, plan, rail_to("b", 1), &external);

    assert!(turn.trade_grants.is_empty());
    assert!(turn.events.iter().any(|e| matches!(
        e,
        TurnEvent::CommandRejected { command, .. } if command == "trade"
    )));
}

#[test]
fn unreachable_cantons_strand_their_shipments() {
    let mut state = scenario();
    let external = ExternalContext::default();
    let mut plan = TurnPlan::default();
    plan.trade_orders.imports.push(import(Resource::Coal, 5.0, "b"));

    let turn = run_logistics(&mut state, plan, Connectivity::default(), &external);

    assert_eq!(turn.trade_grants[0].quantity, 0.0);
    assert_eq!(state.logistics.last.stranded, 1);
    assert!(turn
        .events
        .iter()
        .any(|e| matches!(e, TurnEvent::ShipmentStranded { .. })));
}

#[test]
fn exports_are_limited_to_stock_on_hand() {
    let mut state = scenario();
    state.stockpile.set(Resource::Food, 4.0);
    let external = ExternalContext::default();
    let mut plan = TurnPlan::default();
    plan.trade_orders.exports.push(TradeOrder {
        good: Resource::Food,
        quantity: 10.0,
        price: 3.0,
        tariff: 0.0,
        gateway: FacilityKind::Port,
        canton: "a".into(),
    });

    // Canton a is the port itself: zero domestic hops.
    let turn = run_logistics(&mut state, plan, rail_to("a", 0), &external);

    assert_eq!(turn.trade_grants[0].requested, 10.0);
    assert!(turn.trade_grants[0].quantity <= 4.0 + EPS);
}
