use canton_core::{
    config::SimConfig,
    context::ExternalContext,
    event::TurnEvent,
    gate::{TurnContext, TurnGate},
    labor::LaborGate,
    plan::TurnPlan,
    rng::{GateSlot, RngBank},
    state::{CantonEconomy, EconomyState},
    types::{Resource, Sector},
};
use std::sync::Arc;

fn canton(slots: &[(Sector, u32)], lai: f64) -> CantonEconomy {
    let mut canton = CantonEconomy::new("a", 1).with_labor_access(lai);
    for &(sector, n) in slots {
        canton = canton.with_capacity(sector, n);
        canton.sector_mut(sector).set_funded(n);
    }
    canton
}

fn run_labor(state: &mut EconomyState, plan: TurnPlan) -> Vec<TurnEvent> {
    let external = ExternalContext::default();
    let mut turn = TurnContext::new(1, Some(plan), &external);
    let mut rng = RngBank::new(1).for_gate(GateSlot::Labor, 1);
    LaborGate::new(Arc::new(SimConfig::default_rules()))
        .resolve(state, &mut turn, &mut rng)
        .unwrap();
    turn.events
}

#[test]
fn unfilled_slots_are_defunded_and_access_index_floors() {
    let config = SimConfig::default_rules();
    let mut state = EconomyState::new("n", &config);
    // UL 1 pool: 40 general, 8 skilled, 3 specialist.
    state.add_canton(canton(
        &[(Sector::Agriculture, 45), (Sector::Industry, 5), (Sector::Research, 4)],
        0.9,
    ));
    state.stockpile.set(Resource::Food, 100.0);
    state.stockpile.set(Resource::Luxury, 10.0);

    let events = run_labor(&mut state, TurnPlan::default());

    let a = &state.cantons["a"];
    assert_eq!(a.sector(Sector::Agriculture).funded, 40);
    assert_eq!(a.sector(Sector::Industry).funded, 5);
    assert_eq!(a.sector(Sector::Research).funded, 3);

    assert_eq!(a.labor[&Sector::Agriculture].effective, 36);
    assert_eq!(a.labor[&Sector::Industry].effective, 4);
    assert_eq!(a.labor[&Sector::Research].effective, 2);
    assert_eq!(a.sector(Sector::Agriculture).utilization, 36);
    assert_eq!(a.effective_labor(), 42);

    let shortfalls: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            TurnEvent::LaborShortfall { sector, unmet, .. } => Some((*sector, *unmet)),
            _ => None,
        })
        .collect();
    assert!(shortfalls.contains(&(Sector::Agriculture, 5)));
    assert!(shortfalls.contains(&(Sector::Research, 1)));
    assert_eq!(state.stockpile.get(Resource::Labor), 51.0);
}

#[test]
fn workers_eat_and_shortages_are_flagged() {
    let config = SimConfig::default_rules();
    let mut state = EconomyState::new("n", &config);
    state.add_canton(canton(&[(Sector::Agriculture, 10)], 1.0));
    state.stockpile.set(Resource::Food, 100.0);
    state.stockpile.set(Resource::Luxury, 4.0);

    let events = run_labor(&mut state, TurnPlan::default());

    assert_eq!(state.stockpile.get(Resource::Food), 90.0);
    assert_eq!(state.stockpile.get(Resource::Luxury), 0.0);
    let a = &state.cantons["a"];
    assert!(!a.shortages.food);
    assert!(a.shortages.luxury);
    assert!(events.iter().any(|e| matches!(
        e,
        TurnEvent::ResourceShortage { resource: Resource::Luxury, shortfall, .. } if *shortfall == 6.0
    )));
    // Shortages never block operation.
    assert_eq!(a.sector(Sector::Agriculture).utilization, 10);
}

#[test]
fn priority_rank_decides_who_draws_first() {
    let config = SimConfig::default_rules();
    let mut state = EconomyState::new("n", &config);
    state.add_canton(canton(&[(Sector::Agriculture, 30), (Sector::Extraction, 30)], 1.0));
    state.stockpile.set(Resource::Food, 100.0);
    state.stockpile.set(Resource::Luxury, 100.0);

    run_labor(&mut state, TurnPlan::default().with_priority(Sector::Extraction, 0));

    let a = &state.cantons["a"];
    assert_eq!(a.sector(Sector::Extraction).funded, 30);
    assert_eq!(a.sector(Sector::Agriculture).funded, 10);
}

#[test]
fn suitability_breaks_ties_between_unranked_sectors() {
    let config = SimConfig::default_rules();
    let mut state = EconomyState::new("n", &config);
    // UL 1 plains: agriculture +40, extraction -5.
    let c = canton(&[(Sector::Agriculture, 30), (Sector::Extraction, 30)], 1.0)
        .with_geography(canton_core::types::TileType::Plains, 1.0);
    state.add_canton(c);
    state.stockpile.set(Resource::Food, 100.0);
    state.stockpile.set(Resource::Luxury, 100.0);

    run_labor(&mut state, TurnPlan::default());

    let a = &state.cantons["a"];
    assert_eq!(a.sector(Sector::Agriculture).funded, 30);
    assert_eq!(a.sector(Sector::Extraction).funded, 10);
}
