use canton_core::{
    config::SimConfig,
    context::ExternalContext,
    energy::{EnergyGate, PlantKind, PlantStatus, PowerPlant},
    event::TurnEvent,
    gate::{TurnContext, TurnGate},
    plan::TurnPlan,
    rng::{GateSlot, RngBank},
    state::{CantonEconomy, EconomyState},
    types::{RationingMode, Resource, Sector},
};
use std::sync::Arc;

fn state_with_funded(slots: &[(Sector, u32)]) -> EconomyState {
    let config = SimConfig::default_rules();
    let mut state = EconomyState::new("n", &config);
    let mut canton = CantonEconomy::new("a", 2);
    for &(sector, n) in slots {
        canton = canton.with_capacity(sector, n);
        canton.sector_mut(sector).set_funded(n);
    }
    state.add_canton(canton);
    state.stockpile.set(Resource::Gold, 100.0);
    state
}

fn add_plant(state: &mut EconomyState, kind: PlantKind, status: PlantStatus) {
    let id = state.next_entity_id("plt");
    state.energy.plants.insert(
        id.clone(),
        PowerPlant {
            id,
            canton: "a".into(),
            kind,
            status,
        },
    );
}

fn run_energy(state: &mut EconomyState, plan: TurnPlan) -> (Vec<TurnEvent>, f64) {
    let external = ExternalContext::default();
    let mut turn = TurnContext::new(1, Some(plan), &external);
    let mut rng = RngBank::new(1).for_gate(GateSlot::Energy, 1);
    EnergyGate::new(Arc::new(SimConfig::default_rules()))
        .resolve(state, &mut turn, &mut rng)
        .unwrap();
    (turn.events, turn.ledger.expense("plant_om"))
}

fn funded(state: &EconomyState, sector: Sector) -> u32 {
    state.cantons["a"].sector(sector).funded
}

#[test]
fn uniform_shortage_scales_every_sector() {
    // Demand: 10 industry × 3 + 20 agriculture × 1 = 50 against 40 from coal.
    let mut state = state_with_funded(&[(Sector::Industry, 10), (Sector::Agriculture, 20)]);
    add_plant(&mut state, PlantKind::Coal, PlantStatus::Active);
    state.stockpile.set(Resource::Coal, 10.0);

    let (events, plant_om) = run_energy(&mut state, TurnPlan::default());

    assert_eq!(funded(&state, Sector::Industry), 8);
    assert_eq!(funded(&state, Sector::Agriculture), 16);
    assert!(state.cantons["a"].brownout);
    assert_eq!(state.stockpile.get(Resource::Coal), 8.0);
    assert_eq!(plant_om, 6.0);
    assert_eq!(state.energy.last.supply, 40.0);
    assert_eq!(state.energy.last.demand, 50.0);
    assert_eq!(state.energy.last.brownouts.len(), 2);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, TurnEvent::Brownout { .. }))
            .count(),
        2
    );
    assert!(events
        .iter()
        .any(|e| matches!(e, TurnEvent::EnergyShortage { ratio, .. } if (*ratio - 0.8).abs() < 1e-12)));
}

#[test]
fn essentials_first_protects_priority_sectors() {
    let mut state = state_with_funded(&[(Sector::Industry, 10), (Sector::Agriculture, 20)]);
    add_plant(&mut state, PlantKind::Coal, PlantStatus::Active);
    state.stockpile.set(Resource::Coal, 10.0);
    let mut plan = TurnPlan::default();
    plan.rationing.energy = RationingMode::EssentialsFirst;

    run_energy(&mut state, plan);

    // Agriculture takes 20 of 40; industry gets floor(20 / 3) slots.
    assert_eq!(funded(&state, Sector::Agriculture), 20);
    assert_eq!(funded(&state, Sector::Industry), 6);
    assert_eq!(state.energy.last.brownouts.len(), 1);
}

#[test]
fn plan_can_override_the_essentials_list() {
    let mut state = state_with_funded(&[(Sector::Industry, 10), (Sector::Agriculture, 20)]);
    add_plant(&mut state, PlantKind::Coal, PlantStatus::Active);
    state.stockpile.set(Resource::Coal, 10.0);
    let mut plan = TurnPlan::default();
    plan.rationing.energy = RationingMode::EssentialsFirst;
    plan.rationing.essentials = Some(vec![Sector::Industry]);

    run_energy(&mut state, plan);

    assert_eq!(funded(&state, Sector::Industry), 10);
    assert_eq!(funded(&state, Sector::Agriculture), 10);
}

#[test]
fn renewables_run_at_capacity_factor() {
    let mut state = state_with_funded(&[(Sector::Agriculture, 10)]);
    add_plant(&mut state, PlantKind::Wind, PlantStatus::Active);

    run_energy(&mut state, TurnPlan::default());

    assert_eq!(state.energy.last.supply, 15.0);
    assert_eq!(funded(&state, Sector::Agriculture), 10);
    assert!(!state.cantons["a"].brownout);
    assert_eq!(state.stockpile.get(Resource::Energy), 5.0);
}

#[test]
fn unfuelled_and_unfinished_plants_produce_nothing() {
    let mut state = state_with_funded(&[(Sector::Agriculture, 4)]);
    add_plant(&mut state, PlantKind::Coal, PlantStatus::Active);
    add_plant(&mut state, PlantKind::Hydro, PlantStatus::Building { turns_remaining: 2 });
    add_plant(&mut state, PlantKind::Wind, PlantStatus::Idle);

    let (_, plant_om) = run_energy(&mut state, TurnPlan::default());

    assert_eq!(state.energy.last.supply, 0.0);
    assert_eq!(state.energy.last.plants_running, 0);
    assert_eq!(plant_om, 0.0, "a plant that cannot run costs nothing");
    assert_eq!(state.stockpile.get(Resource::Coal), 0.0);
    assert_eq!(funded(&state, Sector::Agriculture), 0);
}

#[test]
fn idle_slots_draw_no_energy() {
    let config = SimConfig::default_rules();
    let mut state = EconomyState::new("n", &config);
    state.add_canton(CantonEconomy::new("a", 1).with_capacity(Sector::Industry, 50));
    state.stockpile.set(Resource::Gold, 100.0);

    run_energy(&mut state, TurnPlan::default());

    assert_eq!(state.energy.last.demand, 0.0);
    assert_eq!(state.energy.last.ratio, 1.0);
}
