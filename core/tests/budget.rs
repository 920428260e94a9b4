//! Budget gate tests: funded/idle slots, idle tax, retooling.

use canton_core::{
    budget::{queue_retool, BudgetGate, RetoolRequest},
    command::EconomyCommand,
    config::SimConfig,
    context::ExternalContext,
    error::SimError,
    event::TurnEvent,
    fixtures::demo_external,
    gate::{TurnContext, TurnGate},
    plan::TurnPlan,
    rng::{GateSlot, RngBank},
    state::{CantonEconomy, EconomyState},
    types::Sector,
    TurnEngine,
};
use std::sync::Arc;

fn run_budget(state: &mut EconomyState, plan: TurnPlan) -> (f64, f64) {
    let config = Arc::new(SimConfig::default_rules());
    let external = ExternalContext::default();
    let mut turn = TurnContext::new(1, Some(plan), &external);
    let mut rng = RngBank::new(1).for_gate(GateSlot::Budget, 1);
    BudgetGate::new(config)
        .resolve(state, &mut turn, &mut rng)
        .unwrap();
    (turn.ledger.expense("slot_om"), turn.ledger.expense("idle_tax"))
}

#[test]
fn funded_is_floor_of_allocation_over_cost() {
    let config = SimConfig::default_rules();
    let mut state = EconomyState::new("n", &config);
    state.add_canton(
        CantonEconomy::new("a", 2)
            .with_capacity(Sector::Agriculture, 10)
            .with_capacity(Sector::Industry, 3),
    );
    // Agriculture costs 4 per slot, industry 8.
    let plan = TurnPlan::default()
        .with_sector_budget(Sector::Agriculture, 22.0)
        .with_sector_budget(Sector::Industry, 100.0);

    let (slot_om, idle_tax) = run_budget(&mut state, plan);

    let agri = state.cantons["a"].sector(Sector::Agriculture);
    assert_eq!((agri.funded, agri.idle), (5, 5));
    let industry = state.cantons["a"].sector(Sector::Industry);
    assert_eq!((industry.funded, industry.idle), (3, 0), "funding is capped at capacity");

    assert_eq!(slot_om, 5.0 * 4.0 + 3.0 * 8.0);
    // Five idle agriculture slots at a quarter of 4 gold each.
    assert_eq!(idle_tax, 5.0);
}

#[test]
fn unfunded_sectors_are_all_idle() {
    let config = SimConfig::default_rules();
    let mut state = EconomyState::new("n", &config);
    state.add_canton(CantonEconomy::new("a", 1).with_capacity(Sector::Research, 4));

    let (slot_om, idle_tax) = run_budget(&mut state, TurnPlan::default());

    let research = state.cantons["a"].sector(Sector::Research);
    assert_eq!((research.funded, research.idle), (0, 4));
    assert_eq!(slot_om, 0.0);
    assert_eq!(idle_tax, 4.0 * 12.0 * 0.25);
}

#[test]
fn national_budget_is_shared_by_capacity_and_overrides_win() {
    let config = SimConfig::default_rules();
    let mut state = EconomyState::new("n", &config);
    state.add_canton(CantonEconomy::new("a", 1).with_capacity(Sector::Agriculture, 6));
    state.add_canton(CantonEconomy::new("b", 1).with_capacity(Sector::Agriculture, 2));
    state.add_canton(CantonEconomy::new("c", 1).with_capacity(Sector::Agriculture, 5));

    let mut plan = TurnPlan::default().with_sector_budget(Sector::Agriculture, 32.0);
    plan.budgets
        .canton_om
        .insert("c".into(), [(Sector::Agriculture, 8.0)].into());

    run_budget(&mut state, plan);

    // a and b split 32 gold 6:2; c gets exactly its override.
    assert_eq!(state.cantons["a"].sector(Sector::Agriculture).funded, 6);
    assert_eq!(state.cantons["b"].sector(Sector::Agriculture).funded, 2);
    assert_eq!(state.cantons["c"].sector(Sector::Agriculture).funded, 2);
}

#[test]
fn retooling_slots_cannot_be_funded() {
    let config = SimConfig::default_rules();
    let mut state = EconomyState::new("n", &config);
    state.add_canton(CantonEconomy::new("a", 1).with_capacity(Sector::Extraction, 5));
    queue_retool(
        &mut state,
        &config,
        &RetoolRequest {
            canton: "a".into(),
            from: Sector::Extraction,
            to: Sector::Industry,
            slots: 2,
        },
    )
    .unwrap();

    let extraction = state.cantons["a"].sector(Sector::Extraction);
    assert_eq!((extraction.capacity, extraction.idle), (3, 3));
    assert_eq!(state.cantons["a"].sector(Sector::Industry).capacity, 0);

    let (_, idle_tax) = run_budget(&mut state, TurnPlan::default().with_sector_budget(Sector::Extraction, 1_000.0));

    let extraction = state.cantons["a"].sector(Sector::Extraction);
    assert_eq!(extraction.capacity, 3);
    assert_eq!(extraction.funded, 3);
    assert_eq!(extraction.idle, 0);
    assert_eq!(idle_tax, 0.0);
}

#[test]
fn invalid_retools_are_rejected() {
    let config = SimConfig::default_rules();
    let mut state = EconomyState::new("n", &config);
    state.add_canton(CantonEconomy::new("a", 1).with_capacity(Sector::Extraction, 2));
    let request = |from, to, slots| RetoolRequest {
        canton: "a".into(),
        from,
        to,
        slots,
    };

    let too_many = queue_retool(&mut state, &config, &request(Sector::Extraction, Sector::Industry, 3));
    assert!(matches!(too_many, Err(SimError::InvalidRetool { .. })));
    let same = queue_retool(&mut state, &config, &request(Sector::Extraction, Sector::Extraction, 1));
    assert!(matches!(same, Err(SimError::InvalidRetool { .. })));

    queue_retool(&mut state, &config, &request(Sector::Extraction, Sector::Industry, 2)).unwrap();
    let exhausted = queue_retool(&mut state, &config, &request(Sector::Extraction, Sector::Luxury, 1));
    assert!(exhausted.is_err(), "slots already retooling are not free");
    assert!(state.retool_queue.len() == 1);
}

#[test]
fn retool_shifts_capacity_after_two_turns() {
    let mut engine = TurnEngine::build_test(3);
    let external = demo_external();
    engine
        .command(EconomyCommand::QueueRetool(RetoolRequest {
            canton: "alder".into(),
            from: Sector::Agriculture,
            to: Sector::Industry,
            slots: 2,
        }))
        .unwrap();

    assert_eq!(engine.state().cantons["alder"].sector(Sector::Agriculture).capacity, 4);

    for _ in 0..2 {
        engine.advance_turn(&external).unwrap();
        let alder = &engine.state().cantons["alder"];
        assert_eq!(alder.sector(Sector::Agriculture).capacity, 4);
        assert_eq!(alder.sector(Sector::Industry).capacity, 4);
    }

    engine.advance_turn(&external).unwrap();
    let alder = &engine.state().cantons["alder"];
    assert_eq!(alder.sector(Sector::Agriculture).capacity, 4);
    assert_eq!(alder.sector(Sector::Industry).capacity, 6);
    assert!(engine.state().retool_queue.is_empty());
    assert!(engine.last_events().iter().any(|e| matches!(
        e,
        TurnEvent::RetoolCompleted { slots: 2, from: Sector::Agriculture, to: Sector::Industry, .. }
    )));
}
