//! End-to-end turn resolution through the full gate pipeline.

use canton_core::{
    config::SimConfig,
    error::{SimError, SimResult},
    event::TurnEvent,
    fixtures::{besieged_external, demo_external, demo_plan, demo_state},
    gate::{TurnContext, TurnGate},
    rng::{GateRng, GateSlot},
    snapshot::EconomySnapshot,
    state::EconomyState,
    types::{Resource, Sector},
    TurnEngine,
};
use std::sync::Arc;

fn has(events: &[TurnEvent], pred: impl Fn(&TurnEvent) -> bool) -> bool {
    events.iter().any(pred)
}

#[test]
fn plan_executes_on_the_turn_after_submission() {
    let mut engine = TurnEngine::build_test(1);
    let external = demo_external();
    engine.submit_plan(demo_plan()).unwrap();

    let first = engine.advance_turn(&external).unwrap();
    assert!(!first.plan_executed);
    assert!(has(engine.last_events(), |e| matches!(e, TurnEvent::PlanMissing { turn: 1 })));
    assert!(engine.state().current_plan.is_some());
    assert!(engine.state().next_plan.is_none());

    let second = engine.advance_turn(&external).unwrap();
    assert!(second.plan_executed);
    assert!(!has(engine.last_events(), |e| matches!(e, TurnEvent::PlanMissing { .. })));
    assert!(engine.state().current_plan.is_none());
}

#[test]
fn turns_without_a_plan_produce_nothing() {
    let mut engine = TurnEngine::build_test(2);
    let external = demo_external();
    let food_before = engine.state().stockpile.get(Resource::Food);

    let summary = engine.advance_turn(&external).unwrap();

    assert_eq!(summary.energy_ratio, 1.0);
    assert_eq!(summary.lp_ratio, 1.0);
    assert_eq!(engine.state().stockpile.get(Resource::Food), food_before);
    for canton in engine.state().cantons.values() {
        for slots in canton.sectors.values() {
            assert_eq!((slots.funded, slots.utilization), (0, 0));
        }
    }
    // Upkeep and finance still run.
    assert!(summary.expenditures > 0.0);
}

#[test]
fn plan_turn_runs_every_gate() {
    let mut engine = TurnEngine::build_test(3);
    let external = demo_external();
    engine.submit_plan(demo_plan()).unwrap();
    engine.advance_turn(&external).unwrap();
    engine.submit_plan(demo_plan()).unwrap();

    let summary = engine.advance_turn(&external).unwrap();
    let state = engine.state();

    assert!(summary.plan_executed);
    assert_eq!(state.turn, 2);
    assert!(state.energy.last.supply > 0.0);
    assert!(state.logistics.last.supply > 0.0);
    assert!(state.trade.last.imported > 0.0);
    assert!(state.total_labor() > 0);
    assert!(state.cantons["alder"].sector(Sector::Agriculture).utilization > 0);
    assert_eq!(state.stockpile.get(Resource::Logistics), 0.0);
    assert_eq!(state.stockpile.get(Resource::Labor), 0.0);
    assert!(state.last_summary.as_ref() == Some(&summary));
    assert!(matches!(engine.last_events().first(), Some(TurnEvent::TurnStarted { turn: 2 })));
    assert!(matches!(engine.last_events().last(), Some(TurnEvent::TurnCompleted { turn: 2 })));
}

#[test]
fn siege_decays_urbanization_one_turn_later() {
    let mut engine = TurnEngine::build_test(4);
    assert_eq!(engine.state().cantons["alder"].urbanization_level(), 3);

    engine.advance_turn(&besieged_external("alder")).unwrap();
    let alder = &engine.state().cantons["alder"];
    assert_eq!(alder.urbanization_level(), 3);
    assert_eq!(alder.next_urbanization_level(), 2);

    engine.advance_turn(&demo_external()).unwrap();
    assert_eq!(engine.state().cantons["alder"].urbanization_level(), 2);
    assert!(has(engine.last_events(), |e| matches!(
        e,
        TurnEvent::UrbanizationChanged { from: 3, to: 2, canton, .. } if canton == "alder"
    )));
}

#[test]
fn invalid_plans_are_rejected_whole() {
    let mut engine = TurnEngine::build_test(5);
    let mut plan = demo_plan();
    plan.trade_orders.imports[0].quantity = -1.0;
    assert!(matches!(engine.submit_plan(plan), Err(SimError::InvalidPlan { .. })));

    let mut plan = demo_plan();
    plan.trade_orders.exports[0].canton = "atlantis".into();
    assert!(matches!(engine.submit_plan(plan), Err(SimError::UnknownCanton { .. })));
    assert!(engine.state().next_plan.is_none());
    assert_eq!(engine.state().welfare.pending_charge, 0.0);
}

struct FailingGate;

impl TurnGate for FailingGate {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn resolve(&mut self, state: &mut EconomyState, _turn: &mut TurnContext<'_>, _rng: &mut GateRng) -> SimResult<()> {
        state.stockpile.set(Resource::Gold, 0.0);
        Err(SimError::InvalidPlan {
            reason: "boom".into(),
        })
    }
}

#[test]
fn failed_turn_leaves_state_untouched() {
    let config = Arc::new(SimConfig::default_rules());
    let state = demo_state(&config);
    let mut engine = TurnEngine::new(state, config, 6);
    engine.register(GateSlot::Finance, Box::new(FailingGate));
    let before = engine.snapshot().to_json().unwrap();

    assert!(engine.advance_turn(&demo_external()).is_err());

    assert_eq!(engine.turn(), 0);
    assert_eq!(engine.snapshot().to_json().unwrap(), before);
}

#[test]
fn snapshot_json_restores_the_state() {
    let mut engine = TurnEngine::build_test(7);
    let external = demo_external();
    engine.submit_plan(demo_plan()).unwrap();
    engine.run_turns(3, &external).unwrap();

    let json = engine.snapshot().to_json().unwrap();
    let restored = EconomySnapshot::from_json(&json).unwrap();

    assert_eq!(restored.turn, 3);
    assert_eq!(restored.state.cantons.len(), 3);
    assert_eq!(restored.state.energy.plants.len(), 3);
    assert_eq!(
        restored.state.cantons["alder"].urbanization_level(),
        engine.state().cantons["alder"].urbanization_level()
    );
    assert!((restored.state.treasury() - engine.state().treasury()).abs() < 1e-6);
}
