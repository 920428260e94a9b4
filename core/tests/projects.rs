use canton_core::{
    command::EconomyCommand,
    config::SimConfig,
    error::SimError,
    event::TurnEvent,
    fixtures::{demo_external, demo_plan},
    lifecycle::Status,
    plan::TurnPlan,
    projects::{self, apply_order, cancel_project, start_project, ProjectOrder},
    state::{CantonEconomy, EconomyState},
    types::Resource,
    TurnEngine,
};

fn stocked_state() -> EconomyState {
    let config = SimConfig::default_rules();
    let mut state = EconomyState::new("n", &config);
    state.add_canton(CantonEconomy::new("a", 2));
    state.stockpile.set(Resource::Production, 200.0);
    state.stockpile.set(Resource::Gold, 100.0);
    state.stockpile.set(Resource::Coal, 20.0);
    state
}

#[test]
fn start_pays_the_whole_cost_up_front() {
    let config = SimConfig::default_rules();
    let mut state = stocked_state();

    let id = start_project(&mut state, &config.projects, "granary", "a").unwrap();

    assert_eq!(state.stockpile.get(Resource::Production), 160.0);
    assert_eq!(state.stockpile.get(Resource::Gold), 70.0);
    let project = state.projects.get(&id).unwrap();
    assert_eq!(project.lifecycle.status, Status::Building);
    assert_eq!(project.lifecycle.turns_remaining, 3);
}

#[test]
fn unaffordable_or_unknown_projects_fail_cleanly() {
    let config = SimConfig::default_rules();
    let mut state = stocked_state();
    state.stockpile.set(Resource::Coal, 5.0);

    let short = start_project(&mut state, &config.projects, "foundry", "a");
    assert!(matches!(short, Err(SimError::InsufficientResources { resource: Resource::Coal, .. })));
    assert_eq!(state.stockpile.get(Resource::Production), 200.0);

    let unknown = start_project(&mut state, &config.projects, "spaceport", "a");
    assert!(matches!(unknown, Err(SimError::UnknownProjectKind { .. })));
    assert!(state.projects.projects.is_empty());
}

#[test]
fn cancel_refunds_production_and_strategic_fuel() {
    let config = SimConfig::default_rules();
    let mut state = stocked_state();
    let id = start_project(&mut state, &config.projects, "foundry", "a").unwrap();
    assert_eq!(state.stockpile.get(Resource::Production), 140.0);
    assert_eq!(state.stockpile.get(Resource::Coal), 10.0);

    let refund = cancel_project(&mut state, &config.projects, &id).unwrap();

    assert_eq!(refund[&Resource::Production], 15.0);
    assert_eq!(refund[&Resource::Coal], 5.0);
    assert_eq!(state.stockpile.get(Resource::Production), 155.0);
    assert_eq!(state.stockpile.get(Resource::Coal), 15.0);
    assert!(state.projects.get(&id).is_err());
}

#[test]
fn gold_is_not_refunded() {
    let config = SimConfig::default_rules();
    let mut state = stocked_state();
    let id = start_project(&mut state, &config.projects, "granary", "a").unwrap();

    let refund = cancel_project(&mut state, &config.projects, &id).unwrap();

    assert!(!refund.contains_key(&Resource::Gold));
    assert_eq!(state.stockpile.get(Resource::Gold), 70.0);
}

#[test]
fn suspended_projects_hold_their_timer() {
    let config = SimConfig::default_rules();
    let mut state = stocked_state();
    let id = start_project(&mut state, &config.projects, "granary", "a").unwrap();

    apply_order(&mut state, &config, &ProjectOrder::Suspend { id: id.clone() }).unwrap();
    for turn in 1..=4 {
        assert!(projects::advance_projects(&mut state, turn).is_empty());
    }
    assert_eq!(state.projects.get(&id).unwrap().lifecycle.turns_remaining, 3);

    apply_order(&mut state, &config, &ProjectOrder::Resume { id: id.clone() }).unwrap();
    projects::advance_projects(&mut state, 5);
    assert_eq!(state.projects.get(&id).unwrap().lifecycle.turns_remaining, 2);
}

#[test]
fn only_running_owned_projects_yield_and_cost() {
    let config = SimConfig::default_rules();
    let mut state = stocked_state();
    let id = start_project(&mut state, &config.projects, "granary", "a").unwrap();
    assert!(projects::yields(&state, &config.projects).is_empty());

    for turn in 1..=3 {
        projects::advance_projects(&mut state, turn);
    }
    apply_order(
        &mut state,
        &config,
        &ProjectOrder::Toggle {
            id: id.clone(),
            target: Status::Active,
        },
    )
    .unwrap();
    projects::advance_projects(&mut state, 4);

    assert_eq!(projects::yields(&state, &config.projects)[&Resource::Food], 5.0);
    assert_eq!(projects::upkeep(&state, &config.projects), 2.0);

    projects::capture_project(&mut state, &id, "raiders").unwrap();
    assert!(projects::yields(&state, &config.projects).is_empty());
    assert_eq!(projects::upkeep(&state, &config.projects), 0.0);
}

#[test]
fn command_started_project_completes_through_turns() {
    let mut engine = TurnEngine::build_test(21);
    let external = demo_external();
    let outcome = engine
        .command(EconomyCommand::Project(ProjectOrder::Start {
            kind: "granary".into(),
            canton: "alder".into(),
        }))
        .unwrap();
    let id = outcome.created.unwrap();

    engine.run_turns(2, &external).unwrap();
    assert!(!engine
        .last_events()
        .iter()
        .any(|e| matches!(e, TurnEvent::ProjectComplete { .. })));

    engine.advance_turn(&external).unwrap();
    assert!(engine
        .last_events()
        .iter()
        .any(|e| matches!(e, TurnEvent::ProjectComplete { id: done, .. } if *done == id)));
}

#[test]
fn plan_orders_are_validated_on_submit() {
    let mut engine = TurnEngine::build_test(21);
    let mut plan = TurnPlan::default();
    plan.projects.push(ProjectOrder::Start {
        kind: "spaceport".into(),
        canton: "alder".into(),
    });
    assert!(matches!(
        engine.submit_plan(plan),
        Err(SimError::UnknownProjectKind { .. })
    ));

    let mut plan = demo_plan();
    plan.projects.push(ProjectOrder::Cancel { id: "prj-99".into() });
    assert!(matches!(engine.submit_plan(plan), Err(SimError::UnknownProject { .. })));
    assert!(engine.state().next_plan.is_none());
}
