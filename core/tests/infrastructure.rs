use canton_core::{
    config::SimConfig,
    error::SimError,
    event::TurnEvent,
    fixtures::{demo_external, demo_state},
    infrastructure::{
        advance_facilities, build_facility, capture_facility, compute_connectivity, pillage_facility,
        redesignate, toggle_facility, upkeep, FacilityKind,
    },
    lifecycle::Status,
    state::{CantonEconomy, EconomyState},
    types::{Resource, TileType, TransportMode},
};

fn national_id(state: &EconomyState, kind: FacilityKind) -> String {
    state.infrastructure.national(kind).unwrap().id.clone()
}

#[test]
fn demo_connectivity_follows_the_map() {
    let config = SimConfig::default_rules();
    let state = demo_state(&config);
    let connectivity = compute_connectivity(&state, &config, &demo_external());

    assert_eq!(connectivity.hops(TransportMode::Rail, "alder"), Some(0));
    assert_eq!(connectivity.hops(TransportMode::Rail, "brook"), Some(1));
    assert_eq!(connectivity.hops(TransportMode::Rail, "cairn"), Some(2));
    assert_eq!(connectivity.hops(TransportMode::Sea, "alder"), Some(0));
    assert_eq!(connectivity.hops(TransportMode::Sea, "brook"), None);
    assert_eq!(connectivity.hops(TransportMode::Air, "brook"), Some(0));
    assert_eq!(connectivity.hops(TransportMode::Air, "alder"), None);
}

#[test]
fn impassable_terrain_blocks_rail() {
    let config = SimConfig::default_rules();
    let state = demo_state(&config);
    let mut external = demo_external();
    external.map.terrain.clear();

    let connectivity = compute_connectivity(&state, &config, &external);

    // Cairn's dominant tile is mountains.
    assert_eq!(connectivity.hops(TransportMode::Rail, "brook"), Some(1));
    assert_eq!(connectivity.hops(TransportMode::Rail, "cairn"), None);
}

#[test]
fn national_builds_cost_more_and_are_unique() {
    let config = SimConfig::default_rules();
    let mut state = EconomyState::new("n", &config);
    state.add_canton(CantonEconomy::new("a", 1).with_geography(TileType::Coast, 1.0));
    state.add_canton(CantonEconomy::new("b", 1).with_geography(TileType::Coast, 0.5));
    state.add_canton(CantonEconomy::new("inland", 1).with_geography(TileType::Plains, 1.0));
    state.stockpile.set(Resource::Production, 500.0);
    state.stockpile.set(Resource::Gold, 500.0);

    build_facility(&mut state, &config, "a", FacilityKind::Port, true).unwrap();
    // Port: 50 production and 60 gold, times 1.5.
    assert_eq!(state.stockpile.get(Resource::Production), 425.0);
    assert_eq!(state.stockpile.get(Resource::Gold), 410.0);

    let duplicate = build_facility(&mut state, &config, "b", FacilityKind::Port, true);
    assert!(matches!(duplicate, Err(SimError::DuplicateNational { .. })));
    let inland = build_facility(&mut state, &config, "inland", FacilityKind::Port, false);
    assert!(matches!(inland, Err(SimError::NotCoastal { .. })));
    let twice = build_facility(&mut state, &config, "a", FacilityKind::Port, false);
    assert!(matches!(twice, Err(SimError::FacilityExists { .. })));

    build_facility(&mut state, &config, "b", FacilityKind::Port, false).unwrap();
    assert_eq!(state.stockpile.get(Resource::Production), 375.0);
}

#[test]
fn construction_finishes_inactive_and_toggles_a_turn_later() {
    let config = SimConfig::default_rules();
    let mut state = EconomyState::new("n", &config);
    state.add_canton(CantonEconomy::new("a", 1));
    state.stockpile.set(Resource::Production, 500.0);
    state.stockpile.set(Resource::Gold, 500.0);
    let id = build_facility(&mut state, &config, "a", FacilityKind::RailHub, false).unwrap();

    assert!(advance_facilities(&mut state, 1).is_empty());
    assert!(advance_facilities(&mut state, 2).is_empty());
    let events = advance_facilities(&mut state, 3);
    assert!(matches!(&events[..], [TurnEvent::InfrastructureComplete { turn: 3, .. }]));
    assert_eq!(state.infrastructure.get(&id).unwrap().lifecycle.status, Status::Inactive);

    toggle_facility(&mut state, &id, Status::Active).unwrap();
    assert_eq!(state.infrastructure.get(&id).unwrap().lifecycle.status, Status::Inactive);
    advance_facilities(&mut state, 4);
    assert_eq!(state.infrastructure.get(&id).unwrap().lifecycle.status, Status::Active);
}

#[test]
fn national_upkeep_is_doubled() {
    let config = SimConfig::default_rules();
    let state = demo_state(&config);
    // Port 5, rail hub 5 and airport 6, all national.
    assert_eq!(upkeep(&state, &config.infrastructure), 32.0);
}

#[test]
fn captured_or_pillaged_gateways_drop_out() {
    let config = SimConfig::default_rules();
    let mut state = demo_state(&config);
    let external = demo_external();

    let port = national_id(&state, FacilityKind::Port);
    capture_facility(&mut state, &port, "raiders").unwrap();
    assert!(state.infrastructure.national(FacilityKind::Port).is_none());

    let hub = national_id(&state, FacilityKind::RailHub);
    pillage_facility(&mut state, &hub).unwrap();
    assert!(toggle_facility(&mut state, &hub, Status::Active).is_err());

    let connectivity = compute_connectivity(&state, &config, &external);
    assert_eq!(connectivity.reachable(TransportMode::Sea), 0);
    assert_eq!(connectivity.reachable(TransportMode::Rail), 0);
    assert_eq!(connectivity.reachable(TransportMode::Air), 1);
    assert_eq!(upkeep(&state, &config.infrastructure), 12.0);
}

#[test]
fn redesignation_moves_the_flag() {
    let config = SimConfig::default_rules();
    let mut state = demo_state(&config);
    state.stockpile.set(Resource::Production, 500.0);
    let second = build_facility(&mut state, &config, "cairn", FacilityKind::Airport, false).unwrap();
    let first = national_id(&state, FacilityKind::Airport);

    redesignate(&mut state, &second).unwrap();

    assert_eq!(national_id(&state, FacilityKind::Airport), second);
    assert!(!state.infrastructure.get(&first).unwrap().national);
}
