//! One-turn state transition for a nation's economy.
//!
//! `TurnEngine::advance_turn` runs the fixed gate pipeline documented in
//! `engine.rs` over an `EconomyState`. The crate never persists state and
//! never reads the clock; the session layer owns both.

pub mod budget;
pub mod command;
pub mod config;
pub mod context;
pub mod development;
pub mod energy;
pub mod engine;
pub mod error;
pub mod event;
pub mod finance;
pub mod fixtures;
pub mod gate;
pub mod infrastructure;
pub mod labor;
pub mod lagged;
pub mod lifecycle;
pub mod logistics;
pub mod plan;
pub mod production;
pub mod projects;
pub mod rationing;
pub mod rng;
pub mod snapshot;
pub mod state;
pub mod suitability;
pub mod trade;
pub mod types;
pub mod welfare;

pub use engine::TurnEngine;
pub use error::{SimError, SimResult};
